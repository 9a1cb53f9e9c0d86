// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! STIR/SHAKEN PASSporT signing and verification.
//!
//! This crate provides an API to authenticate and verify caller identity
//! assertions carried in SIP signalling.  For detailed information about the
//! token format, see [RFC8225] and its SHAKEN extension [RFC8588].
//!
//! The API allows:
//! * Decoding and encoding the PASSporT header and claims-set, and the SIP
//!   `Identity` header that carries them
//! * Retrieving, caching and validating the certificate a PASSporT points to
//! * Cryptographically verifying a PASSporT against that certificate
//! * Signing a claims-set, with `attest`, `iat` and `origid` injected
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stirshaken::config::Settings;
//! use stirshaken::store::{MemoCredentialStore, MemoTrustAnchorStore};
//! use stirshaken::StirShaken;
//!
//! # async fn run(roots_pem: &[u8], identity: &str) -> stirshaken::Result<()> {
//! let trust = MemoTrustAnchorStore::new()?;
//! trust.add_pem(roots_pem)?;
//!
//! let svc = StirShaken::new(
//!     Settings::default(),
//!     Arc::new(trust),
//!     Arc::new(MemoCredentialStore::new()),
//! )?;
//!
//! let p = svc.verify_identity(identity).await?;
//! println!("attestation {} for {:?}", p.claims.attest, p.claims.orig.tn);
//! svc.release(p);
//! # Ok(())
//! # }
//! ```
//!
//! [RFC8225]: https://www.rfc-editor.org/rfc/rfc8225
//! [RFC8588]: https://www.rfc-editor.org/rfc/rfc8588

pub use self::errors::{Error, Result};
pub use self::service::{StirShaken, VerifyStage};
pub use self::token::Payload;

pub mod cert;
pub mod config;
pub mod errors;
pub mod service;
pub mod signature;
pub mod signer;
pub mod store;
pub mod token;

#[cfg(test)]
mod testutil;
