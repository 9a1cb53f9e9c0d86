// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The token module models a SHAKEN PASSporT: its protected header, its
//! claims-set, the compact `header.payload.signature` serialization and the
//! SIP `Identity` header that carries it.
//!
//! # Example
//!
//! ```
//! use stirshaken::token::{codec, Attestation, Claims, Destination, Origination};
//!
//! let claims = Claims {
//!     attest: Attestation::A,
//!     dest: Destination::tn(["12155551213"]),
//!     iat: 1443208345,
//!     orig: Origination::tn("12155551212"),
//!     origid: "123e4567-e89b-12d3-a456-426655440000".to_string(),
//!     extra: Default::default(),
//! };
//!
//! let p = codec::encode(&claims).expect("encoding claims");
//! let c = codec::decode_claims(&p).expect("decoding claims");
//!
//! assert_eq!(c, claims);
//! ```

pub use self::claims::*;
pub use self::codec::Codec;
pub use self::header::{Header, ES256, PPT_SHAKEN, TYP_PASSPORT};
pub use self::identity::IdentityHeader;
pub use self::payload::Payload;

pub mod base64;
mod claims;
pub mod codec;
mod common;
mod header;
mod identity;
mod payload;
