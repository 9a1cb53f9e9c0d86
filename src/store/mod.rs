// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration snapshots consumed by the verifier and the signer: trusted
//! root certificates and signing credentials.

pub use self::credential::SigningCredential;
pub use self::icredentialstore::ICredentialStore;
pub use self::itrustanchorstore::ITrustAnchorStore;
pub use self::memo_credentialstore::MemoCredentialStore;
pub use self::memo_trustanchorstore::MemoTrustAnchorStore;
pub use self::truststore::TrustStore;

mod credential;
mod icredentialstore;
mod itrustanchorstore;
mod memo_credentialstore;
mod memo_trustanchorstore;
mod truststore;
