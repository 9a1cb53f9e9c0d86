// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::{Error, Result};
use openssl::hash::MessageDigest;
use openssl::x509::store::{X509Store, X509StoreBuilder, X509StoreRef};
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::X509;
use std::fmt;

/// An immutable set of trusted root certificates, ready for path validation.
///
/// Validity windows are checked separately, so the underlying store is told
/// to skip time checks.
pub struct TrustStore {
    store: X509Store,
    roots: Vec<X509>,
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("roots", &self.roots.len())
            .finish()
    }
}

fn same_cert(a: &X509, b: &X509) -> bool {
    match (
        a.digest(MessageDigest::sha256()),
        b.digest(MessageDigest::sha256()),
    ) {
        (Ok(x), Ok(y)) => *x == *y,
        _ => false,
    }
}

impl TrustStore {
    pub fn new(roots: Vec<X509>) -> Result<Self> {
        let mut unique: Vec<X509> = Vec::with_capacity(roots.len());

        for r in roots {
            if !unique.iter().any(|u| same_cert(u, &r)) {
                unique.push(r);
            }
        }

        let mut b =
            X509StoreBuilder::new().map_err(|e| Error::InvalidInput(format!("trust store: {e}")))?;

        for r in unique.iter() {
            b.add_cert(r.clone())
                .map_err(|e| Error::InvalidInput(format!("trust store: {e}")))?;
        }

        b.set_flags(X509VerifyFlags::NO_CHECK_TIME)
            .map_err(|e| Error::InvalidInput(format!("trust store: {e}")))?;

        Ok(Self {
            store: b.build(),
            roots: unique,
        })
    }

    pub fn empty() -> Result<Self> {
        Self::new(Vec::new())
    }

    /// Parse one or more PEM certificates
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Self::new(parse_roots(pem)?)
    }

    pub fn store(&self) -> &X509StoreRef {
        &self.store
    }

    pub fn roots(&self) -> &[X509] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub(super) fn parse_roots(pem: &[u8]) -> Result<Vec<X509>> {
    let roots =
        X509::stack_from_pem(pem).map_err(|e| Error::InvalidInput(format!("trust anchors: {e}")))?;

    if roots.is_empty() {
        return Err(Error::InvalidInput(
            "trust anchors: no certificate found".to_string(),
        ));
    }

    Ok(roots)
}
