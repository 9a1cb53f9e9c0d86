// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::truststore::{parse_roots, TrustStore};
use super::ITrustAnchorStore;
use crate::errors::Result;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// In-memory trust anchor store.  Adding roots builds a new snapshot and
/// swaps it in; snapshots already handed out are unaffected.
#[derive(Debug)]
pub struct MemoTrustAnchorStore {
    p: RwLock<Arc<TrustStore>>,
}

impl MemoTrustAnchorStore {
    /// Returns a new empty MemoTrustAnchorStore
    pub fn new() -> Result<Self> {
        Ok(Self {
            p: RwLock::new(Arc::new(TrustStore::empty()?)),
        })
    }

    /// Add to an existing (and possibly empty) store the root certificates
    /// found in the given PEM text
    pub fn add_pem(&self, pem: &[u8]) -> Result<()> {
        let added = parse_roots(pem)?;

        let mut p = self.p.write().unwrap_or_else(PoisonError::into_inner);

        let mut roots = p.roots().to_vec();
        roots.extend(added);

        let ts = TrustStore::new(roots)?;

        debug!(roots = ts.len(), "trust anchors updated");

        *p = Arc::new(ts);

        Ok(())
    }
}

impl ITrustAnchorStore for MemoTrustAnchorStore {
    fn trust_store(&self) -> Arc<TrustStore> {
        self.p
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
