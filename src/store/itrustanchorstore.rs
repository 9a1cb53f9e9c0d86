// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::truststore::TrustStore;
use std::sync::Arc;

/// Interface to the store where the trusted STI root certificates are
/// stashed.
pub trait ITrustAnchorStore: Send + Sync {
    /// The current set of trusted roots.  Callers hold on to the snapshot for
    /// the duration of one verification, so later updates do not affect it.
    fn trust_store(&self) -> Arc<TrustStore>;
}
