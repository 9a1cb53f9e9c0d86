// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::credential::SigningCredential;

/// Interface to the store where signing credentials are stashed.
pub trait ICredentialStore: Send + Sync {
    /// Lookup the credential bound to `caller_id`, falling back to the
    /// default credential when there is no exact match
    fn lookup(&self, caller_id: Option<&str>) -> Option<SigningCredential>;
}
