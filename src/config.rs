// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Tunables supplied by the configuration collaborator.
//!
//! [`Settings`] is an immutable snapshot: this crate never loads
//! configuration from disk on its own, it only consumes what it is handed.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_with::DurationSeconds;
use std::time::Duration;

/// Cache, retrieval and freshness bounds
#[serde_with::serde_as]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Upper bound on how long a fetched certificate stays cached, whatever
    /// its own not-after says
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cache_max_age: Duration,

    /// Maximum number of public key URLs kept in the cache
    pub cache_max_size: u64,

    /// Bound on a single certificate fetch
    #[serde_as(as = "DurationSeconds<u64>")]
    pub fetch_timeout: Duration,

    /// Responses larger than this are refused
    pub max_certificate_size: usize,

    /// How old an `iat` may be before the token is considered stale
    #[serde_as(as = "DurationSeconds<u64>")]
    pub signature_timeout: Duration,

    /// How far in the future an `iat` may be
    #[serde_as(as = "DurationSeconds<u64>")]
    pub clock_skew: Duration,

    /// Maximum number of certificates in a fetched bundle
    pub max_chain_length: usize,

    /// Extended key usage OIDs (dotted form) accepted on a signing
    /// certificate, in addition to anyExtendedKeyUsage
    pub allowed_key_purposes: Vec<String>,

    /// URL schemes accepted for x5u
    pub allowed_schemes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_max_age: Duration::from_secs(3600),
            cache_max_size: 1000,
            fetch_timeout: Duration::from_secs(2),
            max_certificate_size: 64 * 1024,
            signature_timeout: Duration::from_secs(60),
            clock_skew: Duration::from_secs(5),
            max_chain_length: 10,
            allowed_key_purposes: Vec::new(),
            allowed_schemes: vec!["https".to_string(), "http".to_string()],
        }
    }
}

impl Settings {
    /// Parse settings from their JSON rendition.  Absent fields take their
    /// defaults.
    pub fn from_json(j: &str) -> Result<Self> {
        let s: Settings =
            serde_json::from_str(j).map_err(|e| Error::InvalidInput(e.to_string()))?;

        s.validate()?;

        Ok(s)
    }

    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            (self.cache_max_age.is_zero(), "cache-max-age"),
            (self.cache_max_size == 0, "cache-max-size"),
            (self.fetch_timeout.is_zero(), "fetch-timeout"),
            (self.max_certificate_size == 0, "max-certificate-size"),
            (self.signature_timeout.is_zero(), "signature-timeout"),
            (self.max_chain_length == 0, "max-chain-length"),
        ];

        for (is_zero, n) in non_zero.iter() {
            if *is_zero {
                return Err(Error::InvalidInput(format!("{n} must be non-zero")));
            }
        }

        if self.allowed_schemes.is_empty() {
            return Err(Error::InvalidInput(
                "allowed-schemes must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
