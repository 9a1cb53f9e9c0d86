// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::Certificate;
use super::fetch::CertificateFetcher;
use crate::config::Settings;
use crate::errors::{Error, Result};
use chrono::Utc;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Entries live until their leaf expires, capped at `max_age`
struct ValidityExpiry {
    max_age: Duration,
}

impl Expiry<String, Arc<Certificate>> for ValidityExpiry {
    fn expire_after_create(
        &self,
        _url: &String,
        cert: &Arc<Certificate>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(cert.cache_lifetime(Utc::now(), self.max_age))
    }

    fn expire_after_update(
        &self,
        _url: &String,
        cert: &Arc<Certificate>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(cert.cache_lifetime(Utc::now(), self.max_age))
    }
}

/// Public key URL → certificate cache.
///
/// Concurrent misses on one URL share a single fetch, and every waiter gets
/// the outcome of that fetch.  Failures are not cached.  Lookups on
/// different URLs never wait on each other.
pub struct CertificateCache {
    entries: Cache<String, Arc<Certificate>>,
    fetcher: Arc<dyn CertificateFetcher>,
    fetch_timeout: Duration,
    max_chain_length: usize,
    allowed_schemes: Vec<String>,
}

impl CertificateCache {
    pub fn new(settings: &Settings, fetcher: Arc<dyn CertificateFetcher>) -> Self {
        let entries = Cache::builder()
            .max_capacity(settings.cache_max_size)
            .expire_after(ValidityExpiry {
                max_age: settings.cache_max_age,
            })
            .build();

        Self {
            entries,
            fetcher,
            fetch_timeout: settings.fetch_timeout,
            max_chain_length: settings.max_chain_length,
            allowed_schemes: settings.allowed_schemes.clone(),
        }
    }

    /// Check that `url` is something we are willing to dereference
    pub fn check_url(&self, url: &str) -> Result<Url> {
        let u = Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("public key URL {url:?}: {e}")))?;

        if !self
            .allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(u.scheme()))
        {
            return Err(Error::InvalidInput(format!(
                "public key URL {url:?}: scheme {:?} not allowed",
                u.scheme()
            )));
        }

        if u.host_str().map_or(true, str::is_empty) {
            return Err(Error::InvalidInput(format!(
                "public key URL {url:?}: no host"
            )));
        }

        Ok(u)
    }

    /// Return the certificate served at `url`, fetching it on a miss
    pub async fn resolve(&self, url: &str) -> Result<Arc<Certificate>> {
        let parsed = self.check_url(url)?;

        let init = async {
            debug!(url = %parsed, "certificate cache miss");

            let raw = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&parsed))
                .await
                .map_err(|_| {
                    Error::RetrievalTimeout(format!(
                        "{url}: no answer within {:?}",
                        self.fetch_timeout
                    ))
                })??;

            let cert = Certificate::parse(url, raw, self.max_chain_length, Utc::now())?;

            debug!(
                url = %parsed,
                subject = %cert.leaf().subject,
                fingerprint = %cert.fingerprint(),
                "certificate cached"
            );

            Ok::<_, Error>(Arc::new(cert))
        };

        let entry = self
            .entries
            .entry(url.to_string())
            .or_try_insert_with(init)
            .await
            .map_err(|e: Arc<Error>| (*e).clone())?;

        if !entry.is_fresh() {
            debug!(url = %parsed, "certificate cache hit");
        }

        Ok(entry.into_value())
    }

    /// Drop the entry for `url`, if any
    pub async fn invalidate(&self, url: &str) {
        self.entries.invalidate(url).await
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }
}
