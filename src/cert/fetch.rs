// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::Settings;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Retrieves the raw bytes served at a public key URL
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Bounded-time, bounded-size HTTP(S) GET
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_size: usize,
}

fn map_transport(url: &Url, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RetrievalTimeout(format!("{url}: {e}"))
    } else {
        Error::RetrievalFailed(format!("{url}: {e}"))
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_size: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .map_err(|e| Error::InvalidInput(format!("HTTP client: {e}")))?;

        Ok(Self { client, max_size })
    }

    pub fn from_settings(s: &Settings) -> Result<Self> {
        Self::new(s.fetch_timeout, s.max_certificate_size)
    }
}

#[async_trait]
impl CertificateFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(url = %url, "GET certificate");

        let mut rsp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_transport(url, e))?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(Error::RetrievalFailed(format!("{url}: {status}")));
        }

        if let Some(len) = rsp.content_length() {
            if len > self.max_size as u64 {
                return Err(Error::RetrievalFailed(format!(
                    "{url}: {len} bytes exceeds the {} bytes limit",
                    self.max_size
                )));
            }
        }

        // the advertised length may be absent or wrong
        let mut body = Vec::new();
        while let Some(chunk) = rsp.chunk().await.map_err(|e| map_transport(url, e))? {
            if body.len() + chunk.len() > self.max_size {
                return Err(Error::RetrievalFailed(format!(
                    "{url}: body exceeds the {} bytes limit",
                    self.max_size
                )));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, size = body.len(), "certificate fetched");

        Ok(body)
    }
}
