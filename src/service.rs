// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The verify / sign / release entry points.
//!
//! Verification walks a fixed sequence of stages and stops at the first
//! failure.  A rejection is logged generically, with the stage reached and the
//! error kind only; the detailed reason goes to `debug` and back to the
//! caller.

use crate::cert::{CertificateCache, CertificateFetcher, HttpFetcher, Validator};
use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::signature;
use crate::signer::{origination_tn, Signer};
use crate::store::{ICredentialStore, ITrustAnchorStore};
use crate::token::base64::{self, Bytes};
use crate::token::{codec, Codec, IdentityHeader, Payload, PPT_SHAKEN};
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// How far a verification got
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyStage {
    Received,
    UrlValidated,
    CertificateResolved,
    CertificateTrusted,
    SignatureVerified,
    ClaimsValidated,
    Accepted,
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifyStage::Received => "received",
            VerifyStage::UrlValidated => "url-validated",
            VerifyStage::CertificateResolved => "certificate-resolved",
            VerifyStage::CertificateTrusted => "certificate-trusted",
            VerifyStage::SignatureVerified => "signature-verified",
            VerifyStage::ClaimsValidated => "claims-validated",
            VerifyStage::Accepted => "accepted",
        };
        f.write_str(s)
    }
}

/// STIR/SHAKEN authentication and verification service
pub struct StirShaken {
    settings: Settings,
    codec: Codec,
    cache: CertificateCache,
    trust: Arc<dyn ITrustAnchorStore>,
    credentials: Arc<dyn ICredentialStore>,
}

impl StirShaken {
    /// A service fetching certificates over HTTP(S)
    pub fn new(
        settings: Settings,
        trust: Arc<dyn ITrustAnchorStore>,
        credentials: Arc<dyn ICredentialStore>,
    ) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::from_settings(&settings)?);

        Self::with_fetcher(settings, fetcher, trust, credentials)
    }

    pub fn with_fetcher(
        settings: Settings,
        fetcher: Arc<dyn CertificateFetcher>,
        trust: Arc<dyn ITrustAnchorStore>,
        credentials: Arc<dyn ICredentialStore>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            codec: Codec::from(&settings),
            cache: CertificateCache::new(&settings, fetcher),
            settings,
            trust,
            credentials,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &CertificateCache {
        &self.cache
    }

    /// Verify a PASSporT given as its three wire segments, the declared
    /// algorithm and the public key URL.
    pub async fn verify(
        &self,
        header: &str,
        payload: &str,
        signature: &str,
        algorithm: &str,
        public_key_url: &str,
    ) -> Result<Payload> {
        let mut stage = VerifyStage::Received;

        let res = self
            .run(&mut stage, header, payload, signature, algorithm, public_key_url)
            .await;

        match &res {
            Ok(p) => debug!(
                url = %public_key_url,
                origid = %p.claims.origid,
                stage = %VerifyStage::Accepted,
                "PASSporT accepted"
            ),
            Err(e) => {
                warn!(stage = %stage, kind = e.kind(), "verification failed");
                debug!(stage = %stage, url = %public_key_url, error = %e, "rejection detail");
            }
        }

        res
    }

    /// Verify the value of a SIP `Identity` header
    pub async fn verify_identity(&self, identity: &str) -> Result<Payload> {
        let id = IdentityHeader::parse(identity)?;

        if let Some(ppt) = &id.ppt {
            if ppt != PPT_SHAKEN {
                return Err(Error::InvalidClaimType(format!(
                    "ppt MUST be {PPT_SHAKEN:?}, got {ppt:?}"
                )));
            }
        }

        self.verify(&id.header, &id.payload, &id.signature, &id.alg, &id.info)
            .await
    }

    async fn run(
        &self,
        stage: &mut VerifyStage,
        header: &str,
        payload: &str,
        signature: &str,
        algorithm: &str,
        public_key_url: &str,
    ) -> Result<Payload> {
        base64::check_segment(header, "header")?;
        base64::check_segment(payload, "payload")?;
        base64::check_segment(signature, "signature")?;
        let raw_signature = base64::decode_str(signature)?;

        // no point fetching anything for an algorithm we cannot verify
        signature::check_algorithm(algorithm)?;
        self.cache.check_url(public_key_url)?;
        *stage = VerifyStage::UrlValidated;

        let cert = self.cache.resolve(public_key_url).await?;
        *stage = VerifyStage::CertificateResolved;

        let trust = self.trust.trust_store();
        Validator::new(&trust, &self.settings.allowed_key_purposes).validate(&cert, Utc::now())?;
        *stage = VerifyStage::CertificateTrusted;

        signature::verify(header, payload, &raw_signature, algorithm, &cert)?;
        *stage = VerifyStage::SignatureVerified;

        let hdr = codec::decode_header(header)?;

        if hdr.alg != algorithm {
            return Err(Error::UnsupportedAlgorithm(format!(
                "header declares {:?}, {algorithm:?} expected",
                hdr.alg
            )));
        }

        if hdr.x5u != public_key_url {
            return Err(Error::InvalidInput(format!(
                "header x5u {:?} differs from the public key URL",
                hdr.x5u
            )));
        }

        let claims = self.codec.decode(payload, Utc::now())?;
        *stage = VerifyStage::ClaimsValidated;

        Ok(Payload {
            header: hdr,
            claims,
            signature: Bytes::from(raw_signature),
            algorithm: algorithm.to_string(),
            public_key_url: public_key_url.to_string(),
            encoded_header: header.to_string(),
            encoded_payload: payload.to_string(),
            encoded_signature: signature.to_string(),
        })
    }

    /// Sign `claims` with the credential configured for their originating
    /// number, or the default credential
    pub fn sign(&self, claims: &Value) -> Result<Payload> {
        let tn = origination_tn(claims);

        let cred = self.credentials.lookup(tn.as_deref()).ok_or_else(|| {
            Error::SigningKeyInvalid(format!(
                "no signing credential for {}",
                tn.as_deref().unwrap_or("default caller")
            ))
        })?;

        Signer::new(&cred).sign(claims, cred.attest)
    }

    /// Hand back a payload obtained from [`verify`](Self::verify) or
    /// [`sign`](Self::sign)
    pub fn release(&self, payload: Payload) {
        payload.release()
    }
}
