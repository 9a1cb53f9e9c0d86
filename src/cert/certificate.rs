// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::Error;
use chrono::{DateTime, Utc};
use openssl::ec::EcKey;
use openssl::hash::{hash, MessageDigest};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Public};
use openssl::x509::X509;
use std::time::Duration;
use x509_parser::prelude::*;

const PEM_PREAMBLE: &[u8] = b"-----BEGIN";

const OID_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
const OID_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
const OID_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
const OID_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
const OID_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
const OID_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";

/// Extended key usage as found in the certificate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtKeyUsage {
    pub any: bool,
    /// dotted OIDs of every other purpose listed
    pub purposes: Vec<String>,
}

/// One X.509 certificate with the facts the validator needs, extracted once
/// at parse time
#[derive(Clone, Debug)]
pub struct CertInfo {
    pub x509: X509,
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// `None` when the KeyUsage extension is absent
    pub digital_signature: Option<bool>,
    /// `None` when the ExtendedKeyUsage extension is absent
    pub ext_key_usage: Option<ExtKeyUsage>,
}

fn to_datetime(ts: i64, n: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| Error::MalformedCertificate(format!("{n} out of range: {ts}")))
}

impl CertInfo {
    pub(super) fn from_x509(x509: X509) -> Result<Self, Error> {
        let der = x509
            .to_der()
            .map_err(|e| Error::MalformedCertificate(e.to_string()))?;

        let (_, parsed) = X509Certificate::from_der(&der)
            .map_err(|e| Error::MalformedCertificate(e.to_string()))?;

        let validity = parsed.validity();
        let not_before = to_datetime(validity.not_before.timestamp(), "not-before")?;
        let not_after = to_datetime(validity.not_after.timestamp(), "not-after")?;

        let digital_signature = parsed
            .key_usage()
            .map_err(|e| Error::MalformedCertificate(format!("key usage: {e}")))?
            .map(|ku| ku.value.digital_signature());

        let ext_key_usage = parsed
            .extended_key_usage()
            .map_err(|e| Error::MalformedCertificate(format!("extended key usage: {e}")))?
            .map(|eku| {
                let v = eku.value;
                let known = [
                    (v.server_auth, OID_SERVER_AUTH),
                    (v.client_auth, OID_CLIENT_AUTH),
                    (v.code_signing, OID_CODE_SIGNING),
                    (v.email_protection, OID_EMAIL_PROTECTION),
                    (v.time_stamping, OID_TIME_STAMPING),
                    (v.ocsp_signing, OID_OCSP_SIGNING),
                ];

                let mut purposes: Vec<String> = known
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, oid)| oid.to_string())
                    .collect();

                purposes.extend(v.other.iter().map(|oid| oid.to_id_string()));

                ExtKeyUsage {
                    any: v.any,
                    purposes,
                }
            });

        Ok(Self {
            subject: parsed.subject().to_string(),
            not_before,
            not_after,
            digital_signature,
            ext_key_usage,
            x509,
        })
    }
}

/// A certificate (plus any intermediates served along with it) retrieved
/// from a public key URL
#[derive(Clone, Debug)]
pub struct Certificate {
    /// The URL the certificate was fetched from
    pub url: String,
    /// The bytes exactly as served
    pub raw: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
    leaf: CertInfo,
    chain: Vec<CertInfo>,
}

impl Certificate {
    /// Parse a PEM bundle (leaf first) or a single DER certificate
    pub fn parse(
        url: &str,
        raw: Vec<u8>,
        max_chain_length: usize,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let start = raw
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(raw.len());
        let trimmed = &raw[start..];

        let mut certs = if trimmed.starts_with(PEM_PREAMBLE) {
            X509::stack_from_pem(trimmed).map_err(|e| Error::MalformedCertificate(e.to_string()))?
        } else {
            vec![X509::from_der(&raw).map_err(|e| Error::MalformedCertificate(e.to_string()))?]
        };

        if certs.is_empty() {
            return Err(Error::MalformedCertificate(
                "no certificate found".to_string(),
            ));
        }

        if certs.len() > max_chain_length {
            return Err(Error::MalformedCertificate(format!(
                "bundle holds {} certificates, at most {max_chain_length} accepted",
                certs.len()
            )));
        }

        let leaf = CertInfo::from_x509(certs.remove(0))?;

        let chain = certs
            .into_iter()
            .map(CertInfo::from_x509)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            url: url.to_string(),
            raw,
            fetched_at,
            leaf,
            chain,
        })
    }

    /// The end-entity certificate whose key signs PASSporTs
    pub fn leaf(&self) -> &CertInfo {
        &self.leaf
    }

    /// Intermediates served after the leaf, in bundle order
    pub fn chain(&self) -> &[CertInfo] {
        &self.chain
    }

    /// The leaf followed by the intermediates
    pub fn iter(&self) -> impl Iterator<Item = &CertInfo> {
        std::iter::once(&self.leaf).chain(self.chain.iter())
    }

    pub fn public_key(&self) -> Result<PKey<Public>, Error> {
        self.leaf
            .x509
            .public_key()
            .map_err(|e| Error::MalformedCertificate(e.to_string()))
    }

    /// The leaf's key, if and only if it is an EC key on P-256
    pub fn p256_key(&self) -> Result<EcKey<Public>, Error> {
        let pkey = self.public_key()?;

        let ec = pkey.ec_key().map_err(|_| {
            Error::UnsupportedAlgorithm("certificate key is not an EC key".to_string())
        })?;

        if ec.group().curve_name() != Some(Nid::X9_62_PRIME256V1) {
            return Err(Error::UnsupportedAlgorithm(
                "certificate key is not on P-256".to_string(),
            ));
        }

        Ok(ec)
    }

    /// Hex SHA-256 of the leaf's DER encoding
    pub fn fingerprint(&self) -> String {
        self.leaf
            .x509
            .to_der()
            .and_then(|der| hash(MessageDigest::sha256(), &der))
            .map(|d| hex::encode(&*d))
            .unwrap_or_default()
    }

    /// How long this certificate may stay cached: until the leaf expires,
    /// capped at `max_age`
    pub fn cache_lifetime(&self, now: DateTime<Utc>, max_age: Duration) -> Duration {
        let remaining = (self.leaf.not_after - now).to_std().unwrap_or(Duration::ZERO);

        remaining.min(max_age)
    }
}
