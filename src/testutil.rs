// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Throwaway PKI and fetchers for unit tests

use crate::cert::CertificateFetcher;
use crate::errors::Error;
use async_trait::async_trait;
use chrono::Utc;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

pub const TEST_URL: &str = "https://cert.example.org/passport.pem";

const DAY: i64 = 24 * 60 * 60;

pub fn p256_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub fn p384_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::SECP384R1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub struct Issued {
    pub cert: X509,
    pub key: PKey<Private>,
}

#[derive(Default)]
pub struct LeafOptions {
    pub server_auth_only: bool,
    pub any_purpose: bool,
    pub no_digital_signature: bool,
    pub rsa: bool,
    pub expired: bool,
    pub not_yet_valid: bool,
}

fn build(
    cn: &str,
    key: &PKey<Private>,
    issuer: Option<&Issued>,
    ca: bool,
    window: (i64, i64),
    opts: &LeafOptions,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let now = Utc::now().timestamp();

    let mut b = X509Builder::new().unwrap();
    b.set_version(2).unwrap();
    b.set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    b.set_subject_name(&name).unwrap();
    match issuer {
        Some(i) => b.set_issuer_name(i.cert.subject_name()).unwrap(),
        None => b.set_issuer_name(&name).unwrap(),
    }
    b.set_pubkey(key).unwrap();
    b.set_not_before(&Asn1Time::from_unix(now + window.0).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::from_unix(now + window.1).unwrap())
        .unwrap();

    if ca {
        b.append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        b.append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    } else {
        b.append_extension(BasicConstraints::new().critical().build().unwrap())
            .unwrap();

        let mut ku = KeyUsage::new();
        ku.critical();
        if opts.no_digital_signature {
            ku.key_agreement();
        } else {
            ku.digital_signature();
        }
        b.append_extension(ku.build().unwrap()).unwrap();

        if opts.server_auth_only {
            b.append_extension(ExtendedKeyUsage::new().server_auth().build().unwrap())
                .unwrap();
        }

        if opts.any_purpose {
            b.append_extension(
                ExtendedKeyUsage::new()
                    .other("anyExtendedKeyUsage")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        }
    }

    let ski = SubjectKeyIdentifier::new()
        .build(&b.x509v3_context(issuer.map(|i| &*i.cert), None))
        .unwrap();
    b.append_extension(ski).unwrap();

    if let Some(i) = issuer {
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&b.x509v3_context(Some(&*i.cert), None))
            .unwrap();
        b.append_extension(aki).unwrap();
    }

    let signer = issuer.map(|i| &i.key).unwrap_or(key);
    b.sign(signer, MessageDigest::sha256()).unwrap();

    b.build()
}

/// root CA → intermediate CA → SHAKEN leaf
pub struct TestPki {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl TestPki {
    pub fn new() -> Self {
        Self::with_root_window((-DAY, 3650 * DAY))
    }

    /// a hierarchy whose root lapsed yesterday
    pub fn with_expired_root() -> Self {
        Self::with_root_window((-3650 * DAY, -DAY))
    }

    fn with_root_window(window: (i64, i64)) -> Self {
        let defaults = LeafOptions::default();

        let root_key = p256_key();
        let root = Issued {
            cert: build(
                "Test STI-PA Root",
                &root_key,
                None,
                true,
                window,
                &defaults,
            ),
            key: root_key,
        };

        let int_key = p256_key();
        let intermediate = Issued {
            cert: build(
                "Test STI-CA Intermediate",
                &int_key,
                Some(&root),
                true,
                (-DAY, 365 * DAY),
                &defaults,
            ),
            key: int_key,
        };

        let mut pki = Self {
            leaf: Issued {
                cert: root.cert.clone(),
                key: p256_key(),
            },
            root,
            intermediate,
        };

        pki.leaf = pki.issue_leaf(LeafOptions::default());

        pki
    }

    pub fn issue_leaf(&self, opts: LeafOptions) -> Issued {
        let key = if opts.rsa { rsa_key() } else { p256_key() };

        let window = if opts.expired {
            (-60 * DAY, -DAY)
        } else if opts.not_yet_valid {
            (DAY, 30 * DAY)
        } else {
            (-DAY, 30 * DAY)
        };

        let cert = build(
            "SHAKEN 1234",
            &key,
            Some(&self.intermediate),
            false,
            window,
            &opts,
        );

        Issued { cert, key }
    }

    /// leaf followed by the intermediate, as a STI-CS would serve them
    pub fn bundle_pem(&self, leaf: &Issued) -> Vec<u8> {
        let mut pem = leaf.cert.to_pem().unwrap();
        pem.extend(self.intermediate.cert.to_pem().unwrap());
        pem
    }

    pub fn root_pem(&self) -> Vec<u8> {
        self.root.cert.to_pem().unwrap()
    }
}

pub fn http_response(status: u16, body: &[u8]) -> Vec<u8> {
    let mut r = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/x-pem-file\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    r.extend_from_slice(body);
    r
}

/// Serve `response` to every connection after `delay`.  Returns the URL to
/// hit.
pub async fn serve_http(response: Vec<u8>, delay: Duration) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = sock.write_all(&response).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    Url::parse(&format!("http://{addr}/passport.pem")).unwrap()
}

/// Serves canned bodies by URL and counts how often it is asked
pub struct MapFetcher {
    bodies: HashMap<String, Result<Vec<u8>, Error>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, url: &str, body: Result<Vec<u8>, Error>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateFetcher for MapFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.bodies
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(Error::RetrievalFailed("404 Not Found".to_string())))
    }
}
