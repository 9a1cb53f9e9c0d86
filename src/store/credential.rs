// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::{Error, Result};
use crate::signature::SigningKey;
use crate::token::{canonicalize_tn, Attestation};
use serde::Deserialize;
use url::Url;

/// Everything needed to sign on behalf of one originating number (or, when
/// `caller_id` is `None`, on behalf of anybody)
#[derive(Clone, Debug)]
pub struct SigningCredential {
    pub key: SigningKey,
    /// Where verifiers fetch the matching certificate from
    pub x5u: String,
    /// Attestation level granted by policy
    pub attest: Attestation,
    /// Canonical telephone number this credential is bound to
    pub caller_id: Option<String>,
}

impl SigningCredential {
    pub fn new(key: SigningKey, x5u: &str, attest: Attestation) -> Result<Self> {
        Url::parse(x5u).map_err(|e| Error::InvalidInput(format!("x5u {x5u:?}: {e}")))?;

        Ok(Self {
            key,
            x5u: x5u.to_string(),
            attest,
            caller_id: None,
        })
    }

    pub fn with_caller_id(mut self, tn: &str) -> Result<Self> {
        self.caller_id = Some(canonicalize_tn(tn)?);
        Ok(self)
    }
}

/// JSON rendition of a credential, as loaded by
/// [`MemoCredentialStore::load_json`](super::MemoCredentialStore::load_json)
#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub(super) struct CredentialEntry {
    /// PEM private key
    key: String,
    x5u: String,
    attest: Attestation,
    #[serde(default)]
    caller_id: Option<String>,
}

impl TryFrom<CredentialEntry> for SigningCredential {
    type Error = Error;

    fn try_from(e: CredentialEntry) -> Result<Self> {
        let key = SigningKey::from_pem(e.key.as_bytes())?;

        let c = SigningCredential::new(key, &e.x5u, e.attest)?;

        match e.caller_id {
            Some(tn) => c.with_caller_id(&tn),
            None => Ok(c),
        }
    }
}
