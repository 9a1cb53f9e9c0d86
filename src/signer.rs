// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! PASSporT signing.
//!
//! The signer owns three claims outright: `attest`, `iat` and `origid`.
//! Whatever the caller put there is discarded and replaced.

use crate::errors::{Error, Result};
use crate::signature::{self, SigningKey};
use crate::store::SigningCredential;
use crate::token::base64::{self, Bytes};
use crate::token::{
    canonicalize_tn, codec, Attestation, Claims, Destination, Header, Origination, Payload,
    ATTEST_CLAIM, DEST_CLAIM, ES256, IAT_CLAIM, ORIGID_CLAIM, ORIG_CLAIM,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

const ENVELOPE_HEADER: &str = "header";
const ENVELOPE_PAYLOAD: &str = "payload";

/// Return the claims object in `input`, which is either the bare claims or
/// a `{"header": ..., "payload": ...}` envelope
pub fn claims_object(input: &Value) -> Result<&Map<String, Value>> {
    let m = input
        .as_object()
        .ok_or_else(|| Error::InvalidInput("claims MUST be a JSON object".to_string()))?;

    if m.contains_key(ENVELOPE_HEADER) || (m.len() == 1 && m.contains_key(ENVELOPE_PAYLOAD)) {
        return m
            .get(ENVELOPE_PAYLOAD)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::InvalidInput("envelope payload MUST be an object".to_string()));
    }

    Ok(m)
}

/// The calling number in `input`, if any, in canonical form
pub fn origination_tn(input: &Value) -> Option<String> {
    claims_object(input)
        .ok()?
        .get(ORIG_CLAIM)?
        .get("tn")?
        .as_str()
        .and_then(|tn| canonicalize_tn(tn).ok())
}

/// Signs claims with one credential's key on behalf of its `x5u`
pub struct Signer<'a> {
    key: &'a SigningKey,
    x5u: &'a str,
    caller_id: Option<&'a str>,
}

impl<'a> Signer<'a> {
    pub fn new(credential: &'a SigningCredential) -> Self {
        Self {
            key: &credential.key,
            x5u: &credential.x5u,
            caller_id: credential.caller_id.as_deref(),
        }
    }

    /// Sign `input` with attestation level `attest`, as of now
    pub fn sign(&self, input: &Value, attest: Attestation) -> Result<Payload> {
        self.sign_at(input, attest, Utc::now())
    }

    pub fn sign_at(&self, input: &Value, attest: Attestation, now: DateTime<Utc>) -> Result<Payload> {
        let claims = self.build_claims(claims_object(input)?, attest, now)?;

        let header = Header::shaken(self.x5u);

        let encoded_header = codec::encode_header(&header)?;
        let encoded_payload = codec::encode(&claims)?;

        let sig = signature::sign(&encoded_header, &encoded_payload, self.key)?;
        let encoded_signature = base64::encode(&sig);

        debug!(
            x5u = %self.x5u,
            attest = %claims.attest,
            origid = %claims.origid,
            "PASSporT signed"
        );

        Ok(Payload {
            header,
            claims,
            signature: Bytes::from(sig),
            algorithm: ES256.to_string(),
            public_key_url: self.x5u.to_string(),
            encoded_header,
            encoded_payload,
            encoded_signature,
        })
    }

    fn build_claims(
        &self,
        m: &Map<String, Value>,
        attest: Attestation,
        now: DateTime<Utc>,
    ) -> Result<Claims> {
        let mut dest = None;
        let mut orig = None;
        let mut extra = BTreeMap::new();

        for (k, v) in m.iter() {
            match k.as_str() {
                // always injected
                ATTEST_CLAIM | IAT_CLAIM | ORIGID_CLAIM => continue,
                DEST_CLAIM => dest = Some(Destination::from_value(v)?),
                ORIG_CLAIM => orig = Some(Origination::from_value(v)?),
                _ => {
                    extra.insert(k.clone(), v.clone());
                }
            }
        }

        let mut dest = dest.ok_or_else(|| Error::MissingClaim(DEST_CLAIM.to_string()))?;
        dest.tn = dest
            .tn
            .iter()
            .map(|tn| canonicalize_tn(tn))
            .collect::<Result<Vec<_>>>()?;

        let mut orig = match orig {
            Some(o) => o,
            None => Origination::tn(
                self.caller_id
                    .ok_or_else(|| Error::MissingClaim(ORIG_CLAIM.to_string()))?,
            ),
        };
        orig.tn = orig.tn.as_deref().map(canonicalize_tn).transpose()?;

        Ok(Claims {
            attest,
            dest,
            iat: now.timestamp(),
            orig,
            origid: Uuid::new_v4().to_string(),
            extra,
        })
    }
}
