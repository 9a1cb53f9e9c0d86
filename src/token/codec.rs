// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Compact-serialization codec for PASSporT headers and claims-sets.
//!
//! Encoding renders JSON with members in lexicographic order and no
//! insignificant whitespace, so equal inputs always produce byte-identical
//! segments.

use super::base64;
use super::claims::Claims;
use super::common::parse_object;
use super::header::Header;
use crate::config::Settings;
use crate::errors::Error;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

fn encode_value(v: &Value) -> Result<String, Error> {
    let buf = serde_json::to_vec(v).map_err(|e| Error::SerializationFailed(e.to_string()))?;

    Ok(base64::encode(&buf))
}

/// Encode a claims-set into its base64url payload segment
pub fn encode(claims: &Claims) -> Result<String, Error> {
    encode_value(&claims.to_value())
}

/// Encode a header into its base64url header segment
pub fn encode_header(header: &Header) -> Result<String, Error> {
    encode_value(&header.to_value())
}

/// Decode a header segment
pub fn decode_header(header_b64: &str) -> Result<Header, Error> {
    base64::check_segment(header_b64, "header")?;

    let buf = base64::decode_str(header_b64)?;
    let m = parse_object(&buf, "header")?;

    Header::from_object(&m)
}

/// Decode a payload segment, checking claim presence and types but not
/// freshness
pub fn decode_claims(payload_b64: &str) -> Result<Claims, Error> {
    base64::check_segment(payload_b64, "payload")?;

    let buf = base64::decode_str(payload_b64)?;
    let m = parse_object(&buf, "payload")?;

    Claims::from_object(&m)
}

/// Claims decoder with an `iat` freshness window
#[derive(Clone, Debug)]
pub struct Codec {
    signature_timeout: Duration,
    clock_skew: Duration,
}

impl Codec {
    pub fn new(signature_timeout: Duration, clock_skew: Duration) -> Self {
        Self {
            signature_timeout,
            clock_skew,
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, Error> {
        encode(claims)
    }

    /// Decode a payload segment and check that its `iat` lies within the
    /// freshness window around `now`
    pub fn decode(&self, payload_b64: &str, now: DateTime<Utc>) -> Result<Claims, Error> {
        let claims = decode_claims(payload_b64)?;

        self.check_freshness(claims.iat, now)?;

        Ok(claims)
    }

    pub fn check_freshness(&self, iat: i64, now: DateTime<Utc>) -> Result<(), Error> {
        let now = now.timestamp();
        let timeout = i64::try_from(self.signature_timeout.as_secs()).unwrap_or(i64::MAX);
        let skew = i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX);

        if now.saturating_sub(iat) > timeout {
            return Err(Error::StaleToken(format!(
                "iat {iat} is older than {timeout}s (now {now})"
            )));
        }

        if iat.saturating_sub(now) > skew {
            return Err(Error::FutureToken(format!(
                "iat {iat} is more than {skew}s ahead (now {now})"
            )));
        }

        Ok(())
    }
}

impl From<&Settings> for Codec {
    fn from(s: &Settings) -> Self {
        Self::new(s.signature_timeout, s.clock_skew)
    }
}
