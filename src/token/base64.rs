// SPDX-License-Identifier: Apache-2.0

use base64::{self, engine::general_purpose, Engine as _};
use serde::ser::{Serialize, Serializer};

use crate::errors::Error;

/// encodes bytes as an unpadded base64url string
pub fn encode(v: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(v)
}

/// decodes bytes from an unpadded base64url string
pub fn decode_str(v: &str) -> Result<Vec<u8>, Error> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(v)
        .map_err(|e| Error::InvalidInput(e.to_string()))
}

/// checks that `v` is a non-empty run of base64url alphabet characters, as
/// found in one segment of a compact serialization
pub fn check_segment(v: &str, what: &str) -> Result<(), Error> {
    if v.is_empty() {
        return Err(Error::InvalidInput(format!("{what}: empty segment")));
    }

    if let Some(c) = v
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(Error::InvalidInput(format!(
            "{what}: unexpected character {c:?} in base64url segment"
        )));
    }

    Ok(())
}

/// a `Vec<u8>` encoded as base64url in human readable serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(&base64::display::Base64Display::new(
                &self.0,
                &general_purpose::URL_SAFE_NO_PAD,
            ))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}
