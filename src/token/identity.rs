// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::header::{ES256, PPT_SHAKEN};
use crate::errors::Error;

/// The value of a SIP `Identity` header field carrying a PASSporT:
///
/// ```text
/// <header>.<payload>.<signature>;info=<https://cert.example.org/passport.pem>;alg=ES256;ppt=shaken
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityHeader {
    pub header: String,
    pub payload: String,
    pub signature: String,
    /// The `info` parameter, with its angle brackets removed
    pub info: String,
    pub alg: String,
    pub ppt: Option<String>,
}

impl IdentityHeader {
    pub fn parse(v: &str) -> Result<Self, Error> {
        let mut parts = split_params(v.trim()).into_iter();

        let token = parts.next().unwrap_or_default().trim();
        let segs: Vec<&str> = token.split('.').collect();

        if segs.len() != 3 {
            return Err(Error::InvalidInput(format!(
                "identity: expecting 3 token segments, got {}",
                segs.len()
            )));
        }

        let mut info = None;
        let mut alg = None;
        let mut ppt = None;

        for p in parts {
            let (k, val) = p.trim().split_once('=').ok_or_else(|| {
                Error::InvalidInput(format!("identity: malformed parameter {p:?}"))
            })?;

            match k.trim().to_ascii_lowercase().as_str() {
                "info" => {
                    let val = val.trim();
                    let url = val
                        .strip_prefix('<')
                        .and_then(|u| u.strip_suffix('>'))
                        .ok_or_else(|| {
                            Error::InvalidInput("identity: info MUST be <URI>".to_string())
                        })?;
                    info = Some(url.to_string());
                }
                "alg" => alg = Some(val.trim().to_string()),
                "ppt" => ppt = Some(val.trim().trim_matches('"').to_string()),
                // unrecognised parameters are ignored
                _ => continue,
            }
        }

        Ok(Self {
            header: segs[0].to_string(),
            payload: segs[1].to_string(),
            signature: segs[2].to_string(),
            info: info
                .ok_or_else(|| Error::InvalidInput("identity: missing info".to_string()))?,
            // a missing alg parameter means ES256
            alg: alg.unwrap_or_else(|| ES256.to_string()),
            ppt,
        })
    }

    pub fn compact(&self) -> String {
        format!("{}.{}.{}", self.header, self.payload, self.signature)
    }
}

/// Splits on `;` except inside an `<...>` URI, which may legally contain one
fn split_params(v: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_uri = false;

    for (i, c) in v.char_indices() {
        match c {
            '<' => in_uri = true,
            '>' => in_uri = false,
            ';' if !in_uri => {
                out.push(&v[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    out.push(&v[start..]);
    out
}

impl std::fmt::Display for IdentityHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{};info=<{}>;alg={}", self.compact(), self.info, self.alg)?;

        if let Some(ppt) = &self.ppt {
            write!(f, ";ppt={ppt}")?;
        }

        Ok(())
    }
}

/// Build the Identity value for a SHAKEN token
pub fn format_identity(header: &str, payload: &str, signature: &str, info: &str) -> String {
    IdentityHeader {
        header: header.to_string(),
        payload: payload.to_string(),
        signature: signature.to_string(),
        info: info.to_string(),
        alg: ES256.to_string(),
        ppt: Some(PPT_SHAKEN.to_string()),
    }
    .to_string()
}
