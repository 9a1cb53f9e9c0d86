// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use crate::errors::Error;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ES256: &str = "ES256";
pub const PPT_SHAKEN: &str = "shaken";
pub const TYP_PASSPORT: &str = "passport";

const ALG: &str = "alg";
const PPT: &str = "ppt";
const TYP: &str = "typ";
const X5U: &str = "x5u";

/// The PASSporT protected header
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    pub x5u: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Header {
    /// A SHAKEN header for an ES256 signature whose verification certificate
    /// lives at `x5u`
    pub fn shaken(x5u: impl Into<String>) -> Self {
        Self {
            alg: ES256.to_string(),
            ppt: Some(PPT_SHAKEN.to_string()),
            typ: Some(TYP_PASSPORT.to_string()),
            x5u: x5u.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_object(contents: &Map<String, Value>) -> Result<Self, Error> {
        let mut alg = None;
        let mut ppt = None;
        let mut typ = None;
        let mut x5u = None;
        let mut extra = BTreeMap::new();

        for (k, v) in contents.iter() {
            match k.as_str() {
                ALG => alg = Some(to_tstr(v, ALG)?),
                PPT => ppt = Some(to_tstr(v, PPT)?),
                TYP => typ = Some(to_tstr(v, TYP)?),
                X5U => x5u = Some(to_tstr(v, X5U)?),
                _ => {
                    extra.insert(k.clone(), v.clone());
                }
            }
        }

        let h = Header {
            alg: alg.ok_or_else(|| Error::MissingClaim(ALG.to_string()))?,
            ppt,
            typ,
            x5u: x5u.ok_or_else(|| Error::MissingClaim(X5U.to_string()))?,
            extra,
        };

        h.validate()?;

        Ok(h)
    }

    fn validate(&self) -> Result<(), Error> {
        if let Some(ppt) = &self.ppt {
            if ppt != PPT_SHAKEN {
                return Err(Error::InvalidClaimType(format!(
                    "ppt MUST be {PPT_SHAKEN:?}, got {ppt:?}"
                )));
            }
        }

        if let Some(typ) = &self.typ {
            if typ != TYP_PASSPORT {
                return Err(Error::InvalidClaimType(format!(
                    "typ MUST be {TYP_PASSPORT:?}, got {typ:?}"
                )));
            }
        }

        Ok(())
    }

    /// Render as a JSON object.  Members come out in lexicographic order.
    pub fn to_value(&self) -> Value {
        let mut m: Map<String, Value> = Map::new();

        for (k, v) in self.extra.iter() {
            m.insert(k.clone(), v.clone());
        }

        m.insert(ALG.to_string(), Value::String(self.alg.clone()));

        if let Some(ppt) = &self.ppt {
            m.insert(PPT.to_string(), Value::String(ppt.clone()));
        }

        if let Some(typ) = &self.typ {
            m.insert(TYP.to_string(), Value::String(typ.clone()));
        }

        m.insert(X5U.to_string(), Value::String(self.x5u.clone()));

        Value::Object(m)
    }
}
