// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::*;
use crate::errors::Error;
use bitmask::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const ATTEST_CLAIM: &str = "attest";
pub const DEST_CLAIM: &str = "dest";
pub const IAT_CLAIM: &str = "iat";
pub const ORIG_CLAIM: &str = "orig";
pub const ORIGID_CLAIM: &str = "origid";

const TN: &str = "tn";
const URI: &str = "uri";

/// The signer's confidence in the calling party's right to use the
/// origination identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attestation {
    /// Full attestation: the customer is known and authorised for the number
    A,
    /// Partial attestation: the customer is known, the number is not
    /// verified
    B,
    /// Gateway attestation: the call entered at a gateway
    C,
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Attestation::A => "A",
            Attestation::B => "B",
            Attestation::C => "C",
        };
        f.write_str(s)
    }
}

impl FromStr for Attestation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Attestation::A),
            "B" => Ok(Attestation::B),
            "C" => Ok(Attestation::C),
            other => Err(Error::InvalidClaimType(format!(
                "attest MUST be one of A, B, C, got {other:?}"
            ))),
        }
    }
}

/// The `orig` claim: exactly one calling party identity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Origination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Origination {
    pub fn tn(tn: impl Into<String>) -> Self {
        Self {
            tn: Some(tn.into()),
            uri: None,
        }
    }

    pub(crate) fn from_value(v: &Value) -> Result<Self, Error> {
        let m = to_object(v, ORIG_CLAIM)?;

        let mut o = Origination::default();

        for (k, v) in m.iter() {
            match k.as_str() {
                TN => o.tn = Some(to_tstr(v, "orig.tn")?),
                URI => o.uri = Some(to_tstr(v, "orig.uri")?),
                // unknown identity forms are ignored
                _ => continue,
            }
        }

        if o.tn.is_none() && o.uri.is_none() {
            return Err(Error::MissingClaim("orig.tn".to_string()));
        }

        Ok(o)
    }

    fn to_value(&self) -> Value {
        let mut m = Map::new();

        if let Some(tn) = &self.tn {
            m.insert(TN.to_string(), Value::String(tn.clone()));
        }

        if let Some(uri) = &self.uri {
            m.insert(URI.to_string(), Value::String(uri.clone()));
        }

        Value::Object(m)
    }
}

/// The `dest` claim: one or more called party identities
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Destination {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tn: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uri: Vec<String>,
}

impl Destination {
    pub fn tn<I, S>(tns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tn: tns.into_iter().map(Into::into).collect(),
            uri: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tn.is_empty() && self.uri.is_empty()
    }

    pub(crate) fn from_value(v: &Value) -> Result<Self, Error> {
        let m = to_object(v, DEST_CLAIM)?;

        let mut d = Destination::default();

        for (k, v) in m.iter() {
            match k.as_str() {
                TN => d.tn = to_tstr_array(v, "dest.tn")?,
                URI => d.uri = to_tstr_array(v, "dest.uri")?,
                _ => continue,
            }
        }

        if d.is_empty() {
            return Err(Error::MissingClaim("dest.tn".to_string()));
        }

        Ok(d)
    }

    fn to_value(&self) -> Value {
        let mut m = Map::new();

        if !self.tn.is_empty() {
            m.insert(
                TN.to_string(),
                Value::Array(self.tn.iter().cloned().map(Value::String).collect()),
            );
        }

        if !self.uri.is_empty() {
            m.insert(
                URI.to_string(),
                Value::Array(self.uri.iter().cloned().map(Value::String).collect()),
            );
        }

        Value::Object(m)
    }
}

bitmask! {
    #[derive(Debug)]
    mask ClaimsSet: u8 where flags ClaimFlags {
        Attest = 0x01,
        Dest   = 0x02,
        Iat    = 0x04,
        Orig   = 0x08,
        OrigId = 0x10,
    }
}

/// A SHAKEN PASSporT claims-set.  Claims outside the profile are carried
/// through untouched in `extra`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub attest: Attestation,
    pub dest: Destination,
    pub iat: i64,
    pub orig: Origination,
    pub origid: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Claims {
    /// Build a claims-set from a JSON object, checking presence and type of
    /// every mandatory claim
    pub fn from_object(contents: &Map<String, Value>) -> Result<Self, Error> {
        let mut p = ClaimsParser::new();

        p.parse(contents)?;

        p.validate()
    }

    /// Render as a JSON object.  Members come out in lexicographic order.
    pub fn to_value(&self) -> Value {
        let mut m: Map<String, Value> = Map::new();

        for (k, v) in self.extra.iter() {
            m.insert(k.clone(), v.clone());
        }

        m.insert(
            ATTEST_CLAIM.to_string(),
            Value::String(self.attest.to_string()),
        );
        m.insert(DEST_CLAIM.to_string(), self.dest.to_value());
        m.insert(IAT_CLAIM.to_string(), Value::from(self.iat));
        m.insert(ORIG_CLAIM.to_string(), self.orig.to_value());
        m.insert(ORIGID_CLAIM.to_string(), Value::String(self.origid.clone()));

        Value::Object(m)
    }
}

struct ClaimsParser {
    attest: Option<Attestation>,
    dest: Destination,
    iat: i64,
    orig: Origination,
    origid: String,
    extra: BTreeMap<String, Value>,

    claims_set: ClaimsSet,
}

impl ClaimsParser {
    fn new() -> Self {
        Self {
            attest: None,
            dest: Default::default(),
            iat: 0,
            orig: Default::default(),
            origid: Default::default(),
            extra: Default::default(),
            claims_set: ClaimsSet::none(),
        }
    }

    fn parse(&mut self, contents: &Map<String, Value>) -> Result<(), Error> {
        for (k, v) in contents.iter() {
            match k.as_str() {
                ATTEST_CLAIM => self.set_attest(v)?,
                DEST_CLAIM => self.set_dest(v)?,
                IAT_CLAIM => self.set_iat(v)?,
                ORIG_CLAIM => self.set_orig(v)?,
                ORIGID_CLAIM => self.set_origid(v)?,
                _ => {
                    self.extra.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    fn validate(self) -> Result<Claims, Error> {
        // all SHAKEN claims are mandatory
        let mandatory_claims = [
            (ClaimFlags::Attest, ATTEST_CLAIM),
            (ClaimFlags::Dest, DEST_CLAIM),
            (ClaimFlags::Iat, IAT_CLAIM),
            (ClaimFlags::Orig, ORIG_CLAIM),
            (ClaimFlags::OrigId, ORIGID_CLAIM),
        ];

        for (c, n) in mandatory_claims.iter() {
            if !self.claims_set.contains(*c) {
                return Err(Error::MissingClaim(n.to_string()));
            }
        }

        let attest = self
            .attest
            .ok_or_else(|| Error::MissingClaim(ATTEST_CLAIM.to_string()))?;

        Ok(Claims {
            attest,
            dest: self.dest,
            iat: self.iat,
            orig: self.orig,
            origid: self.origid,
            extra: self.extra,
        })
    }

    fn set_attest(&mut self, v: &Value) -> Result<(), Error> {
        let x = to_tstr(v, ATTEST_CLAIM)?;

        self.attest = Some(x.parse()?);

        self.claims_set.set(ClaimFlags::Attest);

        Ok(())
    }

    fn set_dest(&mut self, v: &Value) -> Result<(), Error> {
        self.dest = Destination::from_value(v)?;

        self.claims_set.set(ClaimFlags::Dest);

        Ok(())
    }

    fn set_iat(&mut self, v: &Value) -> Result<(), Error> {
        let x = to_int(v, IAT_CLAIM)?;

        if x < 0 {
            return Err(Error::InvalidClaimType(
                "iat MUST be a non-negative NumericDate".to_string(),
            ));
        }

        self.iat = x;

        self.claims_set.set(ClaimFlags::Iat);

        Ok(())
    }

    fn set_orig(&mut self, v: &Value) -> Result<(), Error> {
        self.orig = Origination::from_value(v)?;

        self.claims_set.set(ClaimFlags::Orig);

        Ok(())
    }

    fn set_origid(&mut self, v: &Value) -> Result<(), Error> {
        let x = to_tstr(v, ORIGID_CLAIM)?;

        if x.is_empty() {
            return Err(Error::InvalidClaimType(
                "origid MUST be a non-empty string".to_string(),
            ));
        }

        self.origid = x;

        self.claims_set.set(ClaimFlags::OrigId);

        Ok(())
    }
}

/// Reduce a telephone number to the canonical SHAKEN form: visual separators
/// and a leading `+` dropped, leaving only digits, `*` and `#`
pub fn canonicalize_tn(tn: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(tn.len());

    for (i, c) in tn.chars().enumerate() {
        match c {
            '0'..='9' | '*' | '#' => out.push(c),
            '+' if i == 0 => continue,
            '-' | '.' | ' ' | '(' | ')' => continue,
            other => {
                return Err(Error::InvalidClaimType(format!(
                    "unexpected character {other:?} in telephone number"
                )))
            }
        }
    }

    if out.is_empty() {
        return Err(Error::InvalidClaimType(
            "telephone number has no digits".to_string(),
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> Value {
        json!({
            "attest": "A",
            "dest": { "tn": ["12155551213"] },
            "iat": 1443208345,
            "orig": { "tn": "12155551212" },
            "origid": "123e4567-e89b-12d3-a456-426655440000"
        })
    }

    #[test]
    fn claims_ok() {
        let v = full();
        let c = Claims::from_object(v.as_object().unwrap()).unwrap();

        assert_eq!(c.attest, Attestation::A);
        assert_eq!(c.dest.tn, vec!["12155551213".to_string()]);
        assert_eq!(c.iat, 1443208345);
        assert_eq!(c.orig.tn.as_deref(), Some("12155551212"));
        assert!(c.extra.is_empty());

        assert_eq!(c.to_value(), v);
    }

    #[test]
    fn each_claim_is_mandatory() {
        for n in [ATTEST_CLAIM, DEST_CLAIM, IAT_CLAIM, ORIG_CLAIM, ORIGID_CLAIM] {
            let mut v = full();
            v.as_object_mut().unwrap().remove(n);

            assert_eq!(
                Claims::from_object(v.as_object().unwrap()),
                Err(Error::MissingClaim(n.to_string())),
                "{n}"
            );
        }
    }

    #[test]
    fn wrong_types() {
        let cases = [
            ("attest", json!(1)),
            ("attest", json!("D")),
            ("dest", json!("12155551213")),
            ("dest", json!({ "tn": "12155551213" })),
            ("iat", json!("1443208345")),
            ("iat", json!(1443208345.5)),
            ("iat", json!(-1)),
            ("orig", json!(["12155551212"])),
            ("orig", json!({ "tn": 12155551212u64 })),
            ("origid", json!(42)),
            ("origid", json!("")),
        ];

        for (n, bad) in cases.iter() {
            let mut v = full();
            v[*n] = bad.clone();

            let r = Claims::from_object(v.as_object().unwrap());
            assert!(
                matches!(r, Err(Error::InvalidClaimType(_))),
                "{n} = {bad}: {r:?}"
            );
        }
    }

    #[test]
    fn empty_identities_are_missing() {
        let mut v = full();
        v["dest"] = json!({});
        assert_eq!(
            Claims::from_object(v.as_object().unwrap()),
            Err(Error::MissingClaim("dest.tn".to_string()))
        );

        let mut v = full();
        v["orig"] = json!({});
        assert_eq!(
            Claims::from_object(v.as_object().unwrap()),
            Err(Error::MissingClaim("orig.tn".to_string()))
        );
    }

    #[test]
    fn extra_claims_are_kept() {
        let mut v = full();
        v["rcd"] = json!({ "nam": "Alice" });

        let c = Claims::from_object(v.as_object().unwrap()).unwrap();

        assert_eq!(c.extra.get("rcd"), Some(&json!({ "nam": "Alice" })));
        assert_eq!(c.to_value(), v);
    }

    #[test]
    fn tn_canonical_form() {
        assert_eq!(canonicalize_tn("+1 (555) 123-4567").unwrap(), "15551234567");
        assert_eq!(canonicalize_tn("555.123.4567").unwrap(), "5551234567");
        assert_eq!(canonicalize_tn("*67#").unwrap(), "*67#");
        assert!(canonicalize_tn("1555+1234").is_err());
        assert!(canonicalize_tn("sip:alice").is_err());
        assert!(canonicalize_tn("+").is_err());
    }
}
