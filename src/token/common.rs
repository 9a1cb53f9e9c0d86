// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::errors::Error;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;

/// Walks a JSON document and fails on the first object that repeats a member
/// name, at any depth.  The offending name is stashed in `dup`.
#[derive(Clone, Copy)]
struct UniqueMembers<'a> {
    dup: &'a RefCell<Option<String>>,
}

impl<'de, 'a> DeserializeSeed<'de> for UniqueMembers<'a> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for UniqueMembers<'a> {
    type Value = ();

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();

        while let Some(k) = map.next_key::<String>()? {
            if seen.contains(&k) {
                let msg = format!("duplicated member {k}");
                *self.dup.borrow_mut() = Some(k);
                return Err(de::Error::custom(msg));
            }

            map.next_value_seed(self)?;
            seen.insert(k);
        }

        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element_seed(self)?.is_some() {}

        Ok(())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(())
    }
}

/// Parse `buf` as a JSON object, rejecting duplicated member names anywhere
/// in the document
pub fn parse_object(buf: &[u8], what: &str) -> Result<Map<String, Value>, Error> {
    let dup = RefCell::new(None);

    let mut de = serde_json::Deserializer::from_slice(buf);

    let scan = UniqueMembers { dup: &dup }
        .deserialize(&mut de)
        .and_then(|_| de.end());

    if let Err(e) = scan {
        return match dup.into_inner() {
            Some(name) => Err(Error::DuplicatedClaim(name)),
            None => Err(Error::InvalidInput(format!("{what}: {e}"))),
        };
    }

    let v: Value =
        serde_json::from_slice(buf).map_err(|e| Error::InvalidInput(format!("{what}: {e}")))?;

    match v {
        Value::Object(m) => Ok(m),
        _ => Err(Error::InvalidInput(format!("{what}: expecting JSON object"))),
    }
}

pub fn to_tstr(v: &Value, n: &str) -> Result<String, Error> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Err(Error::InvalidClaimType(format!("{n} MUST be string"))),
    }
}

pub fn to_int(v: &Value, n: &str) -> Result<i64, Error> {
    v.as_i64()
        .ok_or_else(|| Error::InvalidClaimType(format!("{n} MUST be integer")))
}

pub fn to_object<'a>(v: &'a Value, n: &str) -> Result<&'a Map<String, Value>, Error> {
    v.as_object()
        .ok_or_else(|| Error::InvalidClaimType(format!("{n} MUST be object")))
}

pub fn to_tstr_array(v: &Value, n: &str) -> Result<Vec<String>, Error> {
    let x = v
        .as_array()
        .ok_or_else(|| Error::InvalidClaimType(format!("{n} MUST be array")))?;

    let mut out = Vec::with_capacity(x.len());

    for (i, xi) in x.iter().enumerate() {
        out.push(to_tstr(xi, &format!("{n}[{i}]"))?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ok() {
        let m = parse_object(br#"{"a": 1, "b": {"c": [1, 2]}}"#, "test").unwrap();

        assert_eq!(m.len(), 2);
    }

    #[test]
    fn top_level_dup() {
        let r = parse_object(br#"{"attest": "A", "attest": "C"}"#, "test");

        assert_eq!(r, Err(Error::DuplicatedClaim("attest".to_string())));
    }

    #[test]
    fn nested_dup() {
        let r = parse_object(br#"{"orig": {"tn": "1", "tn": "2"}}"#, "test");

        assert_eq!(r, Err(Error::DuplicatedClaim("tn".to_string())));
    }

    #[test]
    fn not_an_object() {
        assert!(matches!(
            parse_object(b"[1, 2]", "test"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            parse_object(b"{\"a\": ", "test"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn string_array() {
        let v = serde_json::json!(["1", 2]);

        assert_eq!(
            to_tstr_array(&v, "dest.tn"),
            Err(Error::InvalidClaimType("dest.tn[1] MUST be string".to_string()))
        );
    }
}
