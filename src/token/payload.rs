// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64::Bytes;
use super::claims::Claims;
use super::header::Header;
use super::identity::format_identity;
use serde::Serialize;

/// The outcome of a successful verify or sign: decoded header and claims
/// together with the exact segments that were verified or produced.
///
/// A `Payload` owns everything it holds.  It never refers back to the
/// certificate cache, so dropping it (or calling [`Payload::release`]) is
/// all the cleanup there is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub header: Header,
    pub claims: Claims,
    pub signature: Bytes,
    pub algorithm: String,
    pub public_key_url: String,
    pub encoded_header: String,
    pub encoded_payload: String,
    pub encoded_signature: String,
}

impl Payload {
    /// `header.payload.signature`
    pub fn compact(&self) -> String {
        format!(
            "{}.{}.{}",
            self.encoded_header, self.encoded_payload, self.encoded_signature
        )
    }

    /// The SIP `Identity` header value carrying this token
    pub fn identity_header(&self) -> String {
        format_identity(
            &self.encoded_header,
            &self.encoded_payload,
            &self.encoded_signature,
            &self.public_key_url,
        )
    }

    /// Give the payload up.  Equivalent to dropping it.
    pub fn release(self) {
        drop(self)
    }
}
