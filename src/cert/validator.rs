// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::certificate::{CertInfo, Certificate};
use crate::errors::{Error, Result};
use crate::store::TrustStore;
use chrono::{DateTime, Utc};
use openssl::stack::Stack;
use openssl::x509::{X509StoreContext, X509};

/// Decides whether a resolved certificate may vouch for a PASSporT.
///
/// Pure: it never fetches and never mutates, so a cached certificate is
/// re-checked against the current time and trust store on every call.
pub struct Validator<'a> {
    trust: &'a TrustStore,
    purposes: &'a [String],
}

impl<'a> Validator<'a> {
    /// `purposes` lists the extended key usage OIDs, besides
    /// anyExtendedKeyUsage, that a signing certificate may carry
    pub fn new(trust: &'a TrustStore, purposes: &'a [String]) -> Self {
        Self { trust, purposes }
    }

    /// Validity window, then chain of trust, then key usage
    pub fn validate(&self, cert: &Certificate, at: DateTime<Utc>) -> Result<()> {
        for c in cert.iter() {
            check_validity(c, at)?;
        }

        let anchor = self.check_chain(cert)?;
        check_validity(&CertInfo::from_x509(anchor)?, at)?;

        self.check_key_usage(cert.leaf())
    }

    /// Builds the path to a trusted root and returns the root it ended on
    fn check_chain(&self, cert: &Certificate) -> Result<X509> {
        let untrusted = |e: openssl::error::ErrorStack| Error::UntrustedIssuer(e.to_string());

        let mut chain = Stack::<X509>::new().map_err(untrusted)?;
        for c in cert.chain() {
            chain.push(c.x509.clone()).map_err(untrusted)?;
        }

        let mut ctx = X509StoreContext::new().map_err(untrusted)?;

        let (ok, res, anchor) = ctx
            .init(self.trust.store(), &cert.leaf().x509, &chain, |c| {
                let ok = c.verify_cert()?;
                let anchor = c
                    .chain()
                    .and_then(|s| s.iter().last())
                    .map(|x| x.to_owned());
                Ok((ok, c.error(), anchor))
            })
            .map_err(untrusted)?;

        if !ok {
            return Err(Error::UntrustedIssuer(format!(
                "{}: {}",
                cert.leaf().subject,
                res.error_string()
            )));
        }

        anchor.ok_or_else(|| {
            Error::UntrustedIssuer(format!("{}: empty verified chain", cert.leaf().subject))
        })
    }

    fn check_key_usage(&self, leaf: &CertInfo) -> Result<()> {
        if leaf.digital_signature == Some(false) {
            return Err(Error::WrongKeyUsage(format!(
                "{}: keyUsage does not assert digitalSignature",
                leaf.subject
            )));
        }

        if let Some(eku) = &leaf.ext_key_usage {
            let allowed = eku.any || eku.purposes.iter().any(|p| self.purposes.contains(p));

            if !allowed {
                return Err(Error::WrongKeyUsage(format!(
                    "{}: extendedKeyUsage {:?} does not permit PASSporT signing",
                    leaf.subject, eku.purposes
                )));
            }
        }

        Ok(())
    }
}

fn check_validity(c: &CertInfo, at: DateTime<Utc>) -> Result<()> {
    if at < c.not_before {
        return Err(Error::NotYetValid(format!(
            "{}: not before {}",
            c.subject, c.not_before
        )));
    }

    if at > c.not_after {
        return Err(Error::Expired(format!(
            "{}: not after {}",
            c.subject, c.not_after
        )));
    }

    Ok(())
}
