// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Retrieval, caching and validation of the certificates PASSporTs point to
//! through their `x5u` header.

pub use self::cache::CertificateCache;
pub use self::certificate::{CertInfo, Certificate, ExtKeyUsage};
pub use self::fetch::{CertificateFetcher, HttpFetcher};
pub use self::validator::Validator;

mod cache;
mod certificate;
mod fetch;
mod validator;
