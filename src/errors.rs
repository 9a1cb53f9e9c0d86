// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

/// Failure outcomes for certificate retrieval, validation, signature checks,
/// claim decoding and signing.
///
/// The `Display` text is detailed and meant for internal diagnostics only.
/// At the SIP-facing boundary a rejection should be reported generically;
/// see [`Error::kind`] for a log-safe identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Certificate retrieval timed out: {0}")]
    RetrievalTimeout(String),
    #[error("Certificate retrieval failed: {0}")]
    RetrievalFailed(String),
    #[error("Malformed certificate: {0}")]
    MalformedCertificate(String),
    #[error("Certificate expired: {0}")]
    Expired(String),
    #[error("Certificate not yet valid: {0}")]
    NotYetValid(String),
    #[error("Untrusted issuer: {0}")]
    UntrustedIssuer(String),
    #[error("Wrong key usage: {0}")]
    WrongKeyUsage(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),
    #[error("Missing claim: {0}")]
    MissingClaim(String),
    #[error("Invalid claim type: {0}")]
    InvalidClaimType(String),
    #[error("Duplicated claim: {0}")]
    DuplicatedClaim(String),
    #[error("Stale token: {0}")]
    StaleToken(String),
    #[error("Token issued in the future: {0}")]
    FutureToken(String),
    #[error("Signing key invalid: {0}")]
    SigningKeyInvalid(String),
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

impl Error {
    /// A short, stable identifier for the failure class that carries no
    /// attacker-influenced detail
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid-input",
            Error::RetrievalTimeout(_) => "retrieval-timeout",
            Error::RetrievalFailed(_) => "retrieval-failed",
            Error::MalformedCertificate(_) => "malformed-certificate",
            Error::Expired(_) => "expired",
            Error::NotYetValid(_) => "not-yet-valid",
            Error::UntrustedIssuer(_) => "untrusted-issuer",
            Error::WrongKeyUsage(_) => "wrong-key-usage",
            Error::UnsupportedAlgorithm(_) => "unsupported-algorithm",
            Error::SignatureInvalid(_) => "signature-invalid",
            Error::MissingClaim(_) => "missing-claim",
            Error::InvalidClaimType(_) => "invalid-claim-type",
            Error::DuplicatedClaim(_) => "duplicated-claim",
            Error::StaleToken(_) => "stale-token",
            Error::FutureToken(_) => "future-token",
            Error::SigningKeyInvalid(_) => "signing-key-invalid",
            Error::SerializationFailed(_) => "serialization-failed",
        }
    }

    /// Whether the caller may reasonably retry.  Nothing in this crate
    /// retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RetrievalTimeout(_) | Error::RetrievalFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
