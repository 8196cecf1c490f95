//! Unified error types for the signer
//!
//! Every failure in the signing pipeline flows through [`SignerError`].
//! The boundary decides what to do with an error from its [`Disposition`]:
//! request-parameter problems are answered as data, everything else aborts
//! the invocation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for all signer operations
#[derive(Debug, Error)]
pub enum SignerError {
    /// Missing or invalid runtime configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing or unsupported `operation`
    #[error("validation error: {0}")]
    Validation(String),

    /// A sign request lacks a required field
    #[error("missing parameter - {0}")]
    MissingParameter(String),

    /// A sign request field is present but out of range or malformed
    #[error("invalid parameter - {0}")]
    InvalidParameter(String),

    /// Transport or authorization failure reported by the signing oracle
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Malformed encoding returned by the oracle or handed to the decoder
    #[error("decoding error: {0}")]
    Decoding(#[from] DecodeError),

    /// Neither recovery candidate reproduces the expected address
    #[error("recovery failed: no recovery id reproduces {expected}")]
    RecoveryFailed { expected: String },

    /// A value cannot be canonically encoded
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Failures reported by the signing oracle, propagated verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("unsupported request: {0}")]
    Unsupported(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Structural decoding failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid public key format: {0}")]
    InvalidKeyFormat(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),
}

/// Error kinds for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigurationError,
    ValidationError,
    MissingParameter,
    InvalidParameter,
    OracleError,
    DecodingError,
    RecoveryFailed,
    EncodingError,
}

/// What the boundary does with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Answer the caller with a structured error payload.
    Respond,
    /// Fail the invocation; no response body.
    Abort,
}

impl SignerError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingParameter(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Oracle(_) => ErrorKind::OracleError,
            Self::Decoding(_) => ErrorKind::DecodingError,
            Self::RecoveryFailed { .. } => ErrorKind::RecoveryFailed,
            Self::Encoding(_) => ErrorKind::EncodingError,
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self.kind() {
            ErrorKind::MissingParameter | ErrorKind::InvalidParameter => Disposition::Respond,
            _ => Disposition::Abort,
        }
    }
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::InvalidParameter(format!("invalid hex: {}", e))
    }
}
