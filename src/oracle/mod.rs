//! Signing Oracle Port
//!
//! The oracle holds the private key and exposes exactly two operations:
//! public-key retrieval and digest signing. Both speak DER.
//!
//! - [`SigningOracle`]: the port implemented by a remote KMS client or
//!   by [`local::LocalOracle`]
//! - [`adapter`]: turns oracle bytes into [`RawPublicKey`] / [`RawSignature`]
//! - [`der`]: the purpose-built DER reader and writer
//!
//! [`RawPublicKey`]: crate::crypto::RawPublicKey
//! [`RawSignature`]: crate::signing::RawSignature

pub mod adapter;
pub mod der;
pub mod local;

pub use adapter::{resolve_public_key, sign_digest};
pub use local::LocalOracle;

use crate::error::OracleError;
use std::fmt;

/// Signing algorithm requested from the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    /// ECDSA over secp256k1 with a SHA-256 sized digest slot
    EcdsaSha256,
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningAlgorithm::EcdsaSha256 => write!(f, "ECDSA_SHA_256"),
        }
    }
}

/// How the oracle must treat the `message` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Already hashed; sign as-is.
    Digest,
    /// Hash before signing.
    Raw,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Digest => write!(f, "DIGEST"),
            MessageType::Raw => write!(f, "RAW"),
        }
    }
}

/// A single call to the oracle's signing operation.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub key_id: &'a str,
    pub message: &'a [u8],
    pub message_type: MessageType,
    pub algorithm: SigningAlgorithm,
}

impl<'a> SignRequest<'a> {
    /// ECDSA over a precomputed 32-byte digest.
    pub fn digest(key_id: &'a str, digest: &'a [u8; 32]) -> Self {
        Self {
            key_id,
            message: digest,
            message_type: MessageType::Digest,
            algorithm: SigningAlgorithm::EcdsaSha256,
        }
    }
}

/// Remote asymmetric-key custody service.
///
/// Implementations must not retry; failures surface as [`OracleError`] and
/// the caller owns the retry policy.
pub trait SigningOracle: Send + Sync {
    /// DER `SubjectPublicKeyInfo` of `key_id`.
    fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, OracleError>;

    /// DER `ECDSA-Sig-Value` over `request.message`.
    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<u8>, OracleError>;
}

impl<T: SigningOracle + ?Sized> SigningOracle for &T {
    fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, OracleError> {
        (**self).get_public_key(key_id)
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<u8>, OracleError> {
        (**self).sign(request)
    }
}
