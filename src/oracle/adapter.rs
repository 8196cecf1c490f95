//! Oracle Adapter
//!
//! Calls the oracle and decodes what comes back. Oracle failures are passed
//! through unchanged and never retried here.

use super::der::{parse_public_key, parse_signature};
use super::{SignRequest, SigningOracle};
use crate::crypto::RawPublicKey;
use crate::error::SignerResult;
use crate::signing::RawSignature;
use crate::utils::logging::redact_key_id;
use tracing::{debug, warn};

/// Fetch and decode the public key of `key_id`.
pub fn resolve_public_key<O: SigningOracle + ?Sized>(
    oracle: &O,
    key_id: &str,
) -> SignerResult<RawPublicKey> {
    debug!(key_id = %redact_key_id(key_id), "requesting public key");

    let der = oracle.get_public_key(key_id).map_err(|e| {
        warn!(key_id = %redact_key_id(key_id), error = %e, "public key retrieval failed");
        e
    })?;

    Ok(parse_public_key(&der)?)
}

/// Ask the oracle for an ECDSA signature over `digest`.
pub fn sign_digest<O: SigningOracle + ?Sized>(
    oracle: &O,
    key_id: &str,
    digest: &[u8; 32],
) -> SignerResult<RawSignature> {
    debug!(key_id = %redact_key_id(key_id), "requesting digest signature");

    let request = SignRequest::digest(key_id, digest);
    let der = oracle.sign(&request).map_err(|e| {
        warn!(key_id = %redact_key_id(key_id), error = %e, "oracle sign failed");
        e
    })?;

    Ok(parse_signature(&der)?)
}
