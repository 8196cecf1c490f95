//! Low-s Normalization and Recovery-id Search
//!
//! Both steps are pure functions of `(digest, r, s, expected address)`.

use super::signature::{order_minus, RawSignature, RecoveryId, SECP256K1_HALF_ORDER};
use crate::crypto::{derive_address, Address, RawPublicKey};
use crate::error::{SignerError, SignerResult};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId as SecpRecoveryId};
use secp256k1::{Message, Secp256k1};
use tracing::{debug, warn};

/// `s <= n/2`
pub fn is_low_s(s: &[u8; 32]) -> bool {
    *s <= SECP256K1_HALF_ORDER
}

/// Replace `s` with `n - s` when it lies in the upper half of the order.
///
/// The result verifies for the same digest and key; applying it twice is a
/// no-op.
pub fn normalize_s(signature: RawSignature) -> RawSignature {
    if is_low_s(&signature.s) {
        return signature;
    }
    debug!("flipping high-s signature into low-s form");
    RawSignature {
        r: signature.r,
        s: order_minus(&signature.s),
    }
}

/// Recover the signer address implied by `(digest, r, s, recovery_id)`.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RawSignature,
    recovery_id: RecoveryId,
) -> SignerResult<Address> {
    let secp = Secp256k1::verification_only();

    let message = Message::from_digest_slice(digest)
        .map_err(|e| SignerError::Encoding(format!("digest: {}", e)))?;

    let rec_id = SecpRecoveryId::from_i32(recovery_id.to_u8() as i32).map_err(|e| {
        SignerError::RecoveryFailed {
            expected: format!("recovery id {}: {}", recovery_id.to_u8(), e),
        }
    })?;

    let recoverable = RecoverableSignature::from_compact(&signature.to_compact(), rec_id)
        .map_err(|e| SignerError::RecoveryFailed {
            expected: format!("compact signature: {}", e),
        })?;

    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| SignerError::RecoveryFailed {
            expected: format!("point recovery: {}", e),
        })?;

    let raw = RawPublicKey::from_uncompressed(&public_key.serialize_uncompressed()).ok_or_else(
        || SignerError::RecoveryFailed {
            expected: "uncompressed point".to_string(),
        },
    )?;

    Ok(derive_address(&raw))
}

/// Find the recovery id under which `signature` recovers to `expected`.
///
/// Candidates are tried in order 0, 1; the first match wins. A signature
/// that matches neither is rejected and never retried.
pub fn recover_v(
    digest: &[u8; 32],
    signature: &RawSignature,
    expected: &Address,
) -> SignerResult<RecoveryId> {
    for candidate in [RecoveryId::ZERO, RecoveryId::ONE] {
        match recover_address(digest, signature, candidate) {
            Ok(address) if address == *expected => {
                debug!(recovery_id = candidate.to_u8(), "recovery id found");
                return Ok(candidate);
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(recovery_id = candidate.to_u8(), error = %e, "candidate does not recover");
                continue;
            }
        }
    }

    warn!(expected = %expected, "signature does not recover to the resolved address");
    Err(SignerError::RecoveryFailed {
        expected: expected.checksummed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keccak256;
    use crate::signing::SECP256K1_ORDER;
    use secp256k1::{PublicKey, SecretKey};

    fn keypair(last: u8) -> (SecretKey, Address) {
        let secp = Secp256k1::new();
        let mut key = [0u8; 32];
        key[31] = last;
        let secret = SecretKey::from_slice(&key).unwrap();
        let public = PublicKey::from_secret_key(&secp, &secret);
        let raw = RawPublicKey::from_uncompressed(&public.serialize_uncompressed()).unwrap();
        (secret, derive_address(&raw))
    }

    fn sign(secret: &SecretKey, digest: &[u8; 32]) -> RawSignature {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(digest).unwrap();
        let compact = secp.sign_ecdsa(&message, secret).serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        RawSignature::new(r, s).unwrap()
    }

    #[test]
    fn test_normalize_flips_high_s() {
        let mut s = SECP256K1_HALF_ORDER;
        s[31] += 1;
        let sig = RawSignature::new([1u8; 32], s).unwrap();
        let normalized = normalize_s(sig);
        assert!(is_low_s(&normalized.s));
        assert_eq!(normalized.s, SECP256K1_HALF_ORDER);
        assert_eq!(normalize_s(normalized), normalized);
    }

    #[test]
    fn test_normalize_keeps_low_s() {
        let sig = RawSignature::new([1u8; 32], SECP256K1_HALF_ORDER).unwrap();
        assert_eq!(normalize_s(sig), sig);
    }

    #[test]
    fn test_recover_v_finds_signer() {
        let (secret, address) = keypair(1);
        let digest = keccak256(b"transfer");
        let sig = sign(&secret, &digest);

        let v = recover_v(&digest, &sig, &address).unwrap();
        assert_eq!(recover_address(&digest, &sig, v).unwrap(), address);
    }

    #[test]
    fn test_recover_v_after_flipping_to_high_s_and_back() {
        let (secret, address) = keypair(9);
        let digest = keccak256(b"high-s");
        let low = sign(&secret, &digest);
        let high = RawSignature::new(low.r, order_minus(&low.s)).unwrap();
        assert!(!is_low_s(&high.s));

        let normalized = normalize_s(high);
        assert_eq!(normalized, low);
        assert!(recover_v(&digest, &normalized, &address).is_ok());
    }

    #[test]
    fn test_recover_v_rejects_other_digest() {
        let (secret, address) = keypair(2);
        let sig = sign(&secret, &keccak256(b"one"));

        let result = recover_v(&keccak256(b"two"), &sig, &address);
        assert!(matches!(result, Err(SignerError::RecoveryFailed { .. })));
    }

    #[test]
    fn test_recover_v_rejects_other_key() {
        let (secret, _) = keypair(3);
        let (_, other) = keypair(4);
        let digest = keccak256(b"payload");
        let sig = sign(&secret, &digest);

        assert!(recover_v(&digest, &sig, &other).is_err());
    }

    #[test]
    fn test_order_constant_matches_library() {
        assert_eq!(SECP256K1_ORDER, secp256k1::constants::CURVE_ORDER);
    }
}
