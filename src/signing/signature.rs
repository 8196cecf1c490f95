//! Raw ECDSA Signature Types
//!
//! Scalars are kept as 32-byte big-endian words, the same layout the compact
//! secp256k1 encoding and the transaction encoder use.

use crate::error::DecodeError;
use std::fmt;

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
pub const SECP256K1_ORDER: [u8; 32] = secp256k1::constants::CURVE_ORDER;

/// Half of the secp256k1 curve order, rounded down (n / 2).
pub const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// ECDSA `(r, s)` with both scalars in `[1, n-1]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl RawSignature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Result<Self, DecodeError> {
        if !is_valid_scalar(&r) {
            return Err(DecodeError::MalformedSignature(
                "r is outside [1, n-1]".to_string(),
            ));
        }
        if !is_valid_scalar(&s) {
            return Err(DecodeError::MalformedSignature(
                "s is outside [1, n-1]".to_string(),
            ));
        }
        Ok(Self { r, s })
    }

    /// `r || s`, the compact encoding used for recovery.
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSignature")
            .field("r", &hex::encode(self.r))
            .field("s", &hex::encode(self.s))
            .finish()
    }
}

/// Selects which of the two candidate public keys an `(r, s)` pair recovers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoveryId(u8);

impl RecoveryId {
    pub const ZERO: RecoveryId = RecoveryId(0);
    pub const ONE: RecoveryId = RecoveryId(1);

    /// Only 0 and 1 are produced; the x-overflow ids 2 and 3 are never
    /// valid on this chain.
    pub fn new(value: u8) -> Option<Self> {
        match value {
            0 | 1 => Some(Self(value)),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }
}

/// `0 < k < n`
pub fn is_valid_scalar(k: &[u8; 32]) -> bool {
    k.iter().any(|&b| b != 0) && *k < SECP256K1_ORDER
}

/// `n - k` for `0 < k < n`, big-endian with borrow.
pub(crate) fn order_minus(k: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = SECP256K1_ORDER[i] as i16 - k[i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = diff as u8;
    }
    out
}
