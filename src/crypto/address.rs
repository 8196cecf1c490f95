//! Address Derivation
//!
//! Turns a raw 64-byte secp256k1 point into a 20-byte Ethereum address and
//! its mixed-case checksummed rendering (EIP-55).

use crate::error::{SignerError, SignerResult};
use std::fmt;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash (used for Ethereum addresses, digests and tx hashes)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Uncompressed secp256k1 point without the 0x04 tag: `X || Y`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawPublicKey(pub [u8; 64]);

impl RawPublicKey {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Build from a 65-byte SEC1 uncompressed encoding (`0x04 || X || Y`).
    pub fn from_uncompressed(point: &[u8]) -> Option<Self> {
        if point.len() != 65 || point[0] != 0x04 {
            return None;
        }
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&point[1..]);
        Some(Self(raw))
    }
}

impl fmt::Debug for RawPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPublicKey(0x{})", hex::encode(self.0))
    }
}

/// 20-byte Ethereum address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case hex rendering, `0x`-prefixed.
    pub fn checksummed(&self) -> String {
        to_checksum_address(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.checksummed())
    }
}

impl FromStr for Address {
    type Err = SignerError;

    /// Accepts all-lower, all-upper, or correctly checksummed mixed-case hex.
    fn from_str(s: &str) -> SignerResult<Self> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if body.len() != 40 {
            return Err(SignerError::invalid(format!(
                "address must be 20 bytes of hex, got {} characters",
                body.len()
            )));
        }

        let bytes = hex::decode(body)
            .map_err(|e| SignerError::invalid(format!("address is not hex: {}", e)))?;
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes);
        let address = Address(raw);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.checksummed()[2..] != *body {
            return Err(SignerError::invalid(format!("address {} fails checksum", s)));
        }

        Ok(address)
    }
}

/// Derive the address of a point: the low 20 bytes of `keccak256(X || Y)`.
pub fn derive_address(public_key: &RawPublicKey) -> Address {
    let hash = keccak256(public_key.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

/// Convert raw address bytes to checksummed Ethereum address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::with_capacity(2 + lower.len());
    result.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }

    result
}
