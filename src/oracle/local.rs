//! In-process Signing Oracle
//!
//! Holds secp256k1 secret keys in memory and answers with the same DER
//! structures a KMS `ECC_SECG_P256K1` key produces. Meant for development
//! and tests; production deployments plug a remote client into
//! [`SigningOracle`] instead.

use super::der::{encode_public_key, encode_signature};
use super::{MessageType, SignRequest, SigningAlgorithm, SigningOracle};
use crate::crypto::{derive_address, Address, RawPublicKey};
use crate::error::{OracleError, SignerError, SignerResult};
use crate::signing::signature::order_minus;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroize;

pub struct LocalOracle {
    secp: Secp256k1<All>,
    keys: HashMap<String, SecretKey>,
    high_s: bool,
}

impl LocalOracle {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
            keys: HashMap::new(),
            high_s: false,
        }
    }

    /// Oracle holding a single key under `key_id`.
    pub fn with_key(key_id: impl Into<String>, secret: SecretKey) -> Self {
        let mut oracle = Self::new();
        oracle.insert(key_id, secret);
        oracle
    }

    /// Parse a 32-byte hex secret (`0x` optional). The decoded buffer is
    /// wiped before returning.
    pub fn from_hex(key_id: impl Into<String>, secret_hex: &str) -> SignerResult<Self> {
        let trimmed = secret_hex.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = hex::decode(body)
            .map_err(|e| SignerError::configuration(format!("dev private key is not hex: {}", e)))?;
        let secret = SecretKey::from_slice(&bytes);
        bytes.zeroize();

        let secret = secret
            .map_err(|e| SignerError::configuration(format!("dev private key: {}", e)))?;
        Ok(Self::with_key(key_id, secret))
    }

    /// Oracle with a freshly generated key.
    pub fn generate(key_id: impl Into<String>) -> Self {
        Self::with_key(key_id, generate_secret())
    }

    pub fn insert(&mut self, key_id: impl Into<String>, secret: SecretKey) {
        self.keys.insert(key_id.into(), secret);
    }

    /// Emit the upper-half `s` of every signature, as some HSMs do.
    pub fn with_high_s(mut self, high_s: bool) -> Self {
        self.high_s = high_s;
        self
    }

    /// Address of `key_id`, computed locally.
    pub fn address(&self, key_id: &str) -> Option<Address> {
        let secret = self.keys.get(key_id)?;
        let public = PublicKey::from_secret_key(&self.secp, secret);
        RawPublicKey::from_uncompressed(&public.serialize_uncompressed())
            .map(|raw| derive_address(&raw))
    }

    fn secret(&self, key_id: &str) -> Result<&SecretKey, OracleError> {
        self.keys
            .get(key_id)
            .ok_or_else(|| OracleError::NotFound(format!("no key with id {}", key_id)))
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.keys.keys().collect();
        ids.sort();
        f.debug_struct("LocalOracle")
            .field("key_ids", &ids)
            .field("high_s", &self.high_s)
            .finish()
    }
}

impl SigningOracle for LocalOracle {
    fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, OracleError> {
        let secret = self.secret(key_id)?;
        let public = PublicKey::from_secret_key(&self.secp, secret);
        let raw = RawPublicKey::from_uncompressed(&public.serialize_uncompressed())
            .ok_or_else(|| OracleError::Transport("point serialization".to_string()))?;
        Ok(encode_public_key(&raw))
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<u8>, OracleError> {
        if request.algorithm != SigningAlgorithm::EcdsaSha256 {
            return Err(OracleError::Unsupported(format!(
                "signing algorithm {}",
                request.algorithm
            )));
        }
        if request.message_type != MessageType::Digest {
            return Err(OracleError::Unsupported(format!(
                "message type {}",
                request.message_type
            )));
        }

        let secret = self.secret(request.key_id)?;
        let message = Message::from_digest_slice(request.message).map_err(|_| {
            OracleError::Unsupported(format!(
                "digest must be 32 bytes, got {}",
                request.message.len()
            ))
        })?;

        let compact = self.secp.sign_ecdsa(&message, secret).serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        // libsecp256k1 always returns low-s
        if self.high_s {
            s = order_minus(&s);
        }

        Ok(encode_signature(&r, &s))
    }
}

/// Fresh random secp256k1 secret key.
pub fn generate_secret() -> SecretKey {
    let mut bytes = [0u8; 32];
    loop {
        OsRng.fill_bytes(&mut bytes);
        if let Ok(secret) = SecretKey::from_slice(&bytes) {
            bytes.zeroize();
            return secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::der::{parse_public_key, parse_signature};
    use crate::signing::is_low_s;

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_public_key_is_kms_shaped_spki() {
        let oracle = LocalOracle::from_hex("alias/dev", KEY_ONE).unwrap();
        let der = oracle.get_public_key("alias/dev").unwrap();
        assert_eq!(der.len(), 88);
        assert_eq!(
            hex::encode(&der[..23]),
            "3056301006072a8648ce3d020106052b8104000a034200"
        );

        let raw = parse_public_key(&der).unwrap();
        assert_eq!(
            derive_address(&raw).checksummed(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
        assert_eq!(oracle.address("alias/dev"), Some(derive_address(&raw)));
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let oracle = LocalOracle::generate("a");
        assert!(matches!(
            oracle.get_public_key("b"),
            Err(OracleError::NotFound(_))
        ));
        let digest = [1u8; 32];
        assert!(matches!(
            oracle.sign(&SignRequest::digest("b", &digest)),
            Err(OracleError::NotFound(_))
        ));
    }

    #[test]
    fn test_raw_message_type_is_rejected() {
        let oracle = LocalOracle::generate("k");
        let request = SignRequest {
            key_id: "k",
            message: b"not a digest",
            message_type: MessageType::Raw,
            algorithm: SigningAlgorithm::EcdsaSha256,
        };
        assert!(matches!(
            oracle.sign(&request),
            Err(OracleError::Unsupported(_))
        ));
    }

    #[test]
    fn test_short_digest_is_rejected() {
        let oracle = LocalOracle::generate("k");
        let request = SignRequest {
            key_id: "k",
            message: &[1u8; 20],
            message_type: MessageType::Digest,
            algorithm: SigningAlgorithm::EcdsaSha256,
        };
        assert!(oracle.sign(&request).is_err());
    }

    #[test]
    fn test_high_s_mode() {
        let digest = [0x42u8; 32];
        let low = LocalOracle::from_hex("k", KEY_ONE).unwrap();
        let high = LocalOracle::from_hex("k", KEY_ONE).unwrap().with_high_s(true);

        let low_sig = parse_signature(&low.sign(&SignRequest::digest("k", &digest)).unwrap()).unwrap();
        let high_sig =
            parse_signature(&high.sign(&SignRequest::digest("k", &digest)).unwrap()).unwrap();

        assert!(is_low_s(&low_sig.s));
        assert!(!is_low_s(&high_sig.s));
        assert_eq!(low_sig.r, high_sig.r);
        assert_eq!(order_minus(&high_sig.s), low_sig.s);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(LocalOracle::from_hex("k", "zz").is_err());
        assert!(LocalOracle::from_hex("k", &"00".repeat(32)).is_err());
        assert!(LocalOracle::from_hex("k", &format!("0x{}", KEY_ONE)).is_ok());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let oracle = LocalOracle::from_hex("k", KEY_ONE).unwrap();
        let rendered = format!("{:?}", oracle);
        assert!(rendered.contains("\"k\""));
        assert!(!rendered.contains(KEY_ONE));
    }
}
