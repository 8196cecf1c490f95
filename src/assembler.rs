//! Transaction Assembler
//!
//! Orchestrates one invocation:
//!
//! ```text
//! build -> resolve -> derive -> encode -> digest -> sign -> normalize -> recover v -> encode signed
//! ```
//!
//! The assembler holds no per-request state. The only thing shared between
//! invocations is the optional [`KeyCache`].

use crate::config::{FeeDefaults, SignerConfig};
use crate::crypto::{derive_address, Address};
use crate::error::SignerResult;
use crate::oracle::{resolve_public_key, sign_digest, SigningOracle};
use crate::signing::{is_low_s, normalize_s, recover_v};
use crate::tx::{
    build, signing_digest, SignedTransaction, TransactionDefaults, TransactionParameters,
    TransactionRequest,
};
use crate::utils::logging::{redact_address, redact_hash, redact_key_id};
use crate::utils::{CachedKey, KeyCache};
use tracing::{debug, info};

pub struct TransactionAssembler<O, F> {
    oracle: O,
    fees: F,
    cache: Option<KeyCache>,
}

impl<O: SigningOracle, F: FeeDefaults> TransactionAssembler<O, F> {
    /// Assembler without a key cache.
    pub fn new(oracle: O, fees: F) -> Self {
        Self {
            oracle,
            fees,
            cache: None,
        }
    }

    /// Assembler with the key cache enabled as `config` says.
    pub fn from_config(oracle: O, fees: F, config: &SignerConfig) -> Self {
        let assembler = Self::new(oracle, fees);
        if config.cache_public_keys {
            assembler.with_cache(KeyCache::new())
        } else {
            assembler
        }
    }

    pub fn with_cache(mut self, cache: KeyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn cache(&self) -> Option<&KeyCache> {
        self.cache.as_ref()
    }

    /// Defaults for the configured network, fees included.
    pub fn defaults_for(&self, config: &SignerConfig) -> SignerResult<TransactionDefaults> {
        let fees = self.fees.fee_schedule(&config.network)?;
        Ok(config.transaction_defaults(fees))
    }

    /// Public key and address of `key_id`, from the cache when possible.
    pub fn resolve(&self, key_id: &str) -> SignerResult<CachedKey> {
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(key_id)) {
            debug!(key_id = %redact_key_id(key_id), "public key cache hit");
            return Ok(hit);
        }

        let public_key = resolve_public_key(&self.oracle, key_id)?;
        let resolved = CachedKey {
            public_key,
            address: derive_address(&public_key),
        };

        if let Some(cache) = &self.cache {
            cache.insert(key_id, resolved);
        }
        Ok(resolved)
    }

    /// Checksummed address controlled by `key_id`.
    pub fn status(&self, key_id: &str) -> SignerResult<Address> {
        let address = self.resolve(key_id)?.address;
        info!(
            key_id = %redact_key_id(key_id),
            address = %redact_address(&address),
            "resolved signer address"
        );
        Ok(address)
    }

    /// Build, sign and serialize the transaction described by `request`.
    ///
    /// The request is validated before the oracle is contacted.
    pub fn sign(
        &self,
        key_id: &str,
        request: &TransactionRequest,
        defaults: &TransactionDefaults,
    ) -> SignerResult<SignedTransaction> {
        let params = build(request, defaults)?;
        let signer = self.resolve(key_id)?;
        self.sign_parameters(key_id, &signer.address, params)
    }

    /// Sign already-built parameters for the signer at `expected`.
    pub fn sign_parameters(
        &self,
        key_id: &str,
        expected: &Address,
        params: TransactionParameters,
    ) -> SignerResult<SignedTransaction> {
        let digest = signing_digest(&params);
        debug!(
            generation = ?params.generation(),
            nonce = params.nonce(),
            digest = %redact_hash(&digest),
            "signing digest computed"
        );

        let raw = sign_digest(&self.oracle, key_id, &digest)?;
        if !is_low_s(&raw.s) {
            debug!("oracle returned high-s signature");
        }
        let signature = normalize_s(raw);
        let recovery_id = recover_v(&digest, &signature, expected)?;

        let signed = SignedTransaction::new(params, signature, recovery_id)?;
        info!(
            key_id = %redact_key_id(key_id),
            generation = ?signed.params.generation(),
            tx_hash = %redact_hash(&signed.hash),
            "transaction signed"
        );
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Network, StaticFeeDefaults};
    use crate::error::{OracleError, SignerError};
    use crate::oracle::{LocalOracle, SignRequest};
    use crate::tx::decode_signed;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY_ID: &str = "alias/test";

    struct CountingOracle {
        inner: LocalOracle,
        public_key_calls: AtomicUsize,
    }

    impl SigningOracle for CountingOracle {
        fn get_public_key(&self, key_id: &str) -> Result<Vec<u8>, OracleError> {
            self.public_key_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_public_key(key_id)
        }

        fn sign(&self, request: &SignRequest<'_>) -> Result<Vec<u8>, OracleError> {
            self.inner.sign(request)
        }
    }

    fn config() -> SignerConfig {
        SignerConfig::new(KEY_ID, Network::new("goerli", 5))
    }

    fn request() -> TransactionRequest {
        TransactionRequest::from_event(&json!({
            "dst_address": "0x0000000000000000000000000000000000000001",
            "amount": 100,
            "nonce": 0
        }))
        .unwrap()
    }

    #[test]
    fn test_cache_avoids_second_lookup() {
        let oracle = CountingOracle {
            inner: LocalOracle::generate(KEY_ID),
            public_key_calls: AtomicUsize::new(0),
        };
        let assembler = TransactionAssembler::from_config(oracle, StaticFeeDefaults::default(), &config());

        let first = assembler.status(KEY_ID).unwrap();
        let second = assembler.status(KEY_ID).unwrap();
        assert_eq!(first, second);
        assert_eq!(assembler.oracle().public_key_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_cache_every_call_resolves() {
        let oracle = CountingOracle {
            inner: LocalOracle::generate(KEY_ID),
            public_key_calls: AtomicUsize::new(0),
        };
        let assembler = TransactionAssembler::new(oracle, StaticFeeDefaults::default());

        assembler.status(KEY_ID).unwrap();
        assembler.status(KEY_ID).unwrap();
        assert_eq!(assembler.oracle().public_key_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sign_recovers_to_status_address() {
        for high_s in [false, true] {
            let oracle = LocalOracle::generate(KEY_ID).with_high_s(high_s);
            let assembler = TransactionAssembler::new(oracle, StaticFeeDefaults::default());
            let defaults = assembler.defaults_for(&config()).unwrap();

            let signed = assembler.sign(KEY_ID, &request(), &defaults).unwrap();
            assert!(is_low_s(&signed.signature.s));

            let decoded = decode_signed(&signed.raw).unwrap();
            assert_eq!(
                decoded.recover_sender().unwrap(),
                assembler.status(KEY_ID).unwrap()
            );
        }
    }

    #[test]
    fn test_mismatched_key_fails_recovery() {
        let oracle = LocalOracle::generate(KEY_ID);
        let assembler = TransactionAssembler::new(oracle, StaticFeeDefaults::default());
        let defaults = assembler.defaults_for(&config()).unwrap();
        let params = build(&request(), &defaults).unwrap();

        let stranger = Address([0x42; 20]);
        let result = assembler.sign_parameters(KEY_ID, &stranger, params);
        assert!(matches!(result, Err(SignerError::RecoveryFailed { .. })));
    }

    #[test]
    fn test_invalid_request_never_reaches_oracle() {
        let oracle = CountingOracle {
            inner: LocalOracle::generate(KEY_ID),
            public_key_calls: AtomicUsize::new(0),
        };
        let assembler = TransactionAssembler::new(oracle, StaticFeeDefaults::default());
        let defaults = assembler.defaults_for(&config()).unwrap();
        let request = TransactionRequest::from_event(&json!({"amount": 1, "nonce": 0})).unwrap();

        let result = assembler.sign(KEY_ID, &request, &defaults);
        assert!(matches!(result, Err(SignerError::MissingParameter(_))));
        assert_eq!(assembler.oracle().public_key_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let assembler =
            TransactionAssembler::new(LocalOracle::generate("other"), StaticFeeDefaults::default());
        assert!(matches!(
            assembler.status(KEY_ID),
            Err(SignerError::Oracle(OracleError::NotFound(_)))
        ));
    }
}
