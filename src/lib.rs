//! KMS Transaction Signer
//!
//! Offline Ethereum transaction signing for keys that never leave a remote
//! asymmetric-key custody service (the signing oracle).
//!
//! # Architecture
//!
//! This crate provides:
//! - **oracle**: the oracle port, its DER formats, and an in-process oracle
//! - **crypto**: keccak256 and checksummed address derivation
//! - **tx**: parameter building, RLP encoding and decoding of legacy and
//!   EIP-1559 transactions
//! - **signing**: low-s normalization and recovery-id search
//! - **assembler**: the `status` and `sign` operations
//! - **handler**: the JSON request/response boundary
//! - **config**: environment configuration and fee defaults
//!
//! # Security
//!
//! The crate never sees a production private key. The development oracle
//! zeroizes the buffers its secret is parsed from.
//!
//! # Example
//!
//! ```rust,ignore
//! use kms_tx_signer::{handle, LocalOracle, SignerConfig, StaticFeeDefaults, TransactionAssembler};
//!
//! let config = SignerConfig::from_env()?;
//! let oracle = LocalOracle::generate(config.key_id.clone());
//! let assembler = TransactionAssembler::from_config(oracle, StaticFeeDefaults::from_env()?, &config);
//! let response = handle(&assembler, &config, &serde_json::json!({"operation": "status"}))?;
//! ```

pub mod assembler;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod oracle;
pub mod signing;
pub mod tx;
pub mod utils;

// Re-export key types for convenience
pub use assembler::TransactionAssembler;
pub use config::{FeeDefaults, FeeSchedule, Network, SignerConfig, StaticFeeDefaults};
pub use crypto::{derive_address, keccak256, to_checksum_address, Address, RawPublicKey};
pub use error::{DecodeError, Disposition, ErrorKind, OracleError, SignerError, SignerResult};
pub use handler::{handle, Operation, Response};
pub use oracle::{LocalOracle, SignRequest, SigningOracle};
pub use signing::{RawSignature, RecoveryId};
pub use tx::{
    DecodedTransaction, SignedTransaction, TransactionDefaults, TransactionParameters,
    TransactionRequest,
};
