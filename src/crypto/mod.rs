//! Cryptographic primitives
//!
//! Keccak hashing and Ethereum address derivation from raw secp256k1 points.

pub mod address;

pub use address::{derive_address, keccak256, to_checksum_address, Address, RawPublicKey};
