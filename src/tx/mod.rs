//! Transaction Module
//!
//! Handles parameter building, encoding, and decoding for legacy and
//! EIP-1559 transactions.

pub mod decode;
pub mod encoder;
pub mod params;
pub mod rlp;

pub use decode::{decode_signed, decode_unsigned, DecodedTransaction};
pub use encoder::{encode_signed, encode_unsigned, signature_v, signing_digest, SignedTransaction};
pub use params::{
    build, FeeMarketParameters, Generation, LegacyParameters, TransactionDefaults,
    TransactionParameters, TransactionRequest, FEE_MARKET_TX_TYPE,
};
