//! Signature Normalization
//!
//! The oracle returns a bare ECDSA `(r, s)` pair. This module turns it into
//! what the chain accepts:
//! 1. canonical low-s form (EIP-2)
//! 2. a recovery id found by trial recovery against the known address

pub mod normalizer;
pub mod signature;

pub use normalizer::*;
pub use signature::*;
