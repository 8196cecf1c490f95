//! Transaction Encoder
//!
//! Byte-exact serialization of both generations:
//!
//! ```text
//! legacy unsigned  rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])
//!                  rlp([nonce, gasPrice, gasLimit, to, value, data])   without EIP-155
//! legacy signed    rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])
//! 1559 unsigned    0x02 || rlp([chainId, nonce, maxPriority, maxFee, gasLimit, to, value, data, []])
//! 1559 signed      0x02 || rlp([chainId, nonce, maxPriority, maxFee, gasLimit, to, value, data, [], v, r, s])
//! ```

use super::params::{
    FeeMarketParameters, LegacyParameters, TransactionParameters, FEE_MARKET_TX_TYPE,
};
use super::rlp;
use crate::crypto::keccak256;
use crate::error::{SignerError, SignerResult};
use crate::signing::{RawSignature, RecoveryId};

/// `v` offset for pre-EIP-155 signatures.
pub const LEGACY_V_OFFSET: u64 = 27;

/// `v` offset for EIP-155 signatures: `v = chainId * 2 + 35 + recoveryId`.
pub const EIP155_V_OFFSET: u64 = 35;

// =============================================================================
// Unsigned form and digest
// =============================================================================

/// The preimage whose keccak256 is signed.
pub fn encode_unsigned(params: &TransactionParameters) -> Vec<u8> {
    match params {
        TransactionParameters::Legacy(p) => {
            let mut fields = legacy_fields(p);
            if let Some(chain_id) = p.chain_id {
                fields.push(rlp::encode_u64(chain_id));
                fields.push(rlp::encode_u64(0));
                fields.push(rlp::encode_u64(0));
            }
            rlp::encode_list(&fields)
        }
        TransactionParameters::FeeMarket(p) => typed(&fee_market_fields(p)),
    }
}

pub fn signing_digest(params: &TransactionParameters) -> [u8; 32] {
    keccak256(&encode_unsigned(params))
}

// =============================================================================
// Signed form
// =============================================================================

/// The `v` value carried by the signed encoding.
pub fn signature_v(params: &TransactionParameters, recovery_id: RecoveryId) -> SignerResult<u64> {
    let parity = recovery_id.to_u8() as u64;
    match params {
        TransactionParameters::Legacy(LegacyParameters {
            chain_id: Some(chain_id),
            ..
        }) => chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(EIP155_V_OFFSET + parity))
            .ok_or_else(|| {
                SignerError::Encoding(format!("v overflows for chain id {}", chain_id))
            }),
        TransactionParameters::Legacy(LegacyParameters { chain_id: None, .. }) => {
            Ok(LEGACY_V_OFFSET + parity)
        }
        TransactionParameters::FeeMarket(_) => Ok(parity),
    }
}

/// Serialize with `(v, r, s)` appended.
pub fn encode_signed(
    params: &TransactionParameters,
    signature: &RawSignature,
    recovery_id: RecoveryId,
) -> SignerResult<Vec<u8>> {
    let v = signature_v(params, recovery_id)?;
    let trailer = [
        rlp::encode_u64(v),
        rlp::encode_word(&signature.r),
        rlp::encode_word(&signature.s),
    ];

    let encoded = match params {
        TransactionParameters::Legacy(p) => {
            let mut fields = legacy_fields(p);
            fields.extend(trailer);
            rlp::encode_list(&fields)
        }
        TransactionParameters::FeeMarket(p) => {
            let mut fields = fee_market_fields(p);
            fields.extend(trailer);
            typed(&fields)
        }
    };
    Ok(encoded)
}

/// Final artifact of a sign operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub params: TransactionParameters,
    pub signature: RawSignature,
    pub recovery_id: RecoveryId,
    /// Broadcastable bytes.
    pub raw: Vec<u8>,
    /// Transaction hash, `keccak256(raw)`.
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn new(
        params: TransactionParameters,
        signature: RawSignature,
        recovery_id: RecoveryId,
    ) -> SignerResult<Self> {
        let raw = encode_signed(&params, &signature, recovery_id)?;
        let hash = keccak256(&raw);
        Ok(Self {
            params,
            signature,
            recovery_id,
            raw,
            hash,
        })
    }

    pub fn v(&self) -> SignerResult<u64> {
        signature_v(&self.params, self.recovery_id)
    }

    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

// =============================================================================
// Field lists
// =============================================================================

fn legacy_fields(p: &LegacyParameters) -> Vec<Vec<u8>> {
    vec![
        rlp::encode_u64(p.nonce),
        rlp::encode_u128(p.gas_price),
        rlp::encode_u64(p.gas_limit),
        rlp::encode_address(&p.to),
        rlp::encode_u128(p.value),
        rlp::encode_bytes(&p.data),
    ]
}

fn fee_market_fields(p: &FeeMarketParameters) -> Vec<Vec<u8>> {
    vec![
        rlp::encode_u64(p.chain_id),
        rlp::encode_u64(p.nonce),
        rlp::encode_u128(p.max_priority_fee_per_gas),
        rlp::encode_u128(p.max_fee_per_gas),
        rlp::encode_u64(p.gas_limit),
        rlp::encode_address(&p.to),
        rlp::encode_u128(p.value),
        rlp::encode_bytes(&p.data),
        rlp::encode_list(&[]),
    ]
}

fn typed(fields: &[Vec<u8>]) -> Vec<u8> {
    let list = rlp::encode_list(fields);
    let mut out = Vec::with_capacity(1 + list.len());
    out.push(FEE_MARKET_TX_TYPE);
    out.extend_from_slice(&list);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Address;

    fn to_address(s: &str) -> Address {
        s.parse().unwrap()
    }

    /// EIP-155 example transaction.
    fn eip155_example() -> TransactionParameters {
        TransactionParameters::Legacy(LegacyParameters {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: to_address("0x3535353535353535353535353535353535353535"),
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id: Some(1),
        })
    }

    #[test]
    fn test_eip155_signing_data() {
        assert_eq!(
            hex::encode(encode_unsigned(&eip155_example())),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(signing_digest(&eip155_example())),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_transaction() {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        hex::decode_to_slice(
            "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
            &mut r,
        )
        .unwrap();
        hex::decode_to_slice(
            "67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83",
            &mut s,
        )
        .unwrap();
        let signature = RawSignature::new(r, s).unwrap();

        let signed = SignedTransaction::new(eip155_example(), signature, RecoveryId::ZERO).unwrap();
        assert_eq!(signed.v().unwrap(), 37);
        assert_eq!(
            hex::encode(&signed.raw),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_legacy_without_chain_id_uses_six_fields() {
        let mut params = eip155_example();
        if let TransactionParameters::Legacy(p) = &mut params {
            p.chain_id = None;
        }
        let unsigned = encode_unsigned(&params);
        assert_eq!(
            hex::encode(&unsigned),
            "e9098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080"
        );
        assert_eq!(signature_v(&params, RecoveryId::ONE).unwrap(), 28);
    }

    #[test]
    fn test_v_overflow_is_an_encoding_error() {
        let mut params = eip155_example();
        if let TransactionParameters::Legacy(p) = &mut params {
            p.chain_id = Some(u64::MAX / 2);
        }
        assert!(matches!(
            signature_v(&params, RecoveryId::ONE),
            Err(SignerError::Encoding(_))
        ));
    }

    #[test]
    fn test_fee_market_layout() {
        let params = TransactionParameters::FeeMarket(FeeMarketParameters {
            chain_id: 1,
            nonce: 0,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 2_000_000_000,
            gas_limit: 21_000,
            to: to_address("0x0000000000000000000000000000000000000001"),
            value: 0,
            data: vec![],
        });

        let unsigned = encode_unsigned(&params);
        assert_eq!(unsigned[0], FEE_MARKET_TX_TYPE);
        assert_eq!(
            hex::encode(&unsigned),
            "02e70180843b9aca0084773594008252089400000000000000000000000000000000000000018080c0"
        );
        assert_eq!(signing_digest(&params), keccak256(&unsigned));
        assert_eq!(signature_v(&params, RecoveryId::ONE).unwrap(), 1);
    }
}
