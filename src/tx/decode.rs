//! Transaction Decoder
//!
//! Inverse of the encoder. Used to double-check a signed artifact before it
//! leaves the signer: decode it, rebuild the digest, recover the sender.

use super::encoder::{signing_digest, EIP155_V_OFFSET, LEGACY_V_OFFSET};
use super::params::{
    FeeMarketParameters, LegacyParameters, TransactionParameters, FEE_MARKET_TX_TYPE,
};
use super::rlp::{self, Item};
use crate::crypto::Address;
use crate::error::{DecodeError, SignerResult};
use crate::signing::{recover_address, RawSignature, RecoveryId};

/// A signed transaction split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub params: TransactionParameters,
    pub v: u64,
    pub signature: RawSignature,
}

impl DecodedTransaction {
    /// Recovery id implied by `v` for this generation.
    pub fn recovery_id(&self) -> Result<RecoveryId, DecodeError> {
        let parity = match &self.params {
            TransactionParameters::Legacy(LegacyParameters { chain_id: None, .. }) => {
                self.v.checked_sub(LEGACY_V_OFFSET)
            }
            TransactionParameters::Legacy(LegacyParameters {
                chain_id: Some(chain_id),
                ..
            }) => chain_id
                .checked_mul(2)
                .and_then(|base| base.checked_add(EIP155_V_OFFSET))
                .and_then(|base| self.v.checked_sub(base)),
            TransactionParameters::FeeMarket(_) => Some(self.v),
        };

        parity
            .and_then(|p| u8::try_from(p).ok())
            .and_then(RecoveryId::new)
            .ok_or_else(|| malformed(format!("v = {} is not valid for this transaction", self.v)))
    }

    /// Address that produced the signature.
    pub fn recover_sender(&self) -> SignerResult<Address> {
        let recovery_id = self.recovery_id()?;
        let digest = signing_digest(&self.params);
        recover_address(&digest, &self.signature, recovery_id)
    }
}

/// Parse the preimage produced by `encode_unsigned`.
pub fn decode_unsigned(bytes: &[u8]) -> Result<TransactionParameters, DecodeError> {
    match split_type(bytes)? {
        Envelope::Legacy(payload) => {
            let item = rlp::decode(payload)?;
            let fields = item.as_list()?;
            match fields.len() {
                6 => legacy_params(fields, None),
                9 => {
                    if fields[7].as_u64()? != 0 || fields[8].as_u64()? != 0 {
                        return Err(malformed("EIP-155 trailer must be (chainId, 0, 0)"));
                    }
                    legacy_params(fields, Some(fields[6].as_u64()?))
                }
                n => Err(malformed(format!(
                    "unsigned legacy transaction has {} fields, expected 6 or 9",
                    n
                ))),
            }
        }
        Envelope::FeeMarket(payload) => {
            let item = rlp::decode(payload)?;
            let fields = item.as_list()?;
            if fields.len() != 9 {
                return Err(malformed(format!(
                    "unsigned fee-market transaction has {} fields, expected 9",
                    fields.len()
                )));
            }
            fee_market_params(fields)
        }
    }
}

/// Parse a broadcastable transaction.
pub fn decode_signed(bytes: &[u8]) -> Result<DecodedTransaction, DecodeError> {
    let (params, trailer) = match split_type(bytes)? {
        Envelope::Legacy(payload) => {
            let item = rlp::decode(payload)?;
            let fields = item.as_list()?;
            if fields.len() != 9 {
                return Err(malformed(format!(
                    "signed legacy transaction has {} fields, expected 9",
                    fields.len()
                )));
            }
            let v = fields[6].as_u64()?;
            let chain_id = legacy_chain_id(v)?;
            (
                legacy_params(&fields[..6], chain_id)?,
                read_trailer(&fields[6..])?,
            )
        }
        Envelope::FeeMarket(payload) => {
            let item = rlp::decode(payload)?;
            let fields = item.as_list()?;
            if fields.len() != 12 {
                return Err(malformed(format!(
                    "signed fee-market transaction has {} fields, expected 12",
                    fields.len()
                )));
            }
            (
                fee_market_params(&fields[..9])?,
                read_trailer(&fields[9..])?,
            )
        }
    };

    let (v, signature) = trailer;
    let decoded = DecodedTransaction {
        params,
        v,
        signature,
    };
    decoded.recovery_id()?;
    Ok(decoded)
}

// =============================================================================
// Helpers
// =============================================================================

enum Envelope<'a> {
    Legacy(&'a [u8]),
    FeeMarket(&'a [u8]),
}

fn split_type(bytes: &[u8]) -> Result<Envelope<'_>, DecodeError> {
    match bytes.first() {
        None => Err(malformed("empty transaction")),
        Some(&b) if b >= 0xc0 => Ok(Envelope::Legacy(bytes)),
        Some(&FEE_MARKET_TX_TYPE) => Ok(Envelope::FeeMarket(&bytes[1..])),
        Some(&b) => Err(malformed(format!("unsupported transaction type 0x{:02x}", b))),
    }
}

fn legacy_chain_id(v: u64) -> Result<Option<u64>, DecodeError> {
    match v {
        27 | 28 => Ok(None),
        v if v >= EIP155_V_OFFSET => Ok(Some((v - EIP155_V_OFFSET) / 2)),
        v => Err(malformed(format!("legacy v = {} is neither 27/28 nor EIP-155", v))),
    }
}

fn legacy_params(fields: &[Item<'_>], chain_id: Option<u64>) -> Result<TransactionParameters, DecodeError> {
    Ok(TransactionParameters::Legacy(LegacyParameters {
        nonce: fields[0].as_u64()?,
        gas_price: fields[1].as_u128()?,
        gas_limit: fields[2].as_u64()?,
        to: fields[3].as_address()?,
        value: fields[4].as_u128()?,
        data: fields[5].as_bytes()?.to_vec(),
        chain_id,
    }))
}

fn fee_market_params(fields: &[Item<'_>]) -> Result<TransactionParameters, DecodeError> {
    if !fields[8].as_list()?.is_empty() {
        return Err(malformed("access lists are not supported"));
    }
    Ok(TransactionParameters::FeeMarket(FeeMarketParameters {
        chain_id: fields[0].as_u64()?,
        nonce: fields[1].as_u64()?,
        max_priority_fee_per_gas: fields[2].as_u128()?,
        max_fee_per_gas: fields[3].as_u128()?,
        gas_limit: fields[4].as_u64()?,
        to: fields[5].as_address()?,
        value: fields[6].as_u128()?,
        data: fields[7].as_bytes()?.to_vec(),
    }))
}

fn read_trailer(fields: &[Item<'_>]) -> Result<(u64, RawSignature), DecodeError> {
    let v = fields[0].as_u64()?;
    let r = fields[1].as_word()?;
    let s = fields[2].as_word()?;
    Ok((v, RawSignature::new(r, s)?))
}

fn malformed(msg: impl Into<String>) -> DecodeError {
    DecodeError::MalformedTransaction(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::encoder::{encode_unsigned, SignedTransaction};

    fn legacy(chain_id: Option<u64>) -> TransactionParameters {
        TransactionParameters::Legacy(LegacyParameters {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
            value: 1_000_000_000_000_000_000,
            data: vec![],
            chain_id,
        })
    }

    #[test]
    fn test_decode_eip155_example() {
        let raw = hex::decode(
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83",
        )
        .unwrap();
        let decoded = decode_signed(&raw).unwrap();
        assert_eq!(decoded.params, legacy(Some(1)));
        assert_eq!(decoded.v, 37);
        assert_eq!(decoded.recovery_id().unwrap(), RecoveryId::ZERO);
        // The EIP-155 example is signed by private key 0x4646...46.
        assert_eq!(
            decoded.recover_sender().unwrap().checksummed(),
            "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F"
        );
    }

    #[test]
    fn test_unsigned_round_trip() {
        for params in [legacy(Some(5)), legacy(None)] {
            assert_eq!(decode_unsigned(&encode_unsigned(&params)).unwrap(), params);
        }
    }

    #[test]
    fn test_signed_round_trip_preserves_parity() {
        let signature = RawSignature::new([0x11; 32], [0x22; 32]).unwrap();
        for params in [legacy(Some(1337)), legacy(None)] {
            let signed = SignedTransaction::new(params.clone(), signature, RecoveryId::ONE).unwrap();
            let decoded = decode_signed(&signed.raw).unwrap();
            assert_eq!(decoded.params, params);
            assert_eq!(decoded.signature, signature);
            assert_eq!(decoded.recovery_id().unwrap(), RecoveryId::ONE);
        }
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_v() {
        assert!(decode_unsigned(&[0x01, 0xc0]).is_err());
        assert!(decode_unsigned(&[]).is_err());

        let signature = RawSignature::new([0x11; 32], [0x22; 32]).unwrap();
        let signed = SignedTransaction::new(legacy(None), signature, RecoveryId::ZERO).unwrap();
        let mut raw = signed.raw.clone();
        // v sits right after the six body fields; 27 -> 29
        let v_pos = raw.iter().rposition(|&b| b == 27).unwrap();
        raw[v_pos] = 29;
        assert!(decode_signed(&raw).is_err());
    }
}
