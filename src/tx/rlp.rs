//! Recursive Length Prefix
//!
//! Canonical RLP as the chain validates it. The decoder is strict: any
//! input it accepts re-encodes to exactly the same bytes.

use crate::crypto::Address;
use crate::error::DecodeError;

// =============================================================================
// Encoding
// =============================================================================

pub fn encode_u64(val: u64) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(&val.to_be_bytes()))
}

pub fn encode_u128(val: u128) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(&val.to_be_bytes()))
}

/// A 32-byte big-endian scalar, encoded as a minimal integer.
pub fn encode_word(word: &[u8; 32]) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(word))
}

pub fn encode_address(address: &Address) -> Vec<u8> {
    encode_bytes(address.as_bytes())
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    let mut result = encode_header(0x80, data.len());
    result.extend_from_slice(data);
    result
}

/// Wrap already-encoded items in a list header.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut result = encode_header(0xc0, payload_len);
    result.reserve(payload_len);
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn encode_header(offset: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        vec![offset + len as u8]
    } else {
        let len_bytes = encode_length(len);
        let mut header = Vec::with_capacity(1 + len_bytes.len());
        header.push(offset + 55 + len_bytes.len() as u8);
        header.extend_from_slice(&len_bytes);
        header
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    trim_leading_zeros(&len.to_be_bytes()).to_vec()
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    &bytes[leading_zeros..]
}

// =============================================================================
// Decoding
// =============================================================================

/// One decoded RLP item, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item<'a> {
    Bytes(&'a [u8]),
    List(Vec<Item<'a>>),
}

impl<'a> Item<'a> {
    pub fn as_bytes(&self) -> Result<&'a [u8], DecodeError> {
        match self {
            Item::Bytes(b) => Ok(*b),
            Item::List(_) => Err(malformed("expected a byte string, found a list")),
        }
    }

    pub fn as_list(&self) -> Result<&[Item<'a>], DecodeError> {
        match self {
            Item::List(items) => Ok(items.as_slice()),
            Item::Bytes(_) => Err(malformed("expected a list, found a byte string")),
        }
    }

    pub fn as_u64(&self) -> Result<u64, DecodeError> {
        let bytes = self.as_integer_bytes(8)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub fn as_u128(&self) -> Result<u128, DecodeError> {
        let bytes = self.as_integer_bytes(16)?;
        Ok(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128))
    }

    pub fn as_word(&self) -> Result<[u8; 32], DecodeError> {
        let bytes = self.as_integer_bytes(32)?;
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(word)
    }

    pub fn as_address(&self) -> Result<Address, DecodeError> {
        let bytes = self.as_bytes()?;
        if bytes.len() != 20 {
            return Err(malformed(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(bytes);
        Ok(Address(raw))
    }

    fn as_integer_bytes(&self, max_len: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.as_bytes()?;
        if bytes.first() == Some(&0) {
            return Err(malformed("integer has a leading zero byte"));
        }
        if bytes.len() > max_len {
            return Err(malformed(format!(
                "integer of {} bytes exceeds {} bytes",
                bytes.len(),
                max_len
            )));
        }
        Ok(bytes)
    }
}

/// Decode exactly one item spanning all of `input`.
pub fn decode(input: &[u8]) -> Result<Item<'_>, DecodeError> {
    let (item, rest) = decode_item(input)?;
    if !rest.is_empty() {
        return Err(malformed(format!("{} trailing bytes", rest.len())));
    }
    Ok(item)
}

fn decode_item(input: &[u8]) -> Result<(Item<'_>, &[u8]), DecodeError> {
    let (&prefix, rest) = input
        .split_first()
        .ok_or_else(|| malformed("unexpected end of input"))?;

    match prefix {
        0x00..=0x7f => Ok((Item::Bytes(&input[..1]), rest)),
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            let (payload, rest) = split(rest, len)?;
            if len == 1 && payload[0] < 0x80 {
                return Err(malformed("single byte below 0x80 must not be prefixed"));
            }
            Ok((Item::Bytes(payload), rest))
        }
        0xb8..=0xbf => {
            let (len, rest) = decode_long_length(rest, (prefix - 0xb7) as usize)?;
            let (payload, rest) = split(rest, len)?;
            Ok((Item::Bytes(payload), rest))
        }
        0xc0..=0xf7 => {
            let len = (prefix - 0xc0) as usize;
            let (payload, rest) = split(rest, len)?;
            Ok((Item::List(decode_list_payload(payload)?), rest))
        }
        0xf8..=0xff => {
            let (len, rest) = decode_long_length(rest, (prefix - 0xf7) as usize)?;
            let (payload, rest) = split(rest, len)?;
            Ok((Item::List(decode_list_payload(payload)?), rest))
        }
    }
}

fn decode_list_payload(mut payload: &[u8]) -> Result<Vec<Item<'_>>, DecodeError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, rest) = decode_item(payload)?;
        items.push(item);
        payload = rest;
    }
    Ok(items)
}

fn decode_long_length(input: &[u8], len_of_len: usize) -> Result<(usize, &[u8]), DecodeError> {
    let (len_bytes, rest) = split(input, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(malformed("length has a leading zero byte"));
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(malformed("length does not fit in memory"));
    }
    let len = len_bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len < 56 {
        return Err(malformed("long form used for a length below 56"));
    }
    Ok((len, rest))
}

fn split(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), DecodeError> {
    if input.len() < len {
        return Err(malformed(format!(
            "item of {} bytes overruns the {} remaining",
            len,
            input.len()
        )));
    }
    Ok(input.split_at(len))
}

fn malformed(msg: impl Into<String>) -> DecodeError {
    DecodeError::MalformedTransaction(msg.into())
}
