//! DER Structures Returned by the Oracle
//!
//! Purpose-built reader and writer for the two structures the oracle speaks:
//! - `SubjectPublicKeyInfo` holding an uncompressed secp256k1 point (RFC 5480)
//! - `ECDSA-Sig-Value`, an ordered pair of INTEGERs (RFC 3279)
//!
//! Nothing else of ASN.1 is recognized.

use crate::crypto::RawPublicKey;
use crate::error::DecodeError;
use crate::signing::RawSignature;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;

/// id-ecPublicKey, 1.2.840.10045.2.1
pub const OID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];

/// secp256k1, 1.3.132.0.10
pub const OID_SECP256K1: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x0a];

/// Length of `0x04 || X || Y`
const UNCOMPRESSED_POINT_LEN: usize = 65;

// =============================================================================
// Reader
// =============================================================================

struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn byte(&mut self) -> Result<u8, String> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| "unexpected end of input".to_string())?;
        self.pos += 1;
        Ok(b)
    }

    /// Definite lengths only, at most two length octets.
    fn length(&mut self) -> Result<usize, String> {
        let first = self.byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        let octets = (first & 0x7f) as usize;
        if octets == 0 || octets > 2 {
            return Err(format!("unsupported length form 0x{:02x}", first));
        }
        let mut len = 0usize;
        for _ in 0..octets {
            len = (len << 8) | self.byte()? as usize;
        }
        if len < 0x80 || (octets == 2 && len < 0x100) {
            return Err("non-minimal length".to_string());
        }
        Ok(len)
    }

    /// Read one TLV with the expected tag and return its contents.
    fn element(&mut self, tag: u8) -> Result<&'a [u8], String> {
        let found = self.byte()?;
        if found != tag {
            return Err(format!("expected tag 0x{:02x}, found 0x{:02x}", tag, found));
        }
        let len = self.length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| format!("element length {} overruns input", len))?;
        let contents = &self.buf[self.pos..end];
        self.pos = end;
        Ok(contents)
    }

    fn finish(&self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(format!("{} trailing bytes", self.buf.len() - self.pos))
        }
    }
}

/// Decode a positive INTEGER into a left-padded 32-byte big-endian word.
fn integer_to_word(contents: &[u8]) -> Result<[u8; 32], String> {
    if contents.is_empty() {
        return Err("empty INTEGER".to_string());
    }
    if contents[0] & 0x80 != 0 {
        return Err("negative INTEGER".to_string());
    }
    let magnitude = if contents.len() > 1 && contents[0] == 0x00 {
        if contents[1] & 0x80 == 0 {
            return Err("non-minimal INTEGER".to_string());
        }
        &contents[1..]
    } else {
        contents
    };
    if magnitude.len() > 32 {
        return Err(format!("INTEGER of {} bytes exceeds 256 bits", magnitude.len()));
    }
    let mut word = [0u8; 32];
    word[32 - magnitude.len()..].copy_from_slice(magnitude);
    Ok(word)
}

// =============================================================================
// Decoding
// =============================================================================

/// Extract the raw point from a DER `SubjectPublicKeyInfo`.
///
/// The algorithm must be id-ecPublicKey over secp256k1 and the key material
/// an uncompressed point.
pub fn parse_public_key(der: &[u8]) -> Result<RawPublicKey, DecodeError> {
    parse_public_key_inner(der).map_err(DecodeError::InvalidKeyFormat)
}

fn parse_public_key_inner(der: &[u8]) -> Result<RawPublicKey, String> {
    let mut outer = DerReader::new(der);
    let spki = outer.element(TAG_SEQUENCE)?;
    outer.finish()?;

    let mut spki = DerReader::new(spki);
    let mut algorithm = DerReader::new(spki.element(TAG_SEQUENCE)?);
    if algorithm.element(TAG_OID)? != OID_EC_PUBLIC_KEY {
        return Err("algorithm is not id-ecPublicKey".to_string());
    }
    if algorithm.element(TAG_OID)? != OID_SECP256K1 {
        return Err("curve is not secp256k1".to_string());
    }
    algorithm.finish()?;

    let bits = spki.element(TAG_BIT_STRING)?;
    spki.finish()?;

    let (&unused_bits, point) = bits
        .split_first()
        .ok_or_else(|| "empty BIT STRING".to_string())?;
    if unused_bits != 0 {
        return Err(format!("BIT STRING has {} unused bits", unused_bits));
    }
    if point.len() != UNCOMPRESSED_POINT_LEN {
        return Err(format!(
            "expected {}-byte uncompressed point, got {} bytes",
            UNCOMPRESSED_POINT_LEN,
            point.len()
        ));
    }
    RawPublicKey::from_uncompressed(point)
        .ok_or_else(|| format!("point tag 0x{:02x} is not uncompressed", point[0]))
}

/// Decode a DER `ECDSA-Sig-Value` into `(r, s)`.
pub fn parse_signature(der: &[u8]) -> Result<RawSignature, DecodeError> {
    let (r, s) = parse_signature_inner(der).map_err(DecodeError::MalformedSignature)?;
    RawSignature::new(r, s)
}

fn parse_signature_inner(der: &[u8]) -> Result<([u8; 32], [u8; 32]), String> {
    let mut outer = DerReader::new(der);
    let mut pair = DerReader::new(outer.element(TAG_SEQUENCE)?);
    outer.finish()?;

    let r = integer_to_word(pair.element(TAG_INTEGER)?)?;
    let s = integer_to_word(pair.element(TAG_INTEGER)?)?;
    pair.finish()?;
    Ok((r, s))
}

// =============================================================================
// Encoding
// =============================================================================

fn write_element(out: &mut Vec<u8>, tag: u8, contents: &[u8]) {
    out.push(tag);
    match contents.len() {
        len if len < 0x80 => out.push(len as u8),
        len if len < 0x100 => out.extend_from_slice(&[0x81, len as u8]),
        len => out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]),
    }
    out.extend_from_slice(contents);
}

fn word_to_integer(word: &[u8; 32]) -> Vec<u8> {
    let start = word.iter().position(|&b| b != 0).unwrap_or(31);
    let mut contents = Vec::with_capacity(33);
    if word[start] & 0x80 != 0 {
        contents.push(0x00);
    }
    contents.extend_from_slice(&word[start..]);
    contents
}

/// Encode a raw point as a DER `SubjectPublicKeyInfo`.
pub fn encode_public_key(public_key: &RawPublicKey) -> Vec<u8> {
    let mut algorithm = Vec::new();
    write_element(&mut algorithm, TAG_OID, OID_EC_PUBLIC_KEY);
    write_element(&mut algorithm, TAG_OID, OID_SECP256K1);

    let mut bits = Vec::with_capacity(1 + UNCOMPRESSED_POINT_LEN);
    bits.push(0x00);
    bits.push(0x04);
    bits.extend_from_slice(public_key.as_bytes());

    let mut spki = Vec::new();
    write_element(&mut spki, TAG_SEQUENCE, &algorithm);
    write_element(&mut spki, TAG_BIT_STRING, &bits);

    let mut out = Vec::with_capacity(spki.len() + 2);
    write_element(&mut out, TAG_SEQUENCE, &spki);
    out
}

/// Encode `(r, s)` as a DER `ECDSA-Sig-Value`.
pub fn encode_signature(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    let mut pair = Vec::with_capacity(70);
    write_element(&mut pair, TAG_INTEGER, &word_to_integer(r));
    write_element(&mut pair, TAG_INTEGER, &word_to_integer(s));

    let mut out = Vec::with_capacity(pair.len() + 2);
    write_element(&mut out, TAG_SEQUENCE, &pair);
    out
}
