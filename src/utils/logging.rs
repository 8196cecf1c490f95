//! Structured Logging with Sensitive Data Redaction
//!
//! Log records go through `tracing`. Identifiers that could help an attacker
//! correlate keys and funds are passed through the redaction helpers below
//! before they reach a field:
//! - Key identifiers
//! - Full addresses (partial redaction)
//! - Transaction hashes (partial redaction)
//!
//! Secret key material is never logged at all.

use crate::crypto::Address;
use crate::error::{SignerError, SignerResult};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `level` when set. Level names used by other
/// runtimes (`WARNING`, `CRITICAL`) are accepted.
pub fn init_tracing(level: &str) -> SignerResult<()> {
    let directive = normalize_level(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .map_err(|e| SignerError::configuration(format!("LOG_LEVEL={:?}: {}", level, e)))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| SignerError::configuration(format!("tracing already initialised: {}", e)))
}

fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => "warn".to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Partially redact a key identifier.
///
/// Aliases (`alias/...`) keep their readable prefix; key ids and ARNs show
/// only the last 4 characters.
pub fn redact_key_id(key_id: &str) -> String {
    let trimmed = key_id.trim();

    if let Some(alias) = trimmed.strip_prefix("alias/") {
        return format!("alias/{}", elide(alias, 0, 4));
    }

    // arn:aws:kms:<region>:<account>:key/<uuid>
    let tail = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    elide(tail, 0, 4)
}

/// `0xd8dA6B...6045`
pub fn redact_address(address: &Address) -> String {
    elide(&address.checksummed(), 8, 4)
}

/// `0x1234567890...abcdef`
pub fn redact_hash(hash: &[u8; 32]) -> String {
    elide(&format!("0x{}", hex::encode(hash)), 12, 6)
}

/// Keep `head` leading and `tail` trailing characters. Values too short to
/// hide anything in between are redacted entirely.
fn elide(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.trim().chars().collect();
    if chars.is_empty() {
        return "[EMPTY]".to_string();
    }
    if chars.len() <= head + tail + 4 {
        return format!("[REDACTED:{}chars]", chars.len());
    }

    let prefix: String = chars[..head].iter().collect();
    let suffix: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
