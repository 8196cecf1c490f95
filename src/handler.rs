//! Request Handler
//!
//! Maps an incoming JSON event onto the assembler and shapes the response.
//!
//! | operation | success body | rejection body |
//! |---|---|---|
//! | `status` | `{address}` | - |
//! | `sign` (legacy) | `{signed_tx}` | `{operation: "sign", error}` |
//! | `sign` (fee market) | `{signed_tx_hash, signed_tx_payload}` | `{operation: "sign", error}` |
//!
//! Only parameter errors become a rejection body. Everything else, including
//! a missing or unknown `operation`, is returned as `Err` and must fail the
//! invocation.

use crate::assembler::TransactionAssembler;
use crate::config::{FeeDefaults, SignerConfig};
use crate::error::{Disposition, SignerError, SignerResult};
use crate::oracle::SigningOracle;
use crate::tx::{Generation, SignedTransaction, TransactionRequest};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Supported `operation` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Status,
    Sign,
}

impl FromStr for Operation {
    type Err = SignerError;

    fn from_str(s: &str) -> SignerResult<Self> {
        match s {
            "status" => Ok(Operation::Status),
            "sign" => Ok(Operation::Sign),
            other => Err(SignerError::Validation(format!(
                "operation {:?} is not supported",
                other
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Status => write!(f, "status"),
            Operation::Sign => write!(f, "sign"),
        }
    }
}

/// Response payloads, serialized without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Status {
        address: String,
    },
    LegacySigned {
        signed_tx: String,
    },
    FeeMarketSigned {
        signed_tx_hash: String,
        signed_tx_payload: String,
    },
    Rejected {
        operation: String,
        error: String,
    },
}

impl Response {
    fn signed(signed: &SignedTransaction) -> Self {
        match signed.params.generation() {
            Generation::Legacy => Response::LegacySigned {
                signed_tx: signed.raw_hex(),
            },
            Generation::FeeMarket => Response::FeeMarketSigned {
                signed_tx_hash: signed.hash_hex(),
                signed_tx_payload: signed.raw_hex(),
            },
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Response::Rejected { .. })
    }
}

/// Handle one event.
pub fn handle<O, F>(
    assembler: &TransactionAssembler<O, F>,
    config: &SignerConfig,
    event: &Value,
) -> SignerResult<Response>
where
    O: SigningOracle,
    F: FeeDefaults,
{
    let operation = operation_of(event)?;
    debug!(%operation, network = %config.network, "handling event");

    match operation {
        Operation::Status => {
            let address = assembler.status(&config.key_id)?;
            Ok(Response::Status {
                address: address.checksummed(),
            })
        }
        Operation::Sign => match sign(assembler, config, event) {
            Ok(signed) => Ok(Response::signed(&signed)),
            Err(e) if e.disposition() == Disposition::Respond => {
                warn!(kind = ?e.kind(), error = %e, "sign request rejected");
                Ok(Response::Rejected {
                    operation: Operation::Sign.to_string(),
                    error: e.to_string(),
                })
            }
            Err(e) => Err(e),
        },
    }
}

fn sign<O, F>(
    assembler: &TransactionAssembler<O, F>,
    config: &SignerConfig,
    event: &Value,
) -> SignerResult<SignedTransaction>
where
    O: SigningOracle,
    F: FeeDefaults,
{
    let request = TransactionRequest::from_event(event)?;
    let defaults = assembler.defaults_for(config)?;
    assembler.sign(&config.key_id, &request, &defaults)
}

fn operation_of(event: &Value) -> SignerResult<Operation> {
    let object = event
        .as_object()
        .ok_or_else(|| SignerError::Validation("event must be a JSON object".to_string()))?;

    match object.get("operation") {
        None | Some(Value::Null) => Err(SignerError::Validation(
            "operation is required".to_string(),
        )),
        Some(Value::String(name)) => name.parse(),
        Some(other) => Err(SignerError::Validation(format!(
            "operation must be a string, got {}",
            other
        ))),
    }
}
