//! # Wire Shape
//!
//! The JSON document exchanged on the message queue. Every field is optional
//! at this layer; [`InboundMessage::parse`](super::InboundMessage::parse) is
//! what enforces the rules.
//!
//! ```json
//! {
//!   "name": "paymentReceived",
//!   "correlationKeys": { "correlationKey": "ORD-1" },
//!   "payload": { "amount": 10 }
//! }
//! ```
//!
//! Older senders use `messageName`, `variables` and a single `correlationKey`
//! string; those spellings are accepted as well.

use super::{InboundMessage, ValidationError, Value, Variables};
use serde::{Deserialize, Serialize};

/// Message fields exactly as they arrive on the wire, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default, alias = "messageName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_process_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_keys: Option<Variables>,

    /// Legacy single-value correlation field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_key: Option<Value>,

    #[serde(default, alias = "variables", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Variables>,
}

/// Decodes and validates a JSON message.
pub fn decode(input: &str) -> Result<InboundMessage, ValidationError> {
    let raw: RawMessage =
        serde_json::from_str(input).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    InboundMessage::parse(raw)
}

/// Decodes and validates a JSON message from raw bytes.
pub fn decode_slice(input: &[u8]) -> Result<InboundMessage, ValidationError> {
    let raw: RawMessage =
        serde_json::from_slice(input).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    InboundMessage::parse(raw)
}
