//! # Message Model
//!
//! The canonical shape of a process message and the rules that make it
//! routable.
//!
//! - [`InboundMessage`] is what the router consumes. It can only be built
//!   through [`InboundMessage::parse`], so a value of this type is always valid.
//! - [`RawMessage`] is the permissive wire form (see [`wire`]).
//! - [`OutboundMessage`] is the sender-side builder that produces the wire form.

pub mod error;
pub mod outbound;
pub mod wire;

pub use error::*;
pub use outbound::OutboundMessage;
pub use wire::{decode, decode_slice, RawMessage};

pub use serde_json::Value;

/// Process variables, signal event data and correlation constraints.
///
/// Insertion order is preserved (`serde_json` is built with `preserve_order`).
pub type Variables = serde_json::Map<String, Value>;

/// Conventional name of the single correlation entry.
pub const CORRELATION_KEY: &str = "correlationKey";

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    name: String,
    target_process_id: Option<String>,
    correlation_keys: Variables,
    payload: Variables,
}

impl InboundMessage {
    /// Validates raw wire fields into a routable message.
    ///
    /// # Rules
    /// - `name` must be non-blank; it is stored trimmed.
    /// - A blank `target_process_id` counts as absent.
    /// - A correlation map whose values are all `null` or blank strings means
    ///   "no correlation", so a sender that always fills the field with `""`
    ///   still starts processes. Once any value is set, every entry is kept
    ///   as an exact constraint, blanks included.
    /// - Correlation values must be scalars.
    /// - The legacy `correlationKey` field is appended as
    ///   [`CORRELATION_KEY`] unless `correlationKeys` already carries it or
    ///   the legacy value is blank.
    pub fn parse(raw: RawMessage) -> Result<Self, ValidationError> {
        let name = raw
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::MissingName)?
            .to_string();

        let target_process_id = raw
            .target_process_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let mut correlation_keys = raw.correlation_keys.unwrap_or_default();
        if let Some(legacy) = raw.correlation_key.filter(|v| !is_blank(v)) {
            if !correlation_keys.contains_key(CORRELATION_KEY) {
                correlation_keys.insert(CORRELATION_KEY.to_string(), legacy);
            }
        }

        if let Some((key, _)) = correlation_keys
            .iter()
            .find(|(_, v)| v.is_object() || v.is_array())
        {
            return Err(ValidationError::NonScalarCorrelation(key.clone()));
        }
        if correlation_keys.values().all(is_blank) {
            correlation_keys.clear();
        }

        Ok(Self {
            name,
            target_process_id,
            correlation_keys,
            payload: raw.payload.unwrap_or_default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_process_id(&self) -> Option<&str> {
        self.target_process_id.as_deref()
    }

    pub fn correlation_keys(&self) -> &Variables {
        &self.correlation_keys
    }

    pub fn payload(&self) -> &Variables {
        &self.payload
    }

    /// True when at least one correlation constraint survived validation.
    pub fn has_correlation(&self) -> bool {
        !self.correlation_keys.is_empty()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl TryFrom<RawMessage> for InboundMessage {
    type Error = ValidationError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}
