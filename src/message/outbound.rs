//! Sender-side builder for process messages.

use super::{RawMessage, ValidationError, Value, Variables, CORRELATION_KEY};

/// A message about to be published.
///
/// ```rust
/// use process_router::message::OutboundMessage;
///
/// let json = OutboundMessage::new("paymentReceived")
///     .with_correlation_key("ORD-1")
///     .with_variable("amount", 10)
///     .encode()
///     .unwrap();
/// assert!(json.contains("\"correlationKeys\""));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    name: String,
    target_process_id: Option<String>,
    correlation_keys: Variables,
    payload: Variables,
}

impl OutboundMessage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the conventional single correlation value.
    pub fn with_correlation_key(self, value: impl Into<Value>) -> Self {
        self.with_correlation(CORRELATION_KEY, value)
    }

    pub fn with_correlation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.correlation_keys.insert(key.into(), value.into());
        self
    }

    pub fn with_target_process(mut self, process_id: impl Into<String>) -> Self {
        self.target_process_id = Some(process_id.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: Variables) -> Self {
        self.payload.extend(payload);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts into the wire form without validating.
    pub fn into_raw(self) -> RawMessage {
        RawMessage {
            name: Some(self.name),
            target_process_id: self.target_process_id,
            correlation_keys: (!self.correlation_keys.is_empty()).then_some(self.correlation_keys),
            correlation_key: None,
            payload: Some(self.payload),
        }
    }

    /// Serializes to the JSON wire shape.
    ///
    /// A blank name is rejected here so a bad message never reaches the queue.
    pub fn encode(&self) -> Result<String, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        serde_json::to_string(&self.clone().into_raw())
            .map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::decode;
    use serde_json::json;

    #[test]
    fn test_encode_rejects_blank_name() {
        let err = OutboundMessage::new("  ").encode().unwrap_err();
        assert_eq!(err, ValidationError::MissingName);
    }

    #[test]
    fn test_encoded_message_is_routable() {
        let json = OutboundMessage::new("orderShipped")
            .with_correlation("orderId", "O-7")
            .with_correlation("tenant", 3)
            .with_variable("carrier", "DHL")
            .encode()
            .unwrap();

        let inbound = decode(&json).unwrap();
        assert_eq!(inbound.name(), "orderShipped");
        assert_eq!(inbound.correlation_keys()["orderId"], json!("O-7"));
        assert_eq!(inbound.correlation_keys()["tenant"], json!(3));
        assert_eq!(inbound.payload()["carrier"], json!("DHL"));
    }

    #[test]
    fn test_encode_omits_empty_correlation() {
        let json = OutboundMessage::new("orderCompleted").encode().unwrap();
        assert!(!json.contains("correlationKeys"));
        assert!(json.contains("\"payload\":{}"));
    }
}
