//! Agent message wire format
//!
//! Messages are UTF-8 JSON objects posted to a topic:
//!
//! ```json
//! {
//!   "sender": "0.0.1001",
//!   "recipient": "0.0.2002",
//!   "topicId": "0.0.3003",
//!   "messageType": "audit_request",
//!   "content": { "operation": "audit_request", "contract_address": "0.0.1234" },
//!   "timestamp": "2025-07-21T12:30:00Z",
//!   "signature": "…hex…",
//!   "correlationId": "6f1c…"
//! }
//! ```
//!
//! The signature covers the canonical serialization of the whole message
//! with the `signature` field removed, so a signed response cannot be
//! re-addressed or re-correlated without invalidating it. `correlationId`
//! ties a response to its request so concurrent requests on one topic are
//! disambiguated.

use chrono::{DateTime, Utc};
use hive_crypto::{CryptoError, MessageSigner, OperatorKey, PublicKey, SignatureBytes};
use hive_ledger::TopicPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message type of an audit request
pub const AUDIT_REQUEST: &str = "audit_request";

/// Message type of an audit response
pub const AUDIT_RESPONSE: &str = "audit_response";

/// A message between agents
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub sender: String,
    pub recipient: String,
    pub topic_id: String,
    pub message_type: String,
    pub content: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl AgentMessage {
    /// New request with a fresh correlation id
    pub fn request(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        topic_id: impl Into<String>,
        message_type: impl Into<String>,
        content: Value,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            topic_id: topic_id.into(),
            message_type: message_type.into(),
            content,
            timestamp: Utc::now(),
            signature: None,
            correlation_id: Some(Uuid::new_v4()),
        }
    }

    /// Response to `request`, addressed back to its sender
    pub fn response_to(request: &AgentMessage, sender: impl Into<String>, content: Value) -> Self {
        Self {
            sender: sender.into(),
            recipient: request.sender.clone(),
            topic_id: request.topic_id.clone(),
            message_type: response_type(&request.message_type),
            content,
            timestamp: Utc::now(),
            signature: None,
            correlation_id: request.correlation_id,
        }
    }

    /// Whether the type names a response
    pub fn is_response(&self) -> bool {
        self.message_type.ends_with("_response")
    }

    /// Sign every field except the signature with `key`
    pub fn sign(&mut self, key: &OperatorKey) -> Result<(), CryptoError> {
        let payload = self.signed_payload()?;
        self.signature = Some(MessageSigner::sign(&payload, key)?);
        Ok(())
    }

    /// Whether the signature verifies against `public_key`
    ///
    /// An unsigned message is never authentic.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        let Some(signature) = &self.signature else {
            return false;
        };
        match self.signed_payload() {
            Ok(payload) => MessageSigner::verify(&payload, signature, public_key),
            Err(e) => {
                tracing::debug!(error = %e, "message not serializable, treating as unverified");
                false
            }
        }
    }
}

impl TopicPayload for AgentMessage {
    fn set_signature(&mut self, signature: SignatureBytes) {
        self.signature = Some(signature);
    }
}

/// `audit_request` becomes `audit_response`; anything else gains `_response`
pub fn response_type(request_type: &str) -> String {
    match request_type.strip_suffix("_request") {
        Some(stem) => format!("{}_response", stem),
        None => format!("{}_response", request_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_crypto::{KeyScheme, OperatorKey};
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let msg = AgentMessage::request("0.0.1", "0.0.2", "0.0.3", AUDIT_REQUEST, json!({"a": 1}));
        let value = serde_json::to_value(&msg).unwrap();
        let fields = [
            "sender",
            "recipient",
            "topicId",
            "messageType",
            "content",
            "timestamp",
            "correlationId",
        ];
        for field in fields {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
        assert!(value.get("signature").is_none());
    }

    #[test]
    fn test_response_echoes_correlation() {
        let request = AgentMessage::request("0.0.1", "0.0.2", "0.0.3", AUDIT_REQUEST, json!({}));
        let response = AgentMessage::response_to(&request, "0.0.2", json!({"severity": "low"}));
        assert_eq!(response.correlation_id, request.correlation_id);
        assert_eq!(response.recipient, "0.0.1");
        assert_eq!(response.message_type, AUDIT_RESPONSE);
        assert!(response.is_response());
        assert!(!request.is_response());
    }

    #[test]
    fn test_response_type_names() {
        assert_eq!(response_type("audit_request"), "audit_response");
        assert_eq!(response_type("ping"), "ping_response");
    }

    fn signed_request(key: &OperatorKey) -> AgentMessage {
        let content = json!({"x": [1, 2]});
        let mut msg = AgentMessage::request("0.0.1", "0.0.2", "0.0.3", AUDIT_REQUEST, content);
        msg.sign(key).unwrap();
        msg
    }

    #[test]
    fn test_signature_covers_every_field() {
        let key = OperatorKey::from_secret_bytes(KeyScheme::Ed25519, &[8u8; 32]).unwrap();
        let public = key.public_key();
        let msg = signed_request(&key);
        assert!(msg.verify(&public));

        let mut tampered = msg.clone();
        tampered.content = json!({"x": [1, 3]});
        assert!(!tampered.verify(&public));

        let mut tampered = msg.clone();
        tampered.correlation_id = Some(Uuid::new_v4());
        assert!(!tampered.verify(&public));

        let mut tampered = msg.clone();
        tampered.sender = "0.0.9".into();
        assert!(!tampered.verify(&public));

        let mut tampered = msg.clone();
        tampered.recipient = "0.0.9".into();
        assert!(!tampered.verify(&public));

        let mut tampered = msg.clone();
        tampered.message_type = AUDIT_RESPONSE.into();
        assert!(!tampered.verify(&public));

        let mut tampered = msg;
        tampered.timestamp += chrono::Duration::seconds(1);
        assert!(!tampered.verify(&public));
    }

    #[test]
    fn test_signature_survives_the_wire() {
        let key = OperatorKey::from_secret_bytes(KeyScheme::Ecdsa, &[9u8; 32]).unwrap();
        let msg = signed_request(&key);
        let wire = hive_crypto::to_canonical_bytes(&msg).unwrap();
        let decoded: AgentMessage = serde_json::from_slice(&wire).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.verify(&key.public_key()));
    }

    #[test]
    fn test_messages_without_correlation_parse() {
        let raw = r#"{"sender":"a","recipient":"b","topicId":"t","messageType":"audit_response",
                      "content":{},"timestamp":"2025-07-21T12:30:00Z"}"#;
        let msg: AgentMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.correlation_id, None);
        assert_eq!(msg.signature, None);
    }
}
