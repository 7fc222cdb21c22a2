//! Remote agent fixtures
//!
//! A [`TestAgent`] plays the other side of the agent protocol: it holds its
//! own key, publishes a descriptor, and answers requests by writing signed
//! responses straight into the memory ledger's topic history.

use hive_agents::{AgentDescriptor, AgentMessage};
use hive_crypto::{to_canonical_bytes, KeyScheme, OperatorKey, SignatureBytes};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::keys::test_key;
use crate::ledger::MemoryLedger;

/// A collaborating agent outside the session under test
pub struct TestAgent {
    pub id: String,
    key: OperatorKey,
    capabilities: Vec<String>,
    topic_id: Option<String>,
}

impl TestAgent {
    pub fn new(id: &str, capabilities: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            key: test_key(KeyScheme::Ed25519, id),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            topic_id: None,
        }
    }

    /// Advertise an existing shared topic
    pub fn listening_on(mut self, topic_id: &str) -> Self {
        self.topic_id = Some(topic_id.to_string());
        self
    }

    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            id: self.id.clone(),
            name: self.id.clone(),
            capabilities: self.capabilities.iter().cloned().collect(),
            public_key: self.key.public_key(),
            topic_id: self.topic_id.clone(),
        }
    }

    /// Most recent request on the topic addressed to this agent
    pub fn pending_request(&self, ledger: &MemoryLedger, topic_id: &str) -> Option<AgentMessage> {
        ledger
            .topic_history(topic_id)
            .iter()
            .rev()
            .filter_map(|raw| serde_json::from_slice::<AgentMessage>(raw).ok())
            .find(|m| m.recipient == self.id && !m.is_response())
    }

    /// Signed response to `request`
    pub fn response(&self, request: &AgentMessage, content: Value) -> AgentMessage {
        let mut response = AgentMessage::response_to(request, self.id.clone(), content);
        if let Err(e) = response.sign(&self.key) {
            tracing::warn!(agent = %self.id, error = %e, "test agent could not sign response");
        }
        response
    }

    /// Write `message` to the topic as this agent; returns its sequence number
    pub fn post(
        &self,
        ledger: &MemoryLedger,
        topic_id: &str,
        message: &AgentMessage,
    ) -> Option<u64> {
        let bytes = to_canonical_bytes(message).ok()?;
        ledger.inject_message(topic_id, bytes)
    }

    /// Answer the latest request on the topic with a signed response
    pub fn respond(&self, ledger: &MemoryLedger, topic_id: &str, content: Value) -> Option<u64> {
        let request = self.pending_request(ledger, topic_id)?;
        let response = self.response(&request, content);
        self.post(ledger, topic_id, &response)
    }

    /// Answer with a signature made by the wrong key
    pub fn respond_forged(
        &self,
        ledger: &MemoryLedger,
        topic_id: &str,
        content: Value,
    ) -> Option<u64> {
        let request = self.pending_request(ledger, topic_id)?;
        let mut response = AgentMessage::response_to(&request, self.id.clone(), content);
        response.signature = Some(SignatureBytes(vec![0u8; 64]));
        self.post(ledger, topic_id, &response)
    }

    /// Background task that answers the first request it sees on `topic_id`
    pub fn spawn_responder(
        self,
        ledger: Arc<MemoryLedger>,
        topic_id: String,
        content: Value,
        delay: Duration,
    ) -> JoinHandle<Option<u64>> {
        tokio::spawn(async move {
            for _ in 0..400 {
                if self.pending_request(&ledger, &topic_id).is_some() {
                    tokio::time::sleep(delay).await;
                    return self.respond(&ledger, &topic_id, content);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            None
        })
    }
}
