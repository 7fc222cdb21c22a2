//! Agent request/response protocol
//!
//! A best-effort state machine on top of topic channels:
//!
//! ```text
//! Discover(capability) ─► Connect(agent) ─► SendRequest ─► AwaitResponse(timeout) ─► ParseReport
//!     directory             topic id          signed        polls the topic            report map
//! ```
//!
//! Requests carry a fresh correlation id; a response is accepted only if it
//! echoes that id, comes from another sender, has a `*_response` type, and
//! passes the signature policy. Everything else on the topic is ignored.

use hive_ledger::{LedgerSession, TopicChannel};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::directory::AgentDirectory;
use crate::error::ProtocolError;
use crate::message::AgentMessage;

/// Tunables for the protocol
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolOptions {
    /// Delay between topic polls while awaiting a response
    pub poll_interval: Duration,
    /// Reject responses that cannot be verified against the directory
    pub require_signatures: bool,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            require_signatures: true,
        }
    }
}

/// A request that has been submitted and awaits its response
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRequest {
    pub topic_id: String,
    pub recipient: String,
    pub correlation_id: Uuid,
    /// Responses are searched after this sequence number
    pub after_sequence: u64,
    pub transaction_id: String,
    pub message: AgentMessage,
}

/// Audit findings reported by a collaborating agent
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub vulnerabilities: Vec<String>,
    pub severity: String,
    pub recommendations: Vec<String>,
}

/// Protocol driver bound to one session
pub struct AgentProtocol<'a> {
    session: &'a LedgerSession,
    directory: Arc<dyn AgentDirectory>,
    agent_id: String,
    options: ProtocolOptions,
    connections: Mutex<HashMap<String, String>>,
}

impl<'a> AgentProtocol<'a> {
    /// Protocol acting as the session's operator account
    pub fn new(session: &'a LedgerSession, directory: Arc<dyn AgentDirectory>) -> Self {
        Self {
            agent_id: session.account_id().to_string(),
            session,
            directory,
            options: ProtocolOptions::default(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_options(mut self, options: ProtocolOptions) -> Self {
        self.options = options;
        self
    }

    /// Id this protocol sends as
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Agents advertising a capability
    pub async fn discover(&self, capability: &str) -> Result<Vec<String>, ProtocolError> {
        let agents = self.directory.discover(capability).await?;
        tracing::debug!(capability = %capability, found = agents.len(), "agents discovered");
        Ok(agents)
    }

    /// Topic shared with `agent_id`, creating one on first contact
    pub async fn connect(&self, agent_id: &str) -> Result<String, ProtocolError> {
        let cached = self.connections.lock().get(agent_id).cloned();
        if let Some(topic_id) = cached {
            return Ok(topic_id);
        }

        let descriptor = self
            .directory
            .lookup(agent_id)
            .await?
            .ok_or_else(|| ProtocolError::UnknownAgent(agent_id.to_string()))?;

        let topic_id = match descriptor.topic_id {
            Some(existing) => existing,
            None => {
                let memo = format!("hivemind:{}:{}", self.agent_id, agent_id);
                TopicChannel::new(self.session)
                    .create_channel(&memo)
                    .await?
                    .topic_id
            }
        };

        tracing::info!(agent = %agent_id, topic_id = %topic_id, "connected to agent");
        self.connections
            .lock()
            .insert(agent_id.to_string(), topic_id.clone());
        Ok(topic_id)
    }

    /// Sign and submit a request
    pub async fn send_request(
        &self,
        topic_id: &str,
        recipient: &str,
        message_type: &str,
        content: Value,
    ) -> Result<PendingRequest, ProtocolError> {
        let channel = TopicChannel::new(self.session);
        let baseline = channel.latest_sequence(topic_id).await?;

        let request =
            AgentMessage::request(&self.agent_id, recipient, topic_id, message_type, content);
        let correlation_id = request.correlation_id.unwrap_or_else(Uuid::new_v4);
        let (ack, message) = channel.send(topic_id, request, true).await?;

        tracing::debug!(
            topic_id = %topic_id,
            recipient = %recipient,
            correlation_id = %correlation_id,
            "request sent"
        );
        Ok(PendingRequest {
            topic_id: topic_id.to_string(),
            recipient: recipient.to_string(),
            correlation_id,
            after_sequence: ack.sequence_number.unwrap_or(baseline),
            transaction_id: ack.transaction_id,
            message,
        })
    }

    /// Poll for the response to `pending`, failing with a timeout error past `timeout`
    pub async fn await_response(
        &self,
        pending: &PendingRequest,
        timeout: Duration,
    ) -> Result<AgentMessage, ProtocolError> {
        let started = Instant::now();
        let channel = TopicChannel::new(self.session);

        let poll = async {
            let mut cursor = pending.after_sequence;
            loop {
                let received = channel
                    .messages::<AgentMessage>(&pending.topic_id, cursor)
                    .await?;
                for entry in received {
                    cursor = cursor.max(entry.sequence_number);
                    if self.accepts(&entry.message, pending).await? {
                        return Ok::<_, ProtocolError>(entry.message);
                    }
                }
                tokio::time::sleep(self.options.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(
                    topic_id = %pending.topic_id,
                    waited_ms,
                    "no response before deadline"
                );
                Err(ProtocolError::Timeout {
                    topic_id: pending.topic_id.clone(),
                    waited_ms,
                })
            }
        }
    }

    async fn accepts(
        &self,
        message: &AgentMessage,
        pending: &PendingRequest,
    ) -> Result<bool, ProtocolError> {
        if message.sender == self.agent_id
            || !message.is_response()
            || message.correlation_id != Some(pending.correlation_id)
        {
            return Ok(false);
        }

        let descriptor = self.directory.lookup(&message.sender).await?;
        match (&message.signature, descriptor) {
            (Some(_), Some(descriptor)) => {
                if message.verify(&descriptor.public_key) {
                    Ok(true)
                } else {
                    tracing::warn!(
                        sender = %message.sender,
                        "response signature invalid, skipping"
                    );
                    Ok(false)
                }
            }
            _ if self.options.require_signatures => {
                tracing::warn!(sender = %message.sender, "unauthenticated response, skipping");
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Extract an audit report from a response
    pub fn parse_report(message: &AgentMessage) -> Result<AgentReport, ProtocolError> {
        let content = match message.content.get("report") {
            Some(nested) => nested,
            None => &message.content,
        };
        let object = content.as_object().ok_or_else(|| {
            ProtocolError::MalformedReport("report content is not a JSON object".to_string())
        })?;

        let vulnerabilities = match object.get("vulnerabilities") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().filter_map(finding_label).collect(),
            Some(other) => {
                return Err(ProtocolError::MalformedReport(format!(
                    "vulnerabilities must be a list, got {}",
                    other
                )))
            }
        };
        let recommendations = match object.get("recommendations") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        let severity = object
            .get("severity")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Ok(AgentReport {
            vulnerabilities,
            severity,
            recommendations,
        })
    }
}

fn finding_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
