//! Topic channels
//!
//! A channel is a ledger topic whose submit key is the operator public key,
//! so only holders of the operator private key can post accepted messages.
//! Messages travel as canonical JSON and can be signed with [`MessageSigner`]
//! before submission. The signature covers every serialized field of the
//! message except the signature itself.

use hive_crypto::{to_canonical_bytes, CryptoError, MessageSigner, PublicKey, SignatureBytes};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TopicError;
use crate::session::{LedgerSession, SubmitAck};

/// A created topic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub topic_id: String,
    pub memo: String,
    /// Key gating submissions (the operator key at creation)
    pub submit_key: PublicKey,
}

/// A message that can carry its own signature
pub trait TopicPayload: Serialize {
    /// Name of the serialized field holding the signature
    const SIGNATURE_FIELD: &'static str = "signature";

    /// Attach a signature over [`TopicPayload::signed_payload`]
    fn set_signature(&mut self, signature: SignatureBytes);

    /// The serialized message without its signature field
    fn signed_payload(&self) -> Result<Value, CryptoError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut value {
            fields.remove(Self::SIGNATURE_FIELD);
        }
        Ok(value)
    }
}

/// A decoded message with its position in the topic
#[derive(Clone, Debug, PartialEq)]
pub struct Received<M> {
    pub sequence_number: u64,
    pub consensus_timestamp: chrono::DateTime<chrono::Utc>,
    pub message: M,
}

/// Creates topics and moves JSON messages through them
pub struct TopicChannel<'a> {
    session: &'a LedgerSession,
}

impl<'a> TopicChannel<'a> {
    pub fn new(session: &'a LedgerSession) -> Self {
        Self { session }
    }

    /// Create a topic gated by the operator's public key
    pub async fn create_channel(&self, memo: &str) -> Result<Topic, TopicError> {
        let submit_key = self.session.public_key();
        let topic_id = self.session.create_topic(memo, &submit_key).await?;
        Ok(Topic {
            topic_id,
            memo: memo.to_string(),
            submit_key,
        })
    }

    /// Serialize `message` canonically, optionally signing it, and submit it
    ///
    /// Returns the acknowledgement together with the message as sent.
    pub async fn send<M: TopicPayload>(
        &self,
        topic_id: &str,
        mut message: M,
        sign: bool,
    ) -> Result<(SubmitAck, M), TopicError> {
        if sign {
            let payload = message.signed_payload()?;
            let signature = MessageSigner::sign(&payload, self.session.credentials().key())?;
            message.set_signature(signature);
        }
        let bytes = to_canonical_bytes(&message)?;
        let limit = self.session.profile().max_message_size;
        if bytes.len() > limit {
            return Err(TopicError::MessageTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        let ack = self.session.submit_message(topic_id, &bytes).await?;
        Ok((ack, message))
    }

    /// Submit an arbitrary JSON value as canonical bytes
    pub async fn send_json(&self, topic_id: &str, value: &Value) -> Result<SubmitAck, TopicError> {
        let bytes = to_canonical_bytes(value)?;
        let limit = self.session.profile().max_message_size;
        if bytes.len() > limit {
            return Err(TopicError::MessageTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        Ok(self.session.submit_message(topic_id, &bytes).await?)
    }

    /// Messages after `after_sequence` that decode as `M`, in append order
    ///
    /// Entries that are not valid JSON for `M` are skipped.
    pub async fn messages<M: DeserializeOwned>(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<Received<M>>, TopicError> {
        let raw = self.session.topic_messages(topic_id, after_sequence).await?;
        let mut decoded = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_slice::<M>(&entry.contents) {
                Ok(message) => decoded.push(Received {
                    sequence_number: entry.sequence_number,
                    consensus_timestamp: entry.consensus_timestamp,
                    message,
                }),
                Err(e) => tracing::warn!(
                    topic_id = %topic_id,
                    sequence = entry.sequence_number,
                    "skipping undecodable topic message: {}",
                    e
                ),
            }
        }
        Ok(decoded)
    }

    /// Highest sequence number currently on the topic (0 when empty)
    pub async fn latest_sequence(&self, topic_id: &str) -> Result<u64, TopicError> {
        let raw = self.session.topic_messages(topic_id, 0).await?;
        Ok(raw.iter().map(|m| m.sequence_number).max().unwrap_or(0))
    }
}
