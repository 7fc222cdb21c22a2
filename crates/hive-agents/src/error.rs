//! Error types for the agent layer

use hive_crypto::CryptoError;
use hive_ledger::TopicError;
use thiserror::Error;

/// Agent protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// No matching response arrived before the deadline
    #[error("No response on topic {topic_id} within {waited_ms}ms")]
    Timeout { topic_id: String, waited_ms: u64 },

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Malformed report: {0}")]
    MalformedReport(String),

    #[error("Topic error: {0}")]
    Topic(#[from] TopicError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// AI provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Provider not configured: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse failed: {0}")]
    Parse(String),
}
