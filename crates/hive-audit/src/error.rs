//! Error types for audits

use hive_agents::{AiError, ProtocolError};
use thiserror::Error;

/// Audit errors
#[derive(Error, Debug)]
pub enum AuditError {
    /// The AI collaborator failed
    #[error("AI analysis failed: {0}")]
    Ai(#[from] AiError),

    /// The agent collaboration round failed
    #[error("Agent collaboration failed: {0}")]
    Collaboration(#[from] ProtocolError),

    /// A custom pattern did not compile
    #[error("Invalid pattern {id}: {reason}")]
    InvalidPattern { id: String, reason: String },
}

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
