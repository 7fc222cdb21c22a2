//! # HiveMind Agents
//!
//! Agent-to-agent collaboration over ledger topics:
//! - [`AgentMessage`]: the JSON wire format, signed over every field but `signature`
//! - [`AgentDirectory`]: discovery of agents by capability
//! - [`AgentProtocol`]: Discover → Connect → SendRequest → AwaitResponse → ParseReport
//! - [`ai`]: the language-model collaborator used for AI commentary

pub mod ai;
pub mod directory;
pub mod error;
pub mod message;
pub mod protocol;

pub use ai::{AiProvider, ChatCompletionsProvider, CompletionRequest, CompletionResponse};
pub use directory::{AgentDescriptor, AgentDirectory, StaticDirectory};
pub use error::{AiError, ProtocolError};
pub use message::{AgentMessage, AUDIT_REQUEST, AUDIT_RESPONSE};
pub use protocol::{AgentProtocol, AgentReport, PendingRequest, ProtocolOptions};
