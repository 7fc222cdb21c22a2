//! Ledger error types
//!
//! Every failure of a session primitive is reported with the [`Stage`] it
//! happened in and, where the network produced one, the ledger [`Status`].
//! Validation failures are distinct types raised before any I/O.

use hive_crypto::{CryptoError, KeyScheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for session primitives
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Session primitive (or read query) a failure happened in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    CreateFile,
    AppendFile,
    CreateTopic,
    SubmitMessage,
    CreateContract,
    ExecuteFunction,
    FileContents,
    FileInfo,
    TopicMessages,
    CallFunction,
    Connect,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CreateFile => "createFile",
            Stage::AppendFile => "appendFile",
            Stage::CreateTopic => "createTopic",
            Stage::SubmitMessage => "submitMessage",
            Stage::CreateContract => "createContract",
            Stage::ExecuteFunction => "executeFunction",
            Stage::FileContents => "fileContents",
            Stage::FileInfo => "fileInfo",
            Stage::TopicMessages => "topicMessages",
            Stage::CallFunction => "callFunction",
            Stage::Connect => "connect",
        };
        f.write_str(name)
    }
}

/// Status codes reported by the network at precheck or in a receipt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Precheck accepted the transaction
    Ok,
    /// Receipt reports the transaction succeeded
    Success,
    InvalidSignature,
    InsufficientPayerBalance,
    InsufficientTxFee,
    DuplicateTransaction,
    TransactionExpired,
    Busy,
    InvalidFileId,
    FileDeleted,
    MaxFileSizeExceeded,
    InvalidTopicId,
    MessageSizeTooLarge,
    InvalidContractId,
    ContractRevertExecuted,
    InsufficientGas,
    #[serde(other)]
    Unknown,
}

impl Status {
    /// Whether the status denotes acceptance
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Ok | Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Failure talking to the network
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No reachable endpoint: {0}")]
    Unavailable(String),

    #[error("Injected failure: {0}")]
    Injected(String),
}

/// Failure of a session primitive
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Network refused the transaction before consensus
    #[error("{stage} rejected at precheck: {status}")]
    Precheck { stage: Stage, status: Status },

    /// Receipt reports a non-success status
    #[error("{stage} failed in receipt for {transaction_id}: {status}")]
    Receipt {
        stage: Stage,
        status: Status,
        transaction_id: String,
    },

    /// No receipt became available in time
    #[error("{stage} receipt for {transaction_id} not available after {waited_ms}ms")]
    ReceiptTimeout {
        stage: Stage,
        transaction_id: String,
        waited_ms: u64,
    },

    /// Receipt succeeded but lacks the created resource id
    #[error("{stage} receipt is missing {field}")]
    MissingField { stage: Stage, field: &'static str },

    /// Request could not be delivered or answered
    #[error("{stage} transport failure: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: TransportError,
    },

    /// Transaction could not be encoded
    #[error("{stage} encoding failure: {reason}")]
    Encoding { stage: Stage, reason: String },
}

impl LedgerError {
    /// Stage the failure happened in
    pub fn stage(&self) -> Stage {
        match self {
            LedgerError::Precheck { stage, .. }
            | LedgerError::Receipt { stage, .. }
            | LedgerError::ReceiptTimeout { stage, .. }
            | LedgerError::MissingField { stage, .. }
            | LedgerError::Transport { stage, .. }
            | LedgerError::Encoding { stage, .. } => *stage,
        }
    }

    /// Underlying ledger status, when the network reported one
    pub fn status(&self) -> Option<Status> {
        match self {
            LedgerError::Precheck { status, .. } | LedgerError::Receipt { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub(crate) fn transport(stage: Stage) -> impl FnOnce(TransportError) -> LedgerError {
        move |source| LedgerError::Transport { stage, source }
    }
}

/// Failure turning configuration into an authenticated session
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Network name or account id is unusable; raised before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The private key parses under no attempted scheme
    #[error("Private key parses under no supported scheme ({})", format_attempts(.attempts))]
    NoSchemeMatched {
        attempts: Vec<(KeyScheme, CryptoError)>,
    },

    /// Connecting to the network failed
    #[error("Connection failed: {0}")]
    Connect(#[source] LedgerError),
}

fn format_attempts(attempts: &[(KeyScheme, CryptoError)]) -> String {
    attempts
        .iter()
        .map(|(scheme, e)| format!("{}: {}", scheme, e))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Invalid constructor or function parameter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// Value type has no ABI mapping
    #[error("Parameter '{name}' has unsupported type {found}")]
    UnsupportedType { name: String, found: String },

    /// Value has the right type but cannot be encoded
    #[error("Parameter '{name}' is invalid: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Failure decoding ABI return data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("ABI data truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("ABI offset or length out of range: {0}")]
    OutOfRange(String),

    #[error("ABI string is not UTF-8")]
    InvalidUtf8,
}

/// Chunked upload failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// Nothing to upload
    #[error("Artifact is empty")]
    EmptyArtifact,

    /// Chunk size of zero or above the network limit
    #[error("Chunk size {size} outside 1..={limit}")]
    InvalidChunkSize { size: usize, limit: usize },

    /// The file could not be created; nothing was committed
    #[error("File creation failed: {0}")]
    Create(#[source] LedgerError),

    /// An append failed after the file was created
    #[error(
        "Upload to {file_id} interrupted after {chunks_committed}/{total_chunks} chunks: {source}"
    )]
    Partial {
        file_id: String,
        chunks_committed: usize,
        total_chunks: usize,
        #[source]
        source: LedgerError,
    },
}

/// Why a deployment from an uploaded file failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeployFailure {
    /// Assembled file size differs from the uploaded artifact
    #[error("artifact incomplete: expected {expected} bytes, file holds {actual}")]
    IncompleteArtifact { expected: u64, actual: u64 },

    /// Contract creation or the size check failed on the ledger
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Contract creation failed; the uploaded file is left in place
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Deployment from file {file_id} failed: {cause}")]
pub struct DeploymentError {
    pub file_id: String,
    #[source]
    pub cause: DeployFailure,
}

impl DeploymentError {
    /// Underlying ledger error, if the failure came from the network
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match &self.cause {
            DeployFailure::Ledger(e) => Some(e),
            DeployFailure::IncompleteArtifact { .. } => None,
        }
    }
}

/// Topic messaging failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopicError {
    /// Serialized message exceeds the network's single-message limit
    #[error("Message of {size} bytes exceeds the {limit}-byte topic limit")]
    MessageTooLarge { size: usize, limit: usize },

    /// Message could not be serialized or signed
    #[error("Message encoding failed: {0}")]
    Encoding(#[from] CryptoError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&Status::InsufficientPayerBalance).unwrap(),
            "\"INSUFFICIENT_PAYER_BALANCE\""
        );
        let parsed: Status = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(parsed, Status::Unknown);
        assert_eq!(Status::InvalidFileId.to_string(), "INVALID_FILE_ID");
    }

    #[test]
    fn test_ledger_error_accessors() {
        let err = LedgerError::Receipt {
            stage: Stage::AppendFile,
            status: Status::FileDeleted,
            transaction_id: "0.0.2@1.000000001".to_string(),
        };
        assert_eq!(err.stage(), Stage::AppendFile);
        assert_eq!(err.status(), Some(Status::FileDeleted));
        assert!(err.to_string().contains("appendFile"));

        let timeout = LedgerError::ReceiptTimeout {
            stage: Stage::CreateTopic,
            transaction_id: "x".to_string(),
            waited_ms: 10,
        };
        assert_eq!(timeout.status(), None);
    }

    #[test]
    fn test_credential_error_lists_attempts() {
        let err = CredentialError::NoSchemeMatched {
            attempts: vec![
                (KeyScheme::Ed25519, CryptoError::InvalidHex("bad".into())),
                (KeyScheme::Ecdsa, CryptoError::InvalidHex("bad".into())),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("ED25519"));
        assert!(text.contains("ECDSA"));
    }
}
