//! Copilot error types

use hive_audit::AuditError;
use hive_ledger::{
    AbiError, CredentialError, DeploymentError, LedgerError, ParamError, TopicError, UploadError,
};
use thiserror::Error;

/// Configuration loading or validation failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration could not be loaded: {0}")]
    Load(#[from] config::ConfigError),

    /// Required value absent; raised before any network activity
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Compilation failure
#[derive(Error, Debug)]
pub enum CompileError {
    /// Source diagnostics found errors; the compiler was not invoked
    #[error("Source rejected: {}", .errors.join("; "))]
    Rejected {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Compiler could not be run: {0}")]
    Io(#[from] std::io::Error),

    #[error("solc exited with {status}: {stderr}")]
    Solc { status: String, stderr: String },

    #[error("Unreadable compiler output: {0}")]
    Output(String),

    #[error("Contract '{0}' not found in compiler output")]
    ContractNotFound(String),
}

/// Compile, upload and deploy failure; each stage surfaces unchanged
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Deploy(#[from] DeploymentError),
}

/// Registry interaction failure
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unsupported registry action '{0}'")]
    UnsupportedAction(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Registry returned undecodable data: {0}")]
    Decode(String),
}

impl From<AbiError> for RegistryError {
    fn from(e: AbiError) -> Self {
        RegistryError::Decode(e.to_string())
    }
}

/// Any failure surfaced by the [`crate::Copilot`] facade
#[derive(Error, Debug)]
pub enum CopilotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Ai(#[from] hive_agents::AiError),
}

pub type Result<T> = std::result::Result<T, CopilotError>;
