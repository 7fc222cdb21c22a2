//! Copilot configuration
//!
//! Layered lowest to highest:
//!
//! 1. built-in defaults
//! 2. optional TOML file
//! 3. `HIVEMIND__SECTION__KEY` environment variables
//! 4. the legacy deployment variables (`HEDERA_NETWORK`, `HEDERA_ACCOUNT_ID`,
//!    `HEDERA_PRIVATE_KEY`, `GROQ_API_KEY`, `CODEX_MODEL`, `DEBUG_MODEL`,
//!    `CONTRACT_REGISTRY`)

use config::{Config, Environment, File, FileFormat};
use hive_agents::ai::{DEFAULT_CHAT_ENDPOINT, DEFAULT_CODEX_MODEL, DEFAULT_DEBUG_MODEL};
use hive_agents::{AgentDescriptor, StaticDirectory};
use hive_crypto::{KeyScheme, PublicKey};
use hive_ledger::network::MAX_FILE_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "hivemind.toml";

/// Prefix of layered environment variables
pub const ENV_PREFIX: &str = "HIVEMIND";

/// Legacy variable → configuration key
const LEGACY_VARS: [(&str, &str); 8] = [
    ("HEDERA_NETWORK", "ledger.network"),
    ("HEDERA_ACCOUNT_ID", "ledger.account_id"),
    ("HEDERA_PRIVATE_KEY", "ledger.private_key"),
    ("GROQ_API_KEY", "ai.api_key"),
    ("CODEX_MODEL", "ai.codex_model"),
    ("DEBUG_MODEL", "ai.debug_model"),
    ("CONTRACT_REGISTRY", "registry.contract_id"),
    ("HEDERA_CONTRACT_REGISTRY_ID", "registry.contract_id"),
];

/// Complete copilot configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CopilotConfig {
    /// Ledger network and operator
    #[serde(default)]
    pub ledger: LedgerSettings,

    /// Language-model collaborator
    #[serde(default)]
    pub ai: AiSettings,

    /// Contract registry
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Agent collaboration
    #[serde(default)]
    pub agents: AgentSettings,

    /// Solidity compiler
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Ledger settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// `testnet` or `mainnet`
    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub private_key: Option<String>,

    /// Pin key parsing to `ed25519` or `ecdsa`
    #[serde(default)]
    pub key_scheme: Option<String>,

    /// Ledger gateway submission endpoints; required before connecting
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Ledger gateway read endpoints; the submission endpoints serve reads when empty
    #[serde(default)]
    pub mirror_endpoints: Vec<String>,

    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,

    /// Upload chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_network() -> String {
    "testnet".to_string()
}

fn default_receipt_timeout_secs() -> u64 {
    30
}

fn default_receipt_poll_ms() -> u64 {
    500
}

fn default_chunk_size() -> usize {
    MAX_FILE_CHUNK_SIZE
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            network: default_network(),
            account_id: None,
            private_key: None,
            key_scheme: None,
            endpoints: Vec::new(),
            mirror_endpoints: Vec::new(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_ms: default_receipt_poll_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl fmt::Debug for LedgerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerSettings")
            .field("network", &self.network)
            .field("account_id", &self.account_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("key_scheme", &self.key_scheme)
            .field("endpoints", &self.endpoints)
            .field("mirror_endpoints", &self.mirror_endpoints)
            .field("receipt_timeout_secs", &self.receipt_timeout_secs)
            .field("receipt_poll_ms", &self.receipt_poll_ms)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl LedgerSettings {
    /// Account id and private key, both required
    pub fn operator(&self) -> Result<(&str, &str), ConfigError> {
        let account_id =
            non_empty(&self.account_id).ok_or(ConfigError::Missing("ledger.account_id"))?;
        let private_key =
            non_empty(&self.private_key).ok_or(ConfigError::Missing("ledger.private_key"))?;
        Ok((account_id, private_key))
    }

    /// Pinned key scheme, if any
    pub fn scheme(&self) -> Result<Option<KeyScheme>, ConfigError> {
        match non_empty(&self.key_scheme) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::Invalid {
                field: "ledger.key_scheme",
                reason: format!("unknown scheme '{}'", raw),
            }),
        }
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// AI settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Model for code generation
    #[serde(default = "default_codex_model")]
    pub codex_model: String,

    /// Model for security analysis
    #[serde(default = "default_debug_model")]
    pub debug_model: String,

    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ai_endpoint() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_codex_model() -> String {
    DEFAULT_CODEX_MODEL.to_string()
}

fn default_debug_model() -> String {
    DEFAULT_DEBUG_MODEL.to_string()
}

fn default_ai_timeout_secs() -> u64 {
    60
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_ai_endpoint(),
            api_key: None,
            codex_model: default_codex_model(),
            debug_model: default_debug_model(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("codex_model", &self.codex_model)
            .field("debug_model", &self.debug_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Registry settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Registry contract id
    #[serde(default)]
    pub contract_id: Option<String>,

    /// Gas for registry calls
    #[serde(default = "default_registry_gas")]
    pub gas: u64,
}

fn default_registry_gas() -> u64 {
    300_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            contract_id: None,
            gas: default_registry_gas(),
        }
    }
}

/// One configured agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Hex public key
    pub public_key: String,

    /// `ed25519` or `ecdsa`
    #[serde(default = "default_agent_scheme")]
    pub scheme: String,

    #[serde(default)]
    pub topic_id: Option<String>,
}

fn default_agent_scheme() -> String {
    "ed25519".to_string()
}

impl AgentEntry {
    pub fn descriptor(&self) -> Result<AgentDescriptor, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            field: "agents.directory",
            reason: format!("{}: {}", self.id, reason),
        };
        let scheme: KeyScheme = self
            .scheme
            .parse()
            .map_err(|_| invalid(format!("unknown scheme '{}'", self.scheme)))?;
        let public_key = PublicKey::from_hex(scheme, &self.public_key)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(AgentDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            capabilities: self.capabilities.iter().cloned().collect(),
            public_key,
            topic_id: self.topic_id.clone(),
        })
    }
}

/// Agent collaboration settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Capability requested for audits
    #[serde(default = "default_capability")]
    pub capability: String,

    #[serde(default = "default_require_signatures")]
    pub require_signatures: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Known agents
    #[serde(default)]
    pub directory: Vec<AgentEntry>,
}

fn default_capability() -> String {
    hive_audit::AUDIT_CAPABILITY.to_string()
}

fn default_require_signatures() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_response_timeout_secs() -> u64 {
    30
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            capability: default_capability(),
            require_signatures: default_require_signatures(),
            poll_interval_ms: default_poll_interval_ms(),
            response_timeout_secs: default_response_timeout_secs(),
            directory: Vec::new(),
        }
    }
}

impl AgentSettings {
    /// Directory built from the configured entries
    pub fn directory(&self) -> Result<StaticDirectory, ConfigError> {
        let descriptors = self
            .directory
            .iter()
            .map(AgentEntry::descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StaticDirectory::new(descriptors))
    }
}

/// Compiler settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// `solc` executable
    #[serde(default = "default_solc_path")]
    pub solc_path: String,

    #[serde(default = "default_optimize")]
    pub optimize: bool,

    #[serde(default = "default_optimizer_runs")]
    pub optimizer_runs: u32,
}

fn default_solc_path() -> String {
    "solc".to_string()
}

fn default_optimize() -> bool {
    true
}

fn default_optimizer_runs() -> u32 {
    200
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            solc_path: default_solc_path(),
            optimize: default_optimize(),
            optimizer_runs: default_optimizer_runs(),
        }
    }
}

/// Logging settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl CopilotConfig {
    /// Load from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load from an optional file and an explicit variable map
    pub fn load_with_env(
        path: Option<&Path>,
        vars: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&CopilotConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let layered: HashMap<String, String> = vars
            .iter()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(layered)),
        );

        for (var, key) in LEGACY_VARS {
            if let Some(value) = vars.get(var).filter(|v| !v.trim().is_empty()) {
                builder = builder.set_override(key, value.clone())?;
            }
        }

        let config: CopilotConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(network = %config.ledger.network, "configuration loaded");
        Ok(config)
    }

    /// Checks that need no network access
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.scheme()?;
        if self.ledger.chunk_size == 0 || self.ledger.chunk_size > MAX_FILE_CHUNK_SIZE {
            return Err(ConfigError::Invalid {
                field: "ledger.chunk_size",
                reason: format!("must be within 1..={}", MAX_FILE_CHUNK_SIZE),
            });
        }
        self.agents.directory()?;
        Ok(())
    }

    /// TOML rendering with secrets removed
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        if redacted.ledger.private_key.is_some() {
            redacted.ledger.private_key = Some("<redacted>".to_string());
        }
        if redacted.ai.api_key.is_some() {
            redacted.ai.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&redacted).map_err(|e| ConfigError::Invalid {
            field: "config",
            reason: e.to_string(),
        })
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            field: "config",
            reason: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}
