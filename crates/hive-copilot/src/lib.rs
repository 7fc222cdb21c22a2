//! # HiveMind Copilot
//!
//! Wires the ledger, audit and agent layers into one configured service:
//!
//! - [`CopilotConfig`]: layered configuration (defaults, TOML, environment)
//! - [`Compiler`]: Solidity compilation through `solc`
//! - [`DeploymentPipeline`]: compile → chunked upload → contract creation
//! - [`RegistryAdapter`]: the contract registry's closed action set
//! - [`Copilot`]: the facade owning the session

pub mod compiler;
pub mod config;
pub mod copilot;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use compiler::{diagnose, CompileOptions, CompiledArtifact, Compiler, Diagnostics, SolcCompiler};
pub use config::{AgentEntry, CopilotConfig, DEFAULT_CONFIG_FILE};
pub use copilot::{ai_provider, inspect_key, Copilot, KeyInspection};
pub use error::{CompileError, ConfigError, CopilotError, PipelineError, RegistryError, Result};
pub use pipeline::{DeploySettings, DeploymentOutcome, DeploymentPipeline};
pub use registry::{RegistryAction, RegistryAdapter, DEFAULT_REGISTRY_GAS};
