//! Solidity compilation
//!
//! The compiler is an external collaborator behind the [`Compiler`] trait.
//! [`SolcCompiler`] runs `solc --combined-json abi,bin` on the source fed
//! through stdin. Cheap source diagnostics run first so obviously broken
//! input never reaches the compiler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::CompilerSettings;
use crate::error::CompileError;

/// Compilation options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Contract to select when the source declares several
    pub contract_name: Option<String>,
    pub optimize: bool,
    pub optimizer_runs: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            contract_name: None,
            optimize: true,
            optimizer_runs: 200,
        }
    }
}

impl CompileOptions {
    pub fn named(mut self, contract_name: impl Into<String>) -> Self {
        self.contract_name = Some(contract_name.into());
        self
    }
}

/// Output of a successful compilation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    pub contract_name: String,
    #[serde(with = "hex_bytes")]
    pub bytecode: Vec<u8>,
    /// JSON array of ABI descriptors
    pub abi: Value,
    pub warnings: Vec<String>,
}

/// Errors and warnings found without compiling
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Source checks applied before compilation
pub fn diagnose(source: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();

    if source.trim().is_empty() {
        diagnostics.errors.push("Empty contract code provided".to_string());
    }
    if !source.contains("pragma solidity") {
        diagnostics.warnings.push("No pragma solidity directive found".to_string());
    }
    if !["contract", "interface", "library"].iter().any(|kw| source.contains(kw)) {
        diagnostics
            .errors
            .push("No contract, interface, or library declaration found".to_string());
    }
    if source.matches('{').count() != source.matches('}').count() {
        diagnostics.errors.push("Mismatched braces in contract code".to_string());
    }

    diagnostics
}

/// Turns Solidity source into deployable bytecode
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError>;

    /// Compiler name for logging
    fn name(&self) -> &str;
}

/// `solc` executable
pub struct SolcCompiler {
    path: String,
}

impl SolcCompiler {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &CompilerSettings) -> Self {
        Self::new(settings.solc_path.clone())
    }

    fn args(options: &CompileOptions) -> Vec<String> {
        let mut args = vec!["--combined-json".to_string(), "abi,bin".to_string()];
        if options.optimize {
            args.push("--optimize".to_string());
            args.push("--optimize-runs".to_string());
            args.push(options.optimizer_runs.to_string());
        }
        args.push("-".to_string());
        args
    }
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

#[async_trait]
impl Compiler for SolcCompiler {
    async fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        let diagnostics = diagnose(source);
        if !diagnostics.is_ok() {
            return Err(CompileError::Rejected {
                errors: diagnostics.errors,
                warnings: diagnostics.warnings,
            });
        }

        tracing::debug!(
            solc = %self.path,
            optimize = options.optimize,
            runs = options.optimizer_runs,
            "compiling"
        );

        let mut child = Command::new(&self.path)
            .args(Self::args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(CompileError::Solc {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut artifact = parse_combined_json(&stdout, options.contract_name.as_deref())?;
        artifact.warnings = diagnostics.warnings;
        artifact.warnings.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .filter(|l| l.starts_with("Warning"))
                .map(str::to_string),
        );

        tracing::info!(
            contract = %artifact.contract_name,
            bytes = artifact.bytecode.len(),
            warnings = artifact.warnings.len(),
            "compiled"
        );
        Ok(artifact)
    }

    fn name(&self) -> &str {
        "solc"
    }
}

/// Select one contract from `solc --combined-json abi,bin` output
///
/// With a name, the contract whose key ends in `:<name>` is chosen.
/// Otherwise the one with the largest bytecode wins, so interfaces and
/// libraries declared alongside the main contract are skipped.
pub fn parse_combined_json(
    output: &str,
    contract_name: Option<&str>,
) -> Result<CompiledArtifact, CompileError> {
    let parsed: Value =
        serde_json::from_str(output).map_err(|e| CompileError::Output(e.to_string()))?;
    let contracts = parsed
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| CompileError::Output("no 'contracts' object".to_string()))?;

    let (key, entry) = match contract_name {
        Some(name) => contracts
            .iter()
            .find(|(key, _)| short_name(key.as_str()) == name)
            .ok_or_else(|| CompileError::ContractNotFound(name.to_string()))?,
        None => contracts
            .iter()
            .max_by_key(|(_, entry)| bin_len(entry))
            .ok_or_else(|| CompileError::ContractNotFound("<any>".to_string()))?,
    };

    let bin = entry.get("bin").and_then(Value::as_str).unwrap_or_default();
    if bin.is_empty() {
        return Err(CompileError::Output(format!("{} has no bytecode", key)));
    }
    let bytecode = hex::decode(bin.trim_start_matches("0x"))
        .map_err(|e| CompileError::Output(e.to_string()))?;

    // Older solc releases emit the ABI as a JSON string
    let abi = match entry.get("abi") {
        Some(Value::String(s)) => {
            serde_json::from_str(s).map_err(|e| CompileError::Output(e.to_string()))?
        }
        Some(abi @ Value::Array(_)) => abi.clone(),
        _ => Value::Array(Vec::new()),
    };

    Ok(CompiledArtifact {
        contract_name: short_name(key.as_str()),
        bytecode,
        abi,
        warnings: Vec::new(),
    })
}

fn short_name(key: &str) -> String {
    key.rsplit(':').next().unwrap_or(key).to_string()
}

fn bin_len(entry: &Value) -> usize {
    entry.get("bin").and_then(Value::as_str).map(str::len).unwrap_or(0)
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
