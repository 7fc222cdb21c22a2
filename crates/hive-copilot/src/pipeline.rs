//! Compile → upload → deploy
//!
//! Each stage's error surfaces unchanged: a partial upload still carries its
//! file id and a failed creation still names the uploaded file.

use hive_ledger::{
    ArtifactUploader, ContractDeployer, ContractParams, ContractRecord, DeployRequest, LedgerFile,
    LedgerSession,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::compiler::{CompileOptions, Compiler};
use crate::error::PipelineError;

/// Result of a full deployment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutcome {
    pub record: ContractRecord,
    pub file: LedgerFile,
    /// Compiler warnings
    pub warnings: Vec<String>,
}

/// Deployment parameters besides the source
#[derive(Clone, Debug, PartialEq)]
pub struct DeploySettings {
    pub compile: CompileOptions,
    pub constructor_params: ContractParams,
    pub gas: u64,
    pub initial_balance: u64,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            compile: CompileOptions::default(),
            constructor_params: ContractParams::new(),
            gas: hive_ledger::DEFAULT_GAS_LIMIT,
            initial_balance: 0,
        }
    }
}

/// Runs the three deployment stages against one session
pub struct DeploymentPipeline<'a> {
    session: &'a LedgerSession,
    compiler: Arc<dyn Compiler>,
    chunk_size: Option<usize>,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(session: &'a LedgerSession, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            session,
            compiler,
            chunk_size: None,
        }
    }

    /// Upload with a chunk size below the network maximum
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub async fn deploy(
        &self,
        source: &str,
        settings: DeploySettings,
    ) -> Result<DeploymentOutcome, PipelineError> {
        let artifact = self.compiler.compile(source, &settings.compile).await?;
        tracing::info!(
            compiler = %self.compiler.name(),
            contract = %artifact.contract_name,
            bytes = artifact.bytecode.len(),
            "deploying"
        );

        let mut uploader = ArtifactUploader::new(self.session);
        if let Some(chunk_size) = self.chunk_size {
            uploader = uploader.with_chunk_size(chunk_size);
        }
        let file = uploader.upload(&artifact.bytecode).await?;

        let request = DeployRequest::new(artifact.bytecode, artifact.abi)
            .with_params(settings.constructor_params)
            .with_gas(settings.gas)
            .with_initial_balance(settings.initial_balance);
        let record = ContractDeployer::new(self.session).deploy(&file, request).await?;

        tracing::info!(
            contract_id = %record.contract_id,
            file_id = %file.file_id,
            gas_used = record.gas_used,
            "contract deployed"
        );
        Ok(DeploymentOutcome {
            record,
            file,
            warnings: artifact.warnings,
        })
    }
}
