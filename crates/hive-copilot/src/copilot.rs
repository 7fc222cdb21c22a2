//! The copilot facade
//!
//! Owns one authenticated [`LedgerSession`] and lends it to every component
//! for the duration of a call. Nothing here is global: two copilots built
//! from different configurations never share state.

use hive_agents::{
    AgentDirectory, AgentMessage, AgentProtocol, AiProvider, ChatCompletionsProvider,
    CompletionResponse, ProtocolOptions,
};
use hive_audit::{AuditOptions, AuditOrchestrator, AuditReport};
use hive_crypto::KeyScheme;
use hive_ledger::{
    ContractRecord, CredentialResolver, LedgerConnector, LedgerSession, Received, SubmitAck, Topic,
    TopicChannel,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::compiler::{Compiler, SolcCompiler};
use crate::config::CopilotConfig;
use crate::error::{ConfigError, Result};
use crate::pipeline::{DeploySettings, DeploymentOutcome, DeploymentPipeline};
use crate::registry::RegistryAdapter;

/// Operator identity derived from configuration, without the key itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInspection {
    pub account_id: String,
    pub network: String,
    pub scheme: KeyScheme,
    pub public_key: String,
}

/// Parse the configured operator key without contacting the network
pub fn inspect_key(
    config: &CopilotConfig,
    connector: Arc<dyn LedgerConnector>,
) -> Result<KeyInspection> {
    let (account_id, private_key) = config.ledger.operator()?;
    let resolver = CredentialResolver::new(connector).with_scheme(config.ledger.scheme()?);
    let (credentials, profile) =
        resolver.resolve_credentials(account_id, private_key, &config.ledger.network)?;
    Ok(KeyInspection {
        account_id: credentials.account_id().to_string(),
        network: profile.network.to_string(),
        scheme: credentials.scheme(),
        public_key: credentials.public_key().to_hex(),
    })
}

/// Chat completions provider built from the `ai` section
///
/// Audits run on `debug_model`; generation requests name `codex_model` per call.
pub fn ai_provider(config: &CopilotConfig) -> Result<ChatCompletionsProvider> {
    Ok(ChatCompletionsProvider::new(
        &config.ai.endpoint,
        config.ai.api_key.as_deref().unwrap_or_default(),
        &config.ai.debug_model,
        Duration::from_secs(config.ai.timeout_secs),
    )?)
}

/// Ledger, AI and agent operations behind one configured session
pub struct Copilot {
    config: CopilotConfig,
    session: LedgerSession,
    ai: Arc<dyn AiProvider>,
    compiler: Arc<dyn Compiler>,
    directory: Arc<dyn AgentDirectory>,
}

impl Copilot {
    /// Resolve credentials and open a session
    pub async fn connect(
        config: CopilotConfig,
        connector: Arc<dyn LedgerConnector>,
    ) -> Result<Self> {
        let (account_id, private_key) = config.ledger.operator()?;
        let resolver = CredentialResolver::new(connector)
            .with_scheme(config.ledger.scheme()?)
            .with_endpoints(config.ledger.endpoints.clone(), config.ledger.mirror_endpoints.clone())
            .with_receipt_timing(
                config.ledger.receipt_timeout(),
                config.ledger.receipt_poll_interval(),
            );
        let session = resolver
            .resolve(account_id, private_key, &config.ledger.network)
            .await?;
        Self::with_session(config, session)
    }

    /// Wrap an already open session
    pub fn with_session(config: CopilotConfig, session: LedgerSession) -> Result<Self> {
        let ai = ai_provider(&config)?;
        let compiler = SolcCompiler::from_settings(&config.compiler);
        let directory = config.agents.directory()?;
        Ok(Self {
            session,
            ai: Arc::new(ai),
            compiler: Arc::new(compiler),
            directory: Arc::new(directory),
            config,
        })
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiProvider>) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn AgentDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    pub fn session(&self) -> &LedgerSession {
        &self.session
    }

    /// Deployment settings seeded from configuration
    pub fn deploy_settings(&self) -> DeploySettings {
        let mut settings = DeploySettings::default();
        settings.compile.optimize = self.config.compiler.optimize;
        settings.compile.optimizer_runs = self.config.compiler.optimizer_runs;
        settings
    }

    /// Compile, upload and deploy `source`
    pub async fn deploy(
        &self,
        source: &str,
        settings: DeploySettings,
    ) -> Result<DeploymentOutcome> {
        let outcome = DeploymentPipeline::new(&self.session, Arc::clone(&self.compiler))
            .with_chunk_size(self.config.ledger.chunk_size)
            .deploy(source, settings)
            .await?;
        Ok(outcome)
    }

    /// Static and AI audit; with `collaborate_on`, also a round with an auditing agent
    pub async fn audit(&self, source: &str, collaborate_on: Option<&str>) -> Result<AuditReport> {
        let orchestrator = self.orchestrator();
        let report = match collaborate_on {
            Some(contract_address) => {
                orchestrator
                    .with_collaboration(self.protocol())
                    .run_collaborative_audit(source, contract_address)
                    .await?
            }
            None => orchestrator.run_audit(source).await?,
        };
        Ok(report)
    }

    /// Audit of a contract this copilot deployed
    pub async fn audit_deployed(
        &self,
        source: &str,
        record: &ContractRecord,
    ) -> Result<AuditReport> {
        Ok(self.orchestrator().audit_deployed(source, record).await?)
    }

    /// Generate `language` source from a description with the code model
    pub async fn generate_code(
        &self,
        description: &str,
        language: &str,
    ) -> Result<CompletionResponse> {
        let response = self
            .ai
            .generate_code(&self.config.ai.codex_model, description, language)
            .await?;
        tracing::info!(model = %response.model, tokens = response.tokens_used, "code generated");
        Ok(response)
    }

    /// Generate tests for `source` with the code model
    pub async fn generate_tests(&self, source: &str, language: &str) -> Result<CompletionResponse> {
        let response = self
            .ai
            .generate_tests(&self.config.ai.codex_model, source, language)
            .await?;
        tracing::info!(model = %response.model, tokens = response.tokens_used, "tests generated");
        Ok(response)
    }

    /// Create a topic gated by the operator key
    pub async fn create_topic(&self, memo: &str) -> Result<Topic> {
        Ok(TopicChannel::new(&self.session).create_channel(memo).await?)
    }

    /// Send a signed agent message
    pub async fn send_message(
        &self,
        topic_id: &str,
        recipient: &str,
        message_type: &str,
        content: Value,
    ) -> Result<(SubmitAck, AgentMessage)> {
        let sender = self.session.account_id();
        let message = AgentMessage::request(sender, recipient, topic_id, message_type, content);
        Ok(TopicChannel::new(&self.session).send(topic_id, message, true).await?)
    }

    /// Agent messages after `after_sequence`, in topic order
    pub async fn read_messages(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<Received<AgentMessage>>> {
        Ok(TopicChannel::new(&self.session)
            .messages(topic_id, after_sequence)
            .await?)
    }

    /// Registry action; `registry_id` falls back to the configured registry
    pub async fn registry(
        &self,
        registry_id: Option<&str>,
        action: &str,
        contract_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<Value> {
        let registry_id = registry_id
            .or(self.config.registry.contract_id.as_deref())
            .ok_or(ConfigError::Missing("registry.contract_id"))?;
        let result = RegistryAdapter::new(&self.session)
            .with_gas(self.config.registry.gas)
            .interact(registry_id, action, contract_id, metadata)
            .await?;
        Ok(result)
    }

    fn orchestrator(&self) -> AuditOrchestrator<'_> {
        let options = AuditOptions {
            capability: self.config.agents.capability.clone(),
            response_timeout: Duration::from_secs(self.config.agents.response_timeout_secs),
            ..AuditOptions::new(self.session.account_id())
        };
        AuditOrchestrator::new(Arc::clone(&self.ai), options)
    }

    fn protocol(&self) -> AgentProtocol<'_> {
        let options = ProtocolOptions {
            poll_interval: Duration::from_millis(self.config.agents.poll_interval_ms),
            require_signatures: self.config.agents.require_signatures,
        };
        AgentProtocol::new(&self.session, Arc::clone(&self.directory)).with_options(options)
    }
}
