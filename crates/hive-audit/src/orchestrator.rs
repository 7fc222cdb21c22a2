//! Audit orchestration
//!
//! ```text
//!            ┌──────────────┐   ┌──────────────┐
//! source ──► │ StaticAnaly. │   │  AiProvider  │ ◄── source
//!            └──────┬───────┘   └──────┬───────┘
//!                   └──────┬───────────┘
//!                          ▼
//!                    AuditReport ◄── optional agent collaboration round
//! ```
//!
//! The static and AI passes run concurrently and independently. Their
//! findings are appended side by side; overlapping findings stay separate
//! and severities from different sources are never reconciled.

use hive_agents::{AgentProtocol, AiProvider, CompletionRequest, AUDIT_REQUEST};
use hive_ledger::ContractRecord;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::StaticAnalyzer;
use crate::error::Result;
use crate::report::{AiCommentary, AuditReport, Collaboration, FindingSource, GasAnalysis};

/// Capability collaborating agents must advertise
pub const AUDIT_CAPABILITY: &str = "security_audit";

/// Audit tunables
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditOptions {
    /// Identity recorded as the report's auditor
    pub auditor_id: String,
    /// Capability used for agent discovery
    pub capability: String,
    /// Deadline for an agent's response
    pub response_timeout: Duration,
}

impl AuditOptions {
    pub fn new(auditor_id: impl Into<String>) -> Self {
        Self {
            auditor_id: auditor_id.into(),
            capability: AUDIT_CAPABILITY.to_string(),
            response_timeout: Duration::from_secs(30),
        }
    }
}

/// Combines static analysis, AI commentary and agent reports
pub struct AuditOrchestrator<'a> {
    analyzer: StaticAnalyzer,
    ai: Arc<dyn AiProvider>,
    protocol: Option<AgentProtocol<'a>>,
    options: AuditOptions,
}

impl<'a> AuditOrchestrator<'a> {
    pub fn new(ai: Arc<dyn AiProvider>, options: AuditOptions) -> Self {
        Self {
            analyzer: StaticAnalyzer::new(),
            ai,
            protocol: None,
            options,
        }
    }

    /// Replace the default analyzer
    pub fn with_analyzer(mut self, analyzer: StaticAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Enable the agent collaboration round
    pub fn with_collaboration(mut self, protocol: AgentProtocol<'a>) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Static and AI analysis of `source`
    pub async fn run_audit(&self, source: &str) -> Result<AuditReport> {
        let (findings, completion) = tokio::join!(
            async { self.analyzer.analyze(source) },
            self.ai.complete(CompletionRequest::security_audit(source)),
        );
        let completion = completion?;

        let mut report = AuditReport::new(&self.options.auditor_id);
        report.static_analysis = findings.categories;
        for vulnerability in findings.vulnerabilities {
            report.add_vulnerability(vulnerability);
        }
        for vulnerability in self
            .analyzer
            .findings_in_text(&completion.content, FindingSource::Ai)
        {
            report.add_vulnerability(vulnerability);
        }
        report.ai_analysis = Some(AiCommentary {
            content: completion.content,
            model: completion.model,
            tokens_used: completion.tokens_used,
        });

        tracing::info!(
            findings = report.vulnerabilities.len(),
            severity = %report.severity,
            provider = %self.ai.name(),
            "audit complete"
        );
        Ok(report)
    }

    /// Audit of a deployed contract, with gas figures from its record
    pub async fn audit_deployed(
        &self,
        source: &str,
        record: &ContractRecord,
    ) -> Result<AuditReport> {
        let mut report = self.run_audit(source).await?;
        report.contract_address = Some(record.contract_id.clone());
        report.gas_analysis = Some(GasAnalysis::from_record(record));
        Ok(report)
    }

    /// Audit including a collaboration round about `contract_address`
    pub async fn run_collaborative_audit(
        &self,
        source: &str,
        contract_address: &str,
    ) -> Result<AuditReport> {
        let mut report = self.run_audit(source).await?;
        report.contract_address = Some(contract_address.to_string());
        if let Some(collaboration) = self.collaborate(contract_address).await? {
            report.merge_collaboration(collaboration);
        }
        Ok(report)
    }

    /// One request/response round with the first agent offering the capability
    ///
    /// `None` when collaboration is disabled or no agent is found.
    pub async fn collaborate(&self, contract_address: &str) -> Result<Option<Collaboration>> {
        let Some(protocol) = &self.protocol else {
            return Ok(None);
        };

        let agents = protocol.discover(&self.options.capability).await?;
        let Some(agent_id) = agents.first() else {
            tracing::warn!(
                capability = %self.options.capability,
                "no agents available for collaboration"
            );
            return Ok(None);
        };

        let topic_id = protocol.connect(agent_id).await?;
        let content = json!({
            "operation": AUDIT_REQUEST,
            "contract_address": contract_address,
        });
        let pending = protocol
            .send_request(&topic_id, agent_id, AUDIT_REQUEST, content)
            .await?;
        let response = protocol
            .await_response(&pending, self.options.response_timeout)
            .await?;
        let report = AgentProtocol::parse_report(&response)?;

        tracing::info!(
            agent = %agent_id,
            findings = report.vulnerabilities.len(),
            "collaboration report received"
        );
        Ok(Some(Collaboration {
            agent_id: agent_id.clone(),
            topic_id,
            correlation_id: pending.correlation_id.to_string(),
            report,
        }))
    }
}
