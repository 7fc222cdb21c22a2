//! # HiveMind Audit
//!
//! Security audits of Solidity contracts from three independent sources:
//!
//! - **Static analysis**: regex patterns with line locations ([`StaticAnalyzer`])
//! - **AI commentary**: the language-model collaborator ([`hive_agents::AiProvider`])
//! - **Agent collaboration**: an optional request/response round with a
//!   discovered auditing agent over a ledger topic
//!
//! [`AuditOrchestrator`] runs them and merges the results into one
//! [`AuditReport`] without deduplicating findings.

pub mod analyzer;
pub mod error;
pub mod orchestrator;
pub mod report;

pub use analyzer::{remediation, StaticAnalyzer, StaticFindings, VulnPattern, VulnerabilityDatabase};
pub use error::{AuditError, Result};
pub use orchestrator::{AuditOptions, AuditOrchestrator, AUDIT_CAPABILITY};
pub use report::{
    AiCommentary, AuditReport, Collaboration, FindingSource, GasAnalysis, Severity, Vulnerability,
};
