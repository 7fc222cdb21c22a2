//! Audit report model

use chrono::{DateTime, Utc};
use hive_agents::AgentReport;
use hive_ledger::ContractRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a free-form label such as `"High"` or `"critical"`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "info" | "informational" | "none" => Some(Severity::Info),
            "low" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Where a finding came from
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "agentId")]
pub enum FindingSource {
    Static,
    Ai,
    Agent(String),
}

/// A single finding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Category key, e.g. `reentrancy`
    pub category: String,
    /// `line N` for static findings
    pub location: Option<String>,
    pub recommendation: String,
    pub source: FindingSource,
}

/// Deployment cost figures for an audited contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasAnalysis {
    pub deployment_gas_used: u64,
    pub bytecode_bytes: usize,
}

impl GasAnalysis {
    pub fn from_record(record: &ContractRecord) -> Self {
        Self {
            deployment_gas_used: record.gas_used,
            bytecode_bytes: record.bytecode.len(),
        }
    }
}

/// Raw AI commentary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCommentary {
    pub content: String,
    pub model: String,
    pub tokens_used: u32,
}

/// Outcome of a collaboration round with one agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaboration {
    pub agent_id: String,
    pub topic_id: String,
    pub correlation_id: String,
    pub report: AgentReport,
}

/// Combined audit result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub contract_address: Option<String>,
    pub auditor_id: String,
    pub timestamp: DateTime<Utc>,
    /// Findings from every source, never deduplicated
    pub vulnerabilities: Vec<Vulnerability>,
    /// Highest finding severity
    pub severity: Severity,
    /// First-seen order, exact duplicates dropped
    pub recommendations: Vec<String>,
    pub gas_analysis: Option<GasAnalysis>,
    /// Static findings keyed by category
    pub static_analysis: BTreeMap<String, Vec<String>>,
    pub ai_analysis: Option<AiCommentary>,
    pub collaboration: Option<Collaboration>,
}

impl AuditReport {
    pub fn new(auditor_id: impl Into<String>) -> Self {
        Self {
            contract_address: None,
            auditor_id: auditor_id.into(),
            timestamp: Utc::now(),
            vulnerabilities: Vec::new(),
            severity: Severity::Info,
            recommendations: Vec::new(),
            gas_analysis: None,
            static_analysis: BTreeMap::new(),
            ai_analysis: None,
            collaboration: None,
        }
    }

    /// Record a finding and its recommendation
    pub fn add_vulnerability(&mut self, vulnerability: Vulnerability) {
        self.severity = self.severity.max(vulnerability.severity);
        if !vulnerability.recommendation.is_empty() {
            self.add_recommendation(&vulnerability.recommendation);
        }
        self.vulnerabilities.push(vulnerability);
    }

    pub fn add_recommendation(&mut self, recommendation: &str) {
        if !self.recommendations.iter().any(|r| r == recommendation) {
            self.recommendations.push(recommendation.to_string());
        }
    }

    /// Fold an agent's report in as agent-sourced findings
    pub fn merge_collaboration(&mut self, collaboration: Collaboration) {
        let severity =
            Severity::from_label(&collaboration.report.severity).unwrap_or(Severity::Medium);
        for name in &collaboration.report.vulnerabilities {
            self.add_vulnerability(Vulnerability {
                name: name.clone(),
                description: format!("Reported by agent {}", collaboration.agent_id),
                severity,
                category: name.to_ascii_lowercase(),
                location: None,
                recommendation: String::new(),
                source: FindingSource::Agent(collaboration.agent_id.clone()),
            });
        }
        for recommendation in &collaboration.report.recommendations {
            self.add_recommendation(recommendation);
        }
        self.collaboration = Some(collaboration);
    }

    /// Findings from one source
    pub fn from_source<'a>(
        &'a self,
        source: &'a FindingSource,
    ) -> impl Iterator<Item = &'a Vulnerability> {
        self.vulnerabilities.iter().filter(move |v| &v.source == source)
    }

    /// Count of findings at a severity
    pub fn count(&self, severity: Severity) -> usize {
        self.vulnerabilities.iter().filter(|v| v.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(
        name: &str,
        severity: Severity,
        recommendation: &str,
        source: FindingSource,
    ) -> Vulnerability {
        Vulnerability {
            name: name.to_string(),
            description: String::new(),
            severity,
            category: name.to_string(),
            location: None,
            recommendation: recommendation.to_string(),
            source,
        }
    }

    #[test]
    fn test_severity_ordering_and_labels() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::from_label(" High "), Some(Severity::High));
        assert_eq!(Severity::from_label("unknown"), None);
    }

    #[test]
    fn test_empty_report_is_info() {
        let report = AuditReport::new("0.0.1001");
        assert_eq!(report.severity, Severity::Info);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_findings_kept_recommendations_deduplicated() {
        let mut report = AuditReport::new("0.0.1001");
        let (guard, sender) = ("Use ReentrancyGuard", "Use msg.sender");
        let (static_source, ai_source) = (FindingSource::Static, FindingSource::Ai);
        report.add_vulnerability(finding("reentrancy", Severity::Critical, guard, static_source));
        report.add_vulnerability(finding("reentrancy", Severity::High, guard, ai_source.clone()));
        report.add_vulnerability(finding("tx-origin", Severity::Low, sender, ai_source));

        assert_eq!(report.vulnerabilities.len(), 3);
        assert_eq!(report.recommendations, vec!["Use ReentrancyGuard", "Use msg.sender"]);
        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.from_source(&FindingSource::Ai).count(), 2);
    }

    #[test]
    fn test_merge_collaboration() {
        let mut report = AuditReport::new("0.0.1001");
        report.merge_collaboration(Collaboration {
            agent_id: "0.0.agent1".into(),
            topic_id: "0.0.7".into(),
            correlation_id: "c".into(),
            report: AgentReport {
                vulnerabilities: vec!["reentrancy".into(), "unchecked-calls".into()],
                severity: "high".into(),
                recommendations: vec!["Implement checks-effects-interactions pattern".into()],
            },
        });

        assert_eq!(report.count(Severity::High), 2);
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.recommendations.len(), 1);
        let agent = FindingSource::Agent("0.0.agent1".into());
        assert_eq!(report.from_source(&agent).count(), 2);
        assert!(report.collaboration.is_some());
    }

    #[test]
    fn test_source_serialization() {
        let value = serde_json::to_value(FindingSource::Agent("0.0.9".into())).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "agent", "agentId": "0.0.9"}));
        let value = serde_json::to_value(FindingSource::Static).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "static"}));
    }
}
