//! Static analysis
//!
//! Regex patterns over Solidity source. Each match becomes a [`Vulnerability`]
//! located by line; matches are also grouped into the category map that
//! downstream consumers read (`reentrancy`, `integer-overflow`,
//! `unchecked-calls`, ...).

use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{AuditError, Result};
use crate::report::{FindingSource, Severity, Vulnerability};

/// Categories always present in the category map, even when empty
pub const BASELINE_CATEGORIES: [&str; 3] = ["reentrancy", "integer-overflow", "unchecked-calls"];

/// A source pattern
#[derive(Clone, Debug)]
pub struct VulnPattern {
    pub id: String,
    pub name: String,
    pub pattern: Regex,
    pub severity: Severity,
    pub category: String,
    pub description: String,
}

impl VulnPattern {
    pub fn new(
        id: &str,
        name: &str,
        pattern: &str,
        severity: Severity,
        category: &str,
        description: &str,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| AuditError::InvalidPattern {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            pattern,
            severity,
            category: category.to_string(),
            description: description.to_string(),
        })
    }
}

/// Built-in vulnerability patterns
pub struct VulnerabilityDatabase {
    patterns: Vec<VulnPattern>,
}

impl VulnerabilityDatabase {
    /// Database with the built-in patterns
    pub fn new() -> Self {
        let builtin: [(&str, &str, &str, Severity, &str, &str); 8] = [
            (
                "REENT-001",
                "Reentrancy Vulnerability",
                r"\.call\{value:[^}]*\}\([^)]*\)[^\n]*\n[^\n]*\w+(\[[^\]]*\])?\s*(-=|=)",
                Severity::Critical,
                "reentrancy",
                "External call before state update may allow reentrancy",
            ),
            (
                "REENT-002",
                "Legacy Value Transfer",
                r"\.call\.value\(",
                Severity::Critical,
                "reentrancy",
                "call.value forwards all gas to the callee",
            ),
            (
                "OVER-001",
                "Potential Integer Overflow",
                r"pragma solidity\s*[\^<>=~]*\s*0\.[0-7]\.",
                Severity::High,
                "integer-overflow",
                "Solidity version < 0.8.0 lacks built-in overflow checks",
            ),
            (
                "UNCHECKED-001",
                "Unchecked Return Value",
                r"(?m)^\s*[\w\.\[\]\(\)]+\.(call|send|delegatecall)(\{[^}]*\})?\([^;]*\)\s*;",
                Severity::Medium,
                "unchecked-calls",
                "Low-level call return value not checked",
            ),
            (
                "TXORIGIN-001",
                "tx.origin Authentication",
                r"tx\.origin",
                Severity::High,
                "access-control",
                "tx.origin used for authorization is vulnerable to phishing",
            ),
            (
                "SECRET-001",
                "Hardcoded Private Key",
                r#"["']0x[a-fA-F0-9]{64}["']"#,
                Severity::Critical,
                "secrets",
                "Potential hardcoded private key detected",
            ),
            (
                "DESTRUCT-001",
                "Selfdestruct Available",
                r"selfdestruct\s*\(",
                Severity::Medium,
                "denial-of-service",
                "Contract can be destroyed, potentially locking funds",
            ),
            (
                "DELEGATECALL-001",
                "Delegatecall Usage",
                r"delegatecall\s*\(",
                Severity::High,
                "access-control",
                "Delegatecall executes foreign code in this contract's storage context",
            ),
        ];

        let mut patterns = Vec::with_capacity(builtin.len());
        for (id, name, re, severity, category, description) in builtin {
            match VulnPattern::new(id, name, re, severity, category, description) {
                Ok(p) => patterns.push(p),
                Err(e) => tracing::error!("built-in pattern rejected: {}", e),
            }
        }
        Self { patterns }
    }

    pub fn patterns(&self) -> &[VulnPattern] {
        &self.patterns
    }
}

impl Default for VulnerabilityDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Remediation advice per category
pub fn remediation(category: &str) -> &'static str {
    match category {
        "reentrancy" => "Use ReentrancyGuard and the checks-effects-interactions pattern",
        "integer-overflow" => "Upgrade to Solidity 0.8+ or use SafeMath",
        "unchecked-calls" => "Check return values of external calls",
        "access-control" => "Authorize with msg.sender and audit delegatecall targets",
        "secrets" => "Remove key material from source and rotate the key",
        "denial-of-service" => "Restrict or remove selfdestruct",
        _ => "Review and address the finding",
    }
}

/// Findings plus the per-category map
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticFindings {
    pub vulnerabilities: Vec<Vulnerability>,
    pub categories: BTreeMap<String, Vec<String>>,
}

/// Regex-driven Solidity analyzer
pub struct StaticAnalyzer {
    database: VulnerabilityDatabase,
    custom_patterns: Vec<VulnPattern>,
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self {
            database: VulnerabilityDatabase::new(),
            custom_patterns: Vec::new(),
        }
    }

    /// Add custom pattern
    pub fn add_pattern(&mut self, pattern: VulnPattern) {
        self.custom_patterns.push(pattern);
    }

    /// Analyze source; deterministic for a given input
    pub fn analyze(&self, source: &str) -> StaticFindings {
        let mut findings = StaticFindings::default();
        for category in BASELINE_CATEGORIES {
            findings.categories.insert(category.to_string(), Vec::new());
        }

        for pattern in self.database.patterns().iter().chain(self.custom_patterns.iter()) {
            for mat in pattern.pattern.find_iter(source) {
                let line = line_of(source, mat.start());
                let location = format!("line {}", line);
                findings
                    .categories
                    .entry(pattern.category.clone())
                    .or_default()
                    .push(format!("{} at {}", pattern.name, location));
                findings.vulnerabilities.push(Vulnerability {
                    name: pattern.name.clone(),
                    description: pattern.description.clone(),
                    severity: pattern.severity,
                    category: pattern.category.clone(),
                    location: Some(location),
                    recommendation: remediation(&pattern.category).to_string(),
                    source: FindingSource::Static,
                });
            }
        }

        tracing::debug!(findings = findings.vulnerabilities.len(), "static analysis complete");
        findings
    }

    /// Findings named in free-form text, e.g. AI commentary
    ///
    /// Every line that mentions a known category keyword yields one finding.
    pub fn findings_in_text(&self, text: &str, source: FindingSource) -> Vec<Vulnerability> {
        const KEYWORDS: [(&str, &str); 7] = [
            ("reentran", "reentrancy"),
            ("overflow", "integer-overflow"),
            ("underflow", "integer-overflow"),
            ("unchecked", "unchecked-calls"),
            ("tx.origin", "access-control"),
            ("selfdestruct", "denial-of-service"),
            ("delegatecall", "access-control"),
        ];

        let mut out = Vec::new();
        for raw in text.lines() {
            let line = raw.trim().trim_start_matches(is_list_marker).trim();
            if line.is_empty() {
                continue;
            }
            let lower = line.to_ascii_lowercase();
            let Some((_, category)) = KEYWORDS.iter().find(|(kw, _)| lower.contains(kw)) else {
                continue;
            };
            let severity = self
                .database
                .patterns()
                .iter()
                .find(|p| p.category == *category)
                .map(|p| p.severity)
                .unwrap_or(Severity::Medium);
            out.push(Vulnerability {
                name: category.to_string(),
                description: line.to_string(),
                severity,
                category: category.to_string(),
                location: None,
                recommendation: remediation(category).to_string(),
                source: source.clone(),
            });
        }
        out
    }
}

impl Default for StaticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Bullet and numbering characters that open a list item
fn is_list_marker(c: char) -> bool {
    matches!(c, '-' | '*' | '#' | '.' | ')') || c.is_ascii_digit()
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
