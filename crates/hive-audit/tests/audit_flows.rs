//! Integration tests for audit orchestration

use hive_agents::{AgentProtocol, AiError, ProtocolError, ProtocolOptions, StaticDirectory};
use hive_audit::{AuditError, AuditOptions, AuditOrchestrator, FindingSource, Severity};
use hive_ledger::{ContractParams, ContractRecord};
use hive_testkit::{ledger_session, ScriptedAiProvider, TestAgent, TEST_ACCOUNT};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SOURCE: &str = r#"pragma solidity ^0.7.6;

contract Vault {
    mapping(address => uint) balances;

    function withdraw(uint amount) public {
        (bool ok, ) = msg.sender.call{value: amount}("");
        balances[msg.sender] -= amount;
    }
}
"#;

const AI_REPLY: &str = "Findings:
1. Reentrancy in withdraw: state is updated after the external call
2. Integer overflow possible on balances before 0.8";

fn options() -> AuditOptions {
    AuditOptions {
        response_timeout: Duration::from_secs(2),
        ..AuditOptions::new(TEST_ACCOUNT)
    }
}

fn quiet_ai() -> Arc<ScriptedAiProvider> {
    Arc::new(ScriptedAiProvider::answering("ok"))
}

fn fast_protocol_options() -> ProtocolOptions {
    ProtocolOptions {
        poll_interval: Duration::from_millis(10),
        require_signatures: true,
    }
}

mod audit_tests {
    use super::*;

    #[tokio::test]
    async fn test_static_and_ai_findings_are_kept_separately() {
        let ai = Arc::new(ScriptedAiProvider::answering(AI_REPLY));
        let orchestrator = AuditOrchestrator::new(ai.clone(), options());

        let report = orchestrator.run_audit(SOURCE).await.unwrap();

        assert_eq!(ai.calls(), 1);
        assert!(ai.prompts()[0].messages[0]
            .content
            .starts_with("Analyze Solidity security vulnerabilities:\n"));

        let static_reentrancy = report
            .from_source(&FindingSource::Static)
            .filter(|v| v.category == "reentrancy")
            .count();
        let ai_reentrancy = report
            .from_source(&FindingSource::Ai)
            .filter(|v| v.category == "reentrancy")
            .count();
        assert_eq!(static_reentrancy, 1);
        assert_eq!(ai_reentrancy, 1);

        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.static_analysis["integer-overflow"].len(), 1);
        assert!(report.static_analysis["unchecked-calls"].is_empty());
        let commentary = report.ai_analysis.as_ref().unwrap();
        assert_eq!(commentary.content, AI_REPLY);
        assert!(commentary.tokens_used > 0);

        let unique: std::collections::HashSet<&String> = report.recommendations.iter().collect();
        assert_eq!(unique.len(), report.recommendations.len());
        assert!(report.collaboration.is_none());
    }

    #[tokio::test]
    async fn test_ai_failure_fails_the_audit() {
        let ai = Arc::new(ScriptedAiProvider::failing(AiError::Status {
            status: 503,
            body: "overloaded".into(),
        }));
        let orchestrator = AuditOrchestrator::new(ai, options());

        let err = orchestrator.run_audit(SOURCE).await.unwrap_err();
        assert!(matches!(err, AuditError::Ai(AiError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_deployed_audit_carries_gas_analysis() {
        let orchestrator = AuditOrchestrator::new(quiet_ai(), options());
        let record = ContractRecord {
            contract_id: "0.0.5005".into(),
            file_id: "0.0.5004".into(),
            bytecode: vec![0x60; 1234],
            abi: json!([]),
            constructor_args: ContractParams::new(),
            deployer: TEST_ACCOUNT.into(),
            gas_used: 62_340,
            transaction_id: format!("{}@1.000000001", TEST_ACCOUNT),
        };

        let report = orchestrator.audit_deployed(SOURCE, &record).await.unwrap();

        assert_eq!(report.contract_address.as_deref(), Some("0.0.5005"));
        let gas = report.gas_analysis.unwrap();
        assert_eq!(gas.deployment_gas_used, 62_340);
        assert_eq!(gas.bytecode_bytes, 1234);
    }
}

mod collaboration_tests {
    use super::*;

    #[tokio::test]
    async fn test_agent_report_is_merged() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
        let protocol =
            AgentProtocol::new(&session, directory).with_options(fast_protocol_options());
        let topic_id = protocol.connect("0.0.agent1").await.unwrap();

        let responder = agent.spawn_responder(
            Arc::clone(&ledger),
            topic_id.clone(),
            json!({
                "vulnerabilities": ["reentrancy", "unchecked-calls"],
                "severity": "high",
                "recommendations": ["Implement checks-effects-interactions pattern"]
            }),
            Duration::from_millis(10),
        );

        let orchestrator =
            AuditOrchestrator::new(quiet_ai(), options()).with_collaboration(protocol);
        let report = orchestrator
            .run_collaborative_audit(SOURCE, "0.0.1234")
            .await
            .unwrap();
        assert!(responder.await.unwrap().is_some());

        let collaboration = report.collaboration.as_ref().unwrap();
        assert_eq!(collaboration.agent_id, "0.0.agent1");
        assert_eq!(collaboration.topic_id, topic_id);

        let agent_source = FindingSource::Agent("0.0.agent1".into());
        assert_eq!(report.from_source(&agent_source).count(), 2);
        assert!(report
            .recommendations
            .contains(&"Implement checks-effects-interactions pattern".to_string()));
        assert_eq!(report.contract_address.as_deref(), Some("0.0.1234"));
    }

    #[tokio::test]
    async fn test_no_agents_means_no_collaboration() {
        let (ledger, session) = ledger_session();
        let directory = Arc::new(StaticDirectory::new(vec![
            TestAgent::new("0.0.agent2", &["test_gen"]).descriptor(),
        ]));
        let protocol = AgentProtocol::new(&session, directory);
        let orchestrator =
            AuditOrchestrator::new(quiet_ai(), options()).with_collaboration(protocol);

        let report = orchestrator
            .run_collaborative_audit(SOURCE, "0.0.1234")
            .await
            .unwrap();

        assert!(report.collaboration.is_none());
        assert_eq!(ledger.counts().writes(), 0);
    }

    #[tokio::test]
    async fn test_silent_agent_times_out() {
        let (_ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
        let protocol =
            AgentProtocol::new(&session, directory).with_options(fast_protocol_options());
        let orchestrator = AuditOrchestrator::new(
            quiet_ai(),
            AuditOptions {
                response_timeout: Duration::from_millis(100),
                ..AuditOptions::new(TEST_ACCOUNT)
            },
        )
        .with_collaboration(protocol);

        let err = orchestrator
            .run_collaborative_audit(SOURCE, "0.0.1234")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::Collaboration(ProtocolError::Timeout { .. })
        ));
    }
}
