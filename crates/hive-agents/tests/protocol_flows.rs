//! Integration tests for the agent protocol
//!
//! The requesting side runs a real `AgentProtocol` over the memory ledger;
//! the remote side is a `TestAgent` writing responses into the topic.

use hive_agents::{
    AgentMessage, AgentProtocol, ProtocolError, ProtocolOptions, StaticDirectory, AUDIT_REQUEST,
    AUDIT_RESPONSE,
};
use hive_ledger::{LedgerSession, TopicChannel};
use hive_testkit::{ledger_session, TestAgent};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fast_options() -> ProtocolOptions {
    ProtocolOptions {
        poll_interval: Duration::from_millis(10),
        require_signatures: true,
    }
}

fn agent_protocol<'a>(session: &'a LedgerSession, agent: &TestAgent) -> AgentProtocol<'a> {
    let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
    AgentProtocol::new(session, directory).with_options(fast_options())
}

fn audit_content() -> serde_json::Value {
    json!({"operation": "audit_request", "contract_address": "0.0.1234"})
}

mod discovery_tests {
    use super::*;

    #[tokio::test]
    async fn test_discover_and_connect_creates_topic_once() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let directory = Arc::new(StaticDirectory::new(vec![
            agent.descriptor(),
            TestAgent::new("0.0.agent2", &["test_gen"]).descriptor(),
        ]));
        let protocol = AgentProtocol::new(&session, directory);

        let found = protocol.discover("security_audit").await.unwrap();
        assert_eq!(found, vec!["0.0.agent1"]);

        let first = protocol.connect("0.0.agent1").await.unwrap();
        let second = protocol.connect("0.0.agent1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.counts().create_topic, 1);
    }

    #[tokio::test]
    async fn test_connect_reuses_advertised_topic() {
        let (ledger, session) = ledger_session();
        let shared = TopicChannel::new(&session)
            .create_channel("shared")
            .await
            .unwrap();
        let agent =
            TestAgent::new("0.0.agent1", &["security_audit"]).listening_on(&shared.topic_id);
        let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
        let protocol = AgentProtocol::new(&session, directory);

        assert_eq!(protocol.connect("0.0.agent1").await.unwrap(), shared.topic_id);
        assert_eq!(ledger.counts().create_topic, 1);
    }

    #[tokio::test]
    async fn test_connect_unknown_agent() {
        let (_ledger, session) = ledger_session();
        let protocol = AgentProtocol::new(&session, Arc::new(StaticDirectory::default()));

        assert!(matches!(
            protocol.connect("0.0.nobody").await,
            Err(ProtocolError::UnknownAgent(_))
        ));
    }
}

mod response_tests {
    use super::*;

    #[tokio::test]
    async fn test_await_response_times_out_on_silent_channel() {
        let (_ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let protocol = agent_protocol(&session, &agent);

        let topic_id = protocol.connect("0.0.agent1").await.unwrap();
        let pending = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, audit_content())
            .await
            .unwrap();

        let started = Instant::now();
        let err = protocol
            .await_response(&pending, Duration::from_millis(200))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        match err {
            ProtocolError::Timeout { topic_id: t, waited_ms } => {
                assert_eq!(t, topic_id);
                assert!(waited_ms >= 200);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_signed_response_is_accepted() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let protocol = agent_protocol(&session, &agent);

        let topic_id = protocol.connect("0.0.agent1").await.unwrap();
        let pending = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, audit_content())
            .await
            .unwrap();
        assert!(pending.message.signature.is_some());

        let report = json!({
            "vulnerabilities": ["reentrancy"],
            "severity": "high",
            "recommendations": ["Use ReentrancyGuard"]
        });
        let responder = agent.spawn_responder(
            Arc::clone(&ledger),
            topic_id.clone(),
            report,
            Duration::from_millis(20),
        );

        let response = protocol
            .await_response(&pending, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(responder.await.unwrap().is_some());

        assert_eq!(response.sender, "0.0.agent1");
        assert_eq!(response.message_type, AUDIT_RESPONSE);
        assert_eq!(response.correlation_id, Some(pending.correlation_id));

        let parsed = AgentProtocol::parse_report(&response).unwrap();
        assert_eq!(parsed.vulnerabilities, vec!["reentrancy"]);
        assert_eq!(parsed.severity, "high");
    }

    #[tokio::test]
    async fn test_forged_and_foreign_responses_are_skipped() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let protocol = agent_protocol(&session, &agent);

        let topic_id = protocol.connect("0.0.agent1").await.unwrap();
        let pending = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, audit_content())
            .await
            .unwrap();

        // bad signature
        agent.respond_forged(&ledger, &topic_id, json!({"severity": "none"}));
        // right signer, wrong correlation id
        let other_request =
            AgentMessage::request("0.0.1001", "0.0.agent1", &topic_id, AUDIT_REQUEST, json!({}));
        let misdirected = agent.response(&other_request, json!({"severity": "low"}));
        agent.post(&ledger, &topic_id, &misdirected);

        let err = protocol
            .await_response(&pending, Duration::from_millis(150))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { .. }));

        agent.respond(&ledger, &topic_id, json!({"severity": "medium"}));
        let response = protocol
            .await_response(&pending, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.content["severity"], "medium");
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_disambiguated() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let protocol = agent_protocol(&session, &agent);
        let topic_id = protocol.connect("0.0.agent1").await.unwrap();

        let first = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, json!({"n": 1}))
            .await
            .unwrap();
        let second = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, json!({"n": 2}))
            .await
            .unwrap();

        // answer the second request before the first
        let answer_second = agent.response(&second.message, json!({"answer": 2}));
        let answer_first = agent.response(&first.message, json!({"answer": 1}));
        agent.post(&ledger, &topic_id, &answer_second);
        agent.post(&ledger, &topic_id, &answer_first);

        let to_first = protocol
            .await_response(&first, Duration::from_secs(1))
            .await
            .unwrap();
        let to_second = protocol
            .await_response(&second, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(to_first.content["answer"], 1);
        assert_eq!(to_second.content["answer"], 2);
    }

    #[tokio::test]
    async fn test_replayed_response_is_skipped() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let protocol = agent_protocol(&session, &agent);
        let topic_id = protocol.connect("0.0.agent1").await.unwrap();

        let first = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, json!({"contract": "0.0.A"}))
            .await
            .unwrap();
        let second = protocol
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, json!({"contract": "0.0.B"}))
            .await
            .unwrap();

        let genuine = agent.response(&first.message, json!({"about": "0.0.A", "severity": "none"}));
        agent.post(&ledger, &topic_id, &genuine);

        // same signature, re-pointed at the second request
        let mut replayed = genuine.clone();
        replayed.correlation_id = Some(second.correlation_id);
        agent.post(&ledger, &topic_id, &replayed);

        let err = protocol
            .await_response(&second, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { .. }));

        let to_first = protocol
            .await_response(&first, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(to_first.content["about"], "0.0.A");
    }

    #[tokio::test]
    async fn test_unsigned_responses_follow_policy() {
        let (ledger, session) = ledger_session();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]);
        let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
        let relaxed = AgentProtocol::new(&session, directory).with_options(ProtocolOptions {
            poll_interval: Duration::from_millis(10),
            require_signatures: false,
        });
        let topic_id = relaxed.connect("0.0.agent1").await.unwrap();
        let pending = relaxed
            .send_request(&topic_id, "0.0.agent1", AUDIT_REQUEST, audit_content())
            .await
            .unwrap();

        let unsigned =
            AgentMessage::response_to(&pending.message, "0.0.agent1", json!({"ok": true}));
        agent.post(&ledger, &topic_id, &unsigned);

        let response = relaxed
            .await_response(&pending, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.signature, None);
    }
}
