//! Integration tests for the copilot facade
//!
//! The ledger is the in-process one from `hive-testkit`; compilation is
//! replaced by a fixed-output compiler so no `solc` binary is needed.

use async_trait::async_trait;
use hive_agents::{AiError, AiProvider, StaticDirectory};
use hive_copilot::{
    diagnose, inspect_key, CompileError, CompileOptions, CompiledArtifact, Compiler, ConfigError,
    Copilot, CopilotConfig, CopilotError, DeploySettings, PipelineError, RegistryError,
};
use hive_crypto::KeyScheme;
use hive_ledger::{DeployFailure, LedgerError, ParamValue, Stage, Status, Uint256, UploadError};
use hive_testkit::{
    test_key, test_key_hex, FailureKind, MemoryLedger, RegistryContract, ScriptedAiProvider,
    TestAgent, TEST_ACCOUNT,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SOURCE: &str = r#"pragma solidity ^0.8.0;

contract Token {
    uint256 public supply;

    constructor(uint256 initialSupply) {
        supply = initialSupply;
    }
}
"#;

/// Compiler returning the same bytecode for every accepted source
struct FixedCompiler {
    bytecode: Vec<u8>,
    calls: AtomicUsize,
}

impl FixedCompiler {
    fn with_len(len: usize) -> Arc<Self> {
        Arc::new(Self {
            bytecode: (0..len).map(|i| (i % 251) as u8).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for FixedCompiler {
    async fn compile(
        &self,
        source: &str,
        _options: &CompileOptions,
    ) -> Result<CompiledArtifact, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let diagnostics = diagnose(source);
        if !diagnostics.is_ok() {
            return Err(CompileError::Rejected {
                errors: diagnostics.errors,
                warnings: diagnostics.warnings,
            });
        }
        Ok(CompiledArtifact {
            contract_name: "Token".to_string(),
            bytecode: self.bytecode.clone(),
            abi: json!([{
                "type": "constructor",
                "inputs": [{"name": "initialSupply", "type": "uint256"}]
            }]),
            warnings: diagnostics.warnings,
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn config() -> CopilotConfig {
    let mut config = CopilotConfig::default();
    config.ledger.account_id = Some(TEST_ACCOUNT.to_string());
    config.ledger.private_key = Some(test_key_hex("operator"));
    config.ledger.receipt_timeout_secs = 2;
    config.ledger.receipt_poll_ms = 5;
    config.agents.poll_interval_ms = 10;
    config.agents.response_timeout_secs = 2;
    config
}

fn copilot(ledger: &Arc<MemoryLedger>) -> Copilot {
    let session = ledger.session(TEST_ACCOUNT, test_key(KeyScheme::Ed25519, "operator"));
    Copilot::with_session(config(), session).unwrap()
}

mod connect_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_opens_one_session() {
        let ledger = MemoryLedger::new();
        let copilot = Copilot::connect(config(), ledger.connector()).await.unwrap();

        assert_eq!(copilot.session().account_id(), TEST_ACCOUNT);
        assert_eq!(ledger.counts().connect, 1);
        assert_eq!(ledger.counts().writes(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_call() {
        let ledger = MemoryLedger::new();
        let mut config = config();
        config.ledger.private_key = None;

        let result = Copilot::connect(config, ledger.connector()).await;

        assert!(matches!(
            result,
            Err(CopilotError::Config(ConfigError::Missing("ledger.private_key")))
        ));
        assert_eq!(ledger.counts().total(), 0);
    }

    #[tokio::test]
    async fn test_pinned_scheme_is_honoured() {
        let ledger = MemoryLedger::new();
        let mut config = config();
        config.ledger.key_scheme = Some("ecdsa".to_string());

        let copilot = Copilot::connect(config, ledger.connector()).await.unwrap();
        assert_eq!(copilot.session().credentials().scheme(), KeyScheme::Ecdsa);
    }

    #[test]
    fn test_inspect_key_never_connects() {
        let ledger = MemoryLedger::new();
        let inspection = inspect_key(&config(), ledger.connector()).unwrap();

        assert_eq!(inspection.account_id, TEST_ACCOUNT);
        assert_eq!(inspection.network, "testnet");
        assert_eq!(inspection.scheme, KeyScheme::Ed25519);
        assert_eq!(
            inspection.public_key,
            test_key(KeyScheme::Ed25519, "operator").public_key().to_hex()
        );
        assert_eq!(ledger.counts().total(), 0);
    }
}

mod pipeline_tests {
    use super::*;

    fn settings() -> DeploySettings {
        let mut settings = DeploySettings::default();
        settings
            .constructor_params
            .push("initialSupply", ParamValue::UInt256(Uint256::from_u128(1_000_000)));
        settings
    }

    #[tokio::test]
    async fn test_deploy_uploads_in_chunks() {
        let ledger = MemoryLedger::new();
        let compiler = FixedCompiler::with_len(10_000);
        let copilot = copilot(&ledger).with_compiler(compiler.clone());

        let outcome = copilot.deploy(SOURCE, settings()).await.unwrap();

        assert_eq!(compiler.calls(), 1);
        assert_eq!(outcome.file.chunk_count, 3);
        assert_eq!(outcome.file.total_bytes, 10_000);
        assert_eq!(ledger.file_bytes(&outcome.file.file_id).unwrap(), compiler.bytecode);
        assert_eq!(outcome.record.file_id, outcome.file.file_id);
        assert_eq!(outcome.record.deployer, TEST_ACCOUNT);
        assert_eq!(outcome.record.constructor_args.len(), 1);
        assert!(outcome.warnings.is_empty());

        let counts = ledger.counts();
        assert_eq!(counts.create_file, 1);
        assert_eq!(counts.append_file, 2);
        assert_eq!(counts.create_contract, 1);
    }

    #[tokio::test]
    async fn test_rejected_source_touches_nothing() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger).with_compiler(FixedCompiler::with_len(100));

        let err = copilot
            .deploy("pragma solidity ^0.8.0;\ncontract A {", settings())
            .await
            .unwrap_err();

        match err {
            CopilotError::Pipeline(PipelineError::Compile(CompileError::Rejected {
                errors, ..
            })) => {
                assert_eq!(errors, vec!["Mismatched braces in contract code"]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(ledger.counts().total(), 0);
    }

    #[tokio::test]
    async fn test_interrupted_upload_keeps_file_id() {
        let ledger = MemoryLedger::new();
        ledger.fail_nth(
            Stage::AppendFile,
            2,
            FailureKind::Receipt(Status::InsufficientPayerBalance),
        );
        let copilot = copilot(&ledger).with_compiler(FixedCompiler::with_len(10_000));

        let err = copilot.deploy(SOURCE, settings()).await.unwrap_err();

        let CopilotError::Pipeline(PipelineError::Upload(UploadError::Partial {
            file_id,
            chunks_committed,
            total_chunks,
            source,
        })) = err
        else {
            panic!("expected a partial upload");
        };
        assert_eq!((chunks_committed, total_chunks), (2, 3));
        assert_eq!(source.status(), Some(Status::InsufficientPayerBalance));
        assert_eq!(ledger.file_bytes(&file_id).unwrap().len(), 8192);
        assert_eq!(ledger.counts().create_contract, 0);
    }

    #[tokio::test]
    async fn test_failed_creation_names_the_file() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger).with_compiler(FixedCompiler::with_len(500));
        let mut settings = settings();
        settings.gas = 1_000;

        let err = copilot.deploy(SOURCE, settings).await.unwrap_err();

        let CopilotError::Pipeline(PipelineError::Deploy(deployment)) = err else {
            panic!("expected a deployment error");
        };
        assert!(matches!(
            deployment.cause,
            DeployFailure::Ledger(LedgerError::Receipt {
                status: Status::InsufficientGas,
                ..
            })
        ));
        assert_eq!(ledger.file_bytes(&deployment.file_id).unwrap().len(), 500);
    }
}

mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_list_and_details() {
        let ledger = MemoryLedger::new();
        let registry = Arc::new(RegistryContract::new());
        let registry_id = ledger.deploy_logic(registry.clone());
        let copilot = copilot(&ledger);

        let registered = copilot
            .registry(
                Some(&registry_id),
                "register_contract",
                Some("0.0.5000"),
                Some(&json!({"name": "Token", "type": "ERC20"})),
            )
            .await
            .unwrap();
        assert_eq!(registered["status"], "registered");
        assert_eq!(registered["contract_id"], "0.0.5000");
        assert_eq!(registered["metadata"]["type"], "ERC20");
        assert!(registered["transaction_id"].as_str().unwrap().starts_with(TEST_ACCOUNT));
        assert_eq!(registry.len(), 1);

        let listed = copilot
            .registry(Some(&registry_id), "get_contracts", None, None)
            .await
            .unwrap();
        assert_eq!(listed["registry_id"], registry_id.as_str());
        assert_eq!(listed["contracts"][0]["id"], "0.0.5000");
        assert_eq!(listed["contracts"][0]["owner"], TEST_ACCOUNT);

        let details = copilot
            .registry(Some(&registry_id), "get_contract_details", Some("0.0.5000"), None)
            .await
            .unwrap();
        assert_eq!(details["metadata"]["name"], "Token");
        assert_eq!(details["registry_id"], registry_id.as_str());
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let ledger = MemoryLedger::new();
        let registry_id = ledger.deploy_logic(Arc::new(RegistryContract::new()));
        let copilot = copilot(&ledger);
        let writes_before = ledger.counts().writes();

        let first = copilot
            .registry(Some(&registry_id), "get_contracts", None, None)
            .await
            .unwrap();
        let second = copilot
            .registry(Some(&registry_id), "get_contracts", None, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first["contracts"], json!([]));
        assert_eq!(ledger.counts().writes(), writes_before);
        assert_eq!(ledger.counts().call_function, 2);
    }

    #[tokio::test]
    async fn test_validation_precedes_ledger_traffic() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger);

        let missing = copilot
            .registry(Some("0.0.900"), "register_contract", None, Some(&json!({})))
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            CopilotError::Registry(RegistryError::MissingParameter("contract_id"))
        ));

        let missing = copilot
            .registry(Some("0.0.900"), "get_contract_details", Some("  "), None)
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            CopilotError::Registry(RegistryError::MissingParameter(_))
        ));

        let unsupported = copilot
            .registry(Some("0.0.900"), "delete_contract", Some("0.0.1"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            unsupported,
            CopilotError::Registry(RegistryError::UnsupportedAction(_))
        ));

        let no_registry = copilot.registry(None, "get_contracts", None, None).await.unwrap_err();
        assert!(matches!(
            no_registry,
            CopilotError::Config(ConfigError::Missing("registry.contract_id"))
        ));

        assert_eq!(ledger.counts().total(), 0);
    }

    #[tokio::test]
    async fn test_unknown_contract_details_fail() {
        let ledger = MemoryLedger::new();
        let registry_id = ledger.deploy_logic(Arc::new(RegistryContract::new()));
        let copilot = copilot(&ledger);

        let err = copilot
            .registry(Some(&registry_id), "get_contract_details", Some("0.0.404"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::Registry(RegistryError::Ledger(_))));
    }
}

mod topic_tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_messages_round_trip() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger);

        let topic = copilot.create_topic("hivemind agents").await.unwrap();
        let (ack, sent) = copilot
            .send_message(&topic.topic_id, "0.0.agent1", "ping_request", json!({"n": 1}))
            .await
            .unwrap();
        assert_eq!(ack.sequence_number, 1);

        let received = copilot.read_messages(&topic.topic_id, 0).await.unwrap();
        assert_eq!(received.len(), 1);
        let message = &received[0].message;
        assert_eq!(message, &sent);
        assert_eq!(message.sender, TEST_ACCOUNT);
        assert!(message.signature.is_some());
        assert!(message.verify(&topic.submit_key));

        assert!(copilot.read_messages(&topic.topic_id, 1).await.unwrap().is_empty());
    }
}

mod audit_tests {
    use super::*;

    const VULNERABLE: &str = r#"pragma solidity ^0.6.0;

contract Vault {
    mapping(address => uint) balances;

    function withdraw(uint amount) public {
        (bool ok, ) = msg.sender.call{value: amount}("");
        balances[msg.sender] -= amount;
    }
}
"#;

    #[tokio::test]
    async fn test_audit_without_ai_key_is_unavailable() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger);

        let err = copilot.audit(VULNERABLE, None).await.unwrap_err();
        assert!(matches!(
            err,
            CopilotError::Audit(hive_audit::AuditError::Ai(AiError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_collaborative_audit_through_facade() {
        let ledger = MemoryLedger::new();
        let ai = Arc::new(ScriptedAiProvider::answering("1. Reentrancy in withdraw"));
        let copilot = copilot(&ledger).with_ai(ai.clone());

        let topic = copilot.create_topic("agent1 channel").await.unwrap();
        let agent = TestAgent::new("0.0.agent1", &["security_audit"]).listening_on(&topic.topic_id);
        let directory = Arc::new(StaticDirectory::new(vec![agent.descriptor()]));
        let copilot = copilot.with_directory(directory);
        let responder = agent.spawn_responder(
            Arc::clone(&ledger),
            topic.topic_id.clone(),
            json!({
                "vulnerabilities": ["reentrancy"],
                "severity": "critical",
                "recommendations": ["Use a pull-payment pattern"]
            }),
            Duration::from_millis(10),
        );

        let report = copilot.audit(VULNERABLE, Some("0.0.7777")).await.unwrap();
        assert!(responder.await.unwrap().is_some());

        assert_eq!(ai.calls(), 1);
        assert_eq!(report.auditor_id, TEST_ACCOUNT);
        assert_eq!(report.contract_address.as_deref(), Some("0.0.7777"));
        let collaboration = report.collaboration.as_ref().unwrap();
        assert_eq!(collaboration.topic_id, topic.topic_id);
        assert!(report
            .recommendations
            .contains(&"Use a pull-payment pattern".to_string()));
        assert_eq!(ledger.counts().create_topic, 1);
    }

    #[tokio::test]
    async fn test_deployed_audit_has_gas_figures() {
        let ledger = MemoryLedger::new();
        let copilot = copilot(&ledger)
            .with_compiler(FixedCompiler::with_len(700))
            .with_ai(Arc::new(ScriptedAiProvider::answering("No issues found")));

        let outcome = copilot.deploy(SOURCE, DeploySettings::default()).await.unwrap();
        let report = copilot.audit_deployed(SOURCE, &outcome.record).await.unwrap();

        let gas = report.gas_analysis.unwrap();
        assert_eq!(gas.bytecode_bytes, 700);
        assert_eq!(gas.deployment_gas_used, outcome.record.gas_used);
        assert_eq!(report.contract_address, Some(outcome.record.contract_id));
    }
}

mod generation_tests {
    use super::*;

    fn generating_copilot(ledger: &Arc<MemoryLedger>, ai: Arc<ScriptedAiProvider>) -> Copilot {
        let mut config = config();
        config.ai.codex_model = "codegen-test".to_string();
        config.ai.debug_model = "audit-test".to_string();
        let session = ledger.session(TEST_ACCOUNT, test_key(KeyScheme::Ed25519, "operator"));
        Copilot::with_session(config, session).unwrap().with_ai(ai)
    }

    #[tokio::test]
    async fn test_generate_code_uses_code_model() {
        let ledger = MemoryLedger::new();
        let ai = Arc::new(ScriptedAiProvider::answering("contract Token {}"));
        let copilot = generating_copilot(&ledger, ai.clone());

        let generated = copilot
            .generate_code("a fixed-supply token", "solidity")
            .await
            .unwrap();
        assert_eq!(generated.content, "contract Token {}");
        assert_eq!(generated.model, "codegen-test");

        let prompts = ai.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].model.as_deref(), Some("codegen-test"));
        assert_eq!(prompts[0].messages[0].content, "a fixed-supply token");
        assert!(prompts[0].system_prompt.contains("expert solidity developer"));
        assert_eq!(ledger.counts().writes(), 0);
    }

    #[tokio::test]
    async fn test_generate_tests_targets_hardhat() {
        let ledger = MemoryLedger::new();
        let ai = Arc::new(ScriptedAiProvider::answering("describe('Token', () => {})"));
        let copilot = generating_copilot(&ledger, ai.clone());

        let generated = copilot.generate_tests(SOURCE, "solidity").await.unwrap();
        assert_eq!(generated.model, "codegen-test");

        let prompts = ai.prompts();
        assert_eq!(prompts[0].messages[0].content, SOURCE);
        assert!(prompts[0].system_prompt.contains("using Hardhat"));
    }

    #[tokio::test]
    async fn test_audit_keeps_provider_model() {
        let ledger = MemoryLedger::new();
        let ai = Arc::new(ScriptedAiProvider::answering("No issues"));
        let copilot = generating_copilot(&ledger, ai.clone());

        copilot.audit(SOURCE, None).await.unwrap();
        assert_eq!(ai.prompts()[0].model, None);
    }

    #[tokio::test]
    async fn test_generation_without_key_is_unavailable() {
        let mut config = config();
        config.ai.api_key = None;
        let provider = hive_copilot::ai_provider(&config).unwrap();

        let err = provider
            .generate_code(&config.ai.codex_model, "a token", "solidity")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Unavailable(_)));
    }
}
