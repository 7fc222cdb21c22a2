//! # HiveMind Testkit
//!
//! In-process stand-ins for the external collaborators:
//! - [`MemoryLedger`]: a ledger network with call counters and failure injection
//! - [`RegistryContract`]: contract logic for the registry
//! - [`ScriptedAiProvider`]: canned language-model replies
//! - [`TestAgent`]: the remote side of the agent protocol
//!
//! Test helpers panic on setup failures.

pub mod agents;
pub mod ai;
pub mod keys;
pub mod ledger;
pub mod registry;

pub use agents::TestAgent;
pub use ai::ScriptedAiProvider;
pub use keys::{test_key, test_key_der_hex, test_key_hex, test_secret, TEST_ACCOUNT};
pub use ledger::{
    creation_gas, AppendRecord, CallCounts, ContractLogic, FailureKind, MemoryConnector,
    MemoryLedger, EXECUTION_GAS,
};
pub use registry::RegistryContract;

use hive_crypto::KeyScheme;
use hive_ledger::LedgerSession;
use std::sync::Arc;

/// Fresh ledger plus an Ed25519 operator session on it
pub fn ledger_session() -> (Arc<MemoryLedger>, LedgerSession) {
    let ledger = MemoryLedger::new();
    let session = ledger.session(TEST_ACCOUNT, test_key(KeyScheme::Ed25519, "operator"));
    (ledger, session)
}
