//! In-memory ledger
//!
//! [`MemoryLedger`] implements the transport and connector seams entirely in
//! process. It applies transactions the way the network would (files, topics,
//! contracts, receipts), counts every call per primitive, and can be told to
//! fail a specific call so error paths are observable in tests.

use async_trait::async_trait;
use chrono::Utc;
use hive_crypto::PublicKey;
use hive_ledger::network::{MAX_FILE_CHUNK_SIZE, MAX_TOPIC_MESSAGE_SIZE};
use hive_ledger::{
    ContractCallResult, FileInfo, LedgerConnector, LedgerError, LedgerSession, LedgerTransport,
    NetworkProfile, OperatorCredentials, SignedTransaction, Stage, Status, TopicMessage,
    TransactionBody, TransactionId, TransactionReceipt, TransportError,
};
use hive_crypto::OperatorKey;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Contract behaviour installed in the memory ledger
pub trait ContractLogic: Send + Sync {
    /// State-changing call; `Err` is the receipt status
    fn execute(&self, call_data: &[u8], caller: &str) -> Result<Vec<u8>, Status>;

    /// Read-only call
    fn call(&self, call_data: &[u8]) -> Result<Vec<u8>, Status>;
}

/// How an injected failure manifests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Refused at submission with this status
    Precheck(Status),
    /// Accepted, but the receipt reports this status
    Receipt(Status),
    /// The submission never reaches the network
    Transport,
}

#[derive(Clone, Debug)]
struct FailureRule {
    stage: Stage,
    nth: usize,
    kind: FailureKind,
}

/// Per-primitive call counts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub connect: usize,
    pub create_file: usize,
    pub append_file: usize,
    pub create_topic: usize,
    pub submit_message: usize,
    pub create_contract: usize,
    pub execute_function: usize,
    pub receipt: usize,
    pub file_contents: usize,
    pub file_info: usize,
    pub topic_messages: usize,
    pub call_function: usize,
}

impl CallCounts {
    /// Every call that would have crossed the network
    pub fn total(&self) -> usize {
        self.connect
            + self.create_file
            + self.append_file
            + self.create_topic
            + self.submit_message
            + self.create_contract
            + self.execute_function
            + self.receipt
            + self.file_contents
            + self.file_info
            + self.topic_messages
            + self.call_function
    }

    /// Submitted write transactions
    pub fn writes(&self) -> usize {
        self.create_file
            + self.append_file
            + self.create_topic
            + self.submit_message
            + self.create_contract
            + self.execute_function
    }

    fn bump(&mut self, stage: Stage) -> usize {
        let slot = match stage {
            Stage::CreateFile => &mut self.create_file,
            Stage::AppendFile => &mut self.append_file,
            Stage::CreateTopic => &mut self.create_topic,
            Stage::SubmitMessage => &mut self.submit_message,
            Stage::CreateContract => &mut self.create_contract,
            Stage::ExecuteFunction => &mut self.execute_function,
            Stage::FileContents => &mut self.file_contents,
            Stage::FileInfo => &mut self.file_info,
            Stage::TopicMessages => &mut self.topic_messages,
            Stage::CallFunction => &mut self.call_function,
            Stage::Connect => &mut self.connect,
        };
        *slot += 1;
        *slot
    }
}

/// One committed file append, for order assertions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendRecord {
    pub file_id: String,
    /// File length before this append
    pub offset: u64,
    pub len: usize,
}

struct FileEntry {
    contents: Vec<u8>,
    deleted: bool,
}

struct TopicEntry {
    submit_key: PublicKey,
    messages: Vec<TopicMessage>,
}

struct ContractEntry {
    logic: Option<Arc<dyn ContractLogic>>,
}

#[derive(Default)]
struct LedgerState {
    next_entity: u64,
    files: HashMap<String, FileEntry>,
    topics: HashMap<String, TopicEntry>,
    contracts: HashMap<String, ContractEntry>,
    receipts: HashMap<String, TransactionReceipt>,
    receipt_polls: HashMap<String, usize>,
    seen: HashSet<String>,
    appends: Vec<AppendRecord>,
    counts: CallCounts,
    failures: Vec<FailureRule>,
    receipt_delay: usize,
    fail_connect: bool,
}

impl LedgerState {
    fn next_id(&mut self) -> String {
        self.next_entity += 1;
        format!("0.0.{}", 1000 + self.next_entity)
    }

    fn take_failure(&mut self, stage: Stage, nth: usize) -> Option<FailureKind> {
        let index = self
            .failures
            .iter()
            .position(|rule| rule.stage == stage && rule.nth == nth)?;
        Some(self.failures.remove(index).kind)
    }
}

/// Gas charged for creating a contract from `len` bytes of bytecode
pub fn creation_gas(len: usize) -> u64 {
    50_000 + len as u64 * 10
}

/// Gas charged for a contract function execution
pub const EXECUTION_GAS: u64 = 25_000;

/// In-process ledger network
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector handing out this ledger
    pub fn connector(self: &Arc<Self>) -> Arc<dyn LedgerConnector> {
        Arc::new(MemoryConnector {
            ledger: Arc::clone(self),
        })
    }

    /// Testnet profile with fast receipt polling
    pub fn profile() -> NetworkProfile {
        NetworkProfile::testnet()
            .with_endpoints(vec!["memory://ledger".to_string()])
            .with_mirror_endpoints(vec!["memory://mirror".to_string()])
            .with_receipt_timing(Duration::from_secs(2), Duration::from_millis(5))
    }

    /// Session on this ledger without going through the resolver
    pub fn session(self: &Arc<Self>, account_id: &str, key: OperatorKey) -> LedgerSession {
        let transport: Arc<dyn LedgerTransport> = Arc::clone(self) as Arc<dyn LedgerTransport>;
        LedgerSession::new(
            OperatorCredentials::new(account_id, key),
            Self::profile(),
            transport,
        )
    }

    // ------------------------------------------------------------------
    // Behaviour controls
    // ------------------------------------------------------------------

    /// Fail the `nth` (1-based) call of `stage`
    pub fn fail_nth(&self, stage: Stage, nth: usize, kind: FailureKind) {
        self.state.lock().failures.push(FailureRule { stage, nth, kind });
    }

    /// Answer "not yet" to the first `polls` receipt queries of every transaction
    pub fn delay_receipts(&self, polls: usize) {
        self.state.lock().receipt_delay = polls;
    }

    /// Never produce receipts
    pub fn withhold_receipts(&self) {
        self.state.lock().receipt_delay = usize::MAX;
    }

    /// Make every connect attempt fail
    pub fn refuse_connections(&self) {
        self.state.lock().fail_connect = true;
    }

    /// Attach behaviour to a contract
    pub fn install_logic(&self, contract_id: &str, logic: Arc<dyn ContractLogic>) {
        self.state
            .lock()
            .contracts
            .insert(contract_id.to_string(), ContractEntry { logic: Some(logic) });
    }

    /// Create a contract backed only by logic (no bytecode file)
    pub fn deploy_logic(&self, logic: Arc<dyn ContractLogic>) -> String {
        let mut state = self.state.lock();
        let id = state.next_id();
        state
            .contracts
            .insert(id.clone(), ContractEntry { logic: Some(logic) });
        id
    }

    /// Create a topic directly, gated by `submit_key`
    pub fn create_topic_direct(&self, submit_key: PublicKey) -> String {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.topics.insert(
            id.clone(),
            TopicEntry {
                submit_key,
                messages: Vec::new(),
            },
        );
        id
    }

    /// Append a message as another authorised party would; returns its sequence number
    pub fn inject_message(&self, topic_id: &str, contents: Vec<u8>) -> Option<u64> {
        let mut state = self.state.lock();
        let topic = state.topics.get_mut(topic_id)?;
        let sequence_number = topic.messages.len() as u64 + 1;
        topic.messages.push(TopicMessage {
            topic_id: topic_id.to_string(),
            sequence_number,
            consensus_timestamp: Utc::now(),
            contents,
        });
        Some(sequence_number)
    }

    /// Mark a file deleted
    pub fn delete_file(&self, file_id: &str) {
        if let Some(file) = self.state.lock().files.get_mut(file_id) {
            file.deleted = true;
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn counts(&self) -> CallCounts {
        self.state.lock().counts.clone()
    }

    pub fn append_log(&self) -> Vec<AppendRecord> {
        self.state.lock().appends.clone()
    }

    pub fn file_bytes(&self, file_id: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(file_id).map(|f| f.contents.clone())
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Raw contents of every message on a topic, in order
    pub fn topic_history(&self, topic_id: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .topics
            .get(topic_id)
            .map(|t| t.messages.iter().map(|m| m.contents.clone()).collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Transaction application
    // ------------------------------------------------------------------

    fn apply(
        state: &mut LedgerState,
        body: TransactionBody,
        payer: &PublicKey,
        account: &str,
    ) -> TransactionReceipt {
        match body {
            TransactionBody::FileCreate { contents, .. } => {
                let id = state.next_id();
                state.files.insert(
                    id.clone(),
                    FileEntry {
                        contents,
                        deleted: false,
                    },
                );
                TransactionReceipt {
                    file_id: Some(id),
                    ..TransactionReceipt::with_status(Status::Success)
                }
            }
            TransactionBody::FileAppend { file_id, contents } => {
                let Some(file) = state.files.get_mut(&file_id) else {
                    return TransactionReceipt::with_status(Status::InvalidFileId);
                };
                if file.deleted {
                    return TransactionReceipt::with_status(Status::FileDeleted);
                }
                let offset = file.contents.len() as u64;
                file.contents.extend_from_slice(&contents);
                state.appends.push(AppendRecord {
                    file_id,
                    offset,
                    len: contents.len(),
                });
                TransactionReceipt::with_status(Status::Success)
            }
            TransactionBody::TopicCreate { submit_key, .. } => {
                let id = state.next_id();
                state.topics.insert(
                    id.clone(),
                    TopicEntry {
                        submit_key,
                        messages: Vec::new(),
                    },
                );
                TransactionReceipt {
                    topic_id: Some(id),
                    ..TransactionReceipt::with_status(Status::Success)
                }
            }
            TransactionBody::TopicSubmitMessage { topic_id, message } => {
                let Some(topic) = state.topics.get_mut(&topic_id) else {
                    return TransactionReceipt::with_status(Status::InvalidTopicId);
                };
                if &topic.submit_key != payer {
                    return TransactionReceipt::with_status(Status::InvalidSignature);
                }
                let sequence_number = topic.messages.len() as u64 + 1;
                topic.messages.push(TopicMessage {
                    topic_id: topic_id.clone(),
                    sequence_number,
                    consensus_timestamp: Utc::now(),
                    contents: message,
                });
                TransactionReceipt {
                    topic_sequence_number: Some(sequence_number),
                    ..TransactionReceipt::with_status(Status::Success)
                }
            }
            TransactionBody::ContractCreate { file_id, gas, .. } => {
                let len = match state.files.get(&file_id) {
                    Some(file) if !file.deleted && !file.contents.is_empty() => file.contents.len(),
                    _ => return TransactionReceipt::with_status(Status::InvalidFileId),
                };
                let required = creation_gas(len);
                if gas < required {
                    return TransactionReceipt::with_status(Status::InsufficientGas);
                }
                let id = state.next_id();
                state.contracts.insert(id.clone(), ContractEntry { logic: None });
                TransactionReceipt {
                    contract_id: Some(id),
                    gas_used: Some(required),
                    ..TransactionReceipt::with_status(Status::Success)
                }
            }
            TransactionBody::ContractExecute {
                contract_id,
                gas,
                function_parameters,
            } => {
                let Some(contract) = state.contracts.get(&contract_id) else {
                    return TransactionReceipt::with_status(Status::InvalidContractId);
                };
                if gas < EXECUTION_GAS {
                    return TransactionReceipt::with_status(Status::InsufficientGas);
                }
                let outcome = match &contract.logic {
                    Some(logic) => logic.execute(&function_parameters, account),
                    None => Err(Status::ContractRevertExecuted),
                };
                match outcome {
                    Ok(_) => TransactionReceipt {
                        gas_used: Some(EXECUTION_GAS),
                        ..TransactionReceipt::with_status(Status::Success)
                    },
                    Err(status) => TransactionReceipt::with_status(status),
                }
            }
        }
    }
}

#[async_trait]
impl LedgerTransport for MemoryLedger {
    async fn submit(&self, transaction: &SignedTransaction) -> Result<Status, TransportError> {
        let mut state = self.state.lock();

        let decoded = transaction
            .decode()
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        let stage = decoded.body.stage();
        let nth = state.counts.bump(stage);

        match state.take_failure(stage, nth) {
            Some(FailureKind::Transport) => {
                return Err(TransportError::Injected(format!("{} #{}", stage, nth)))
            }
            Some(FailureKind::Precheck(status)) => return Ok(status),
            Some(FailureKind::Receipt(status)) => {
                let key = transaction.transaction_id.to_string();
                state.seen.insert(key.clone());
                state.receipts.insert(key, TransactionReceipt::with_status(status));
                return Ok(Status::Ok);
            }
            None => {}
        }

        if !transaction.verify_signatures() {
            return Ok(Status::InvalidSignature);
        }
        let key = transaction.transaction_id.to_string();
        if !state.seen.insert(key.clone()) {
            return Ok(Status::DuplicateTransaction);
        }
        match &decoded.body {
            TransactionBody::FileCreate { contents, .. }
            | TransactionBody::FileAppend { contents, .. }
                if contents.len() > MAX_FILE_CHUNK_SIZE =>
            {
                return Ok(Status::MaxFileSizeExceeded)
            }
            TransactionBody::TopicSubmitMessage { message, .. }
                if message.len() > MAX_TOPIC_MESSAGE_SIZE =>
            {
                return Ok(Status::MessageSizeTooLarge)
            }
            _ => {}
        }

        let payer = match transaction.signatures.first() {
            Some(pair) => pair.public_key.clone(),
            None => return Ok(Status::InvalidSignature),
        };
        let receipt = Self::apply(
            &mut state,
            decoded.body,
            &payer,
            &decoded.transaction_id.account_id,
        );
        state.receipts.insert(key, receipt);
        Ok(Status::Ok)
    }

    async fn receipt(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionReceipt>, TransportError> {
        let mut state = self.state.lock();
        state.counts.receipt += 1;
        let key = transaction_id.to_string();
        let delay = state.receipt_delay;
        let polls = state.receipt_polls.entry(key.clone()).or_insert(0);
        *polls += 1;
        if *polls <= delay {
            return Ok(None);
        }
        state
            .receipts
            .get(&key)
            .cloned()
            .map(Some)
            .ok_or_else(|| TransportError::NotFound(key))
    }

    async fn file_contents(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        state.counts.file_contents += 1;
        match state.files.get(file_id) {
            Some(file) if !file.deleted => Ok(file.contents.clone()),
            _ => Err(TransportError::NotFound(file_id.to_string())),
        }
    }

    async fn file_info(&self, file_id: &str) -> Result<FileInfo, TransportError> {
        let mut state = self.state.lock();
        state.counts.file_info += 1;
        state
            .files
            .get(file_id)
            .map(|file| FileInfo {
                file_id: file_id.to_string(),
                size: file.contents.len() as u64,
                deleted: file.deleted,
            })
            .ok_or_else(|| TransportError::NotFound(file_id.to_string()))
    }

    async fn topic_messages(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<TopicMessage>, TransportError> {
        let mut state = self.state.lock();
        state.counts.topic_messages += 1;
        let topic = state
            .topics
            .get(topic_id)
            .ok_or_else(|| TransportError::NotFound(topic_id.to_string()))?;
        Ok(topic
            .messages
            .iter()
            .filter(|m| m.sequence_number > after_sequence)
            .cloned()
            .collect())
    }

    async fn call_function(
        &self,
        contract_id: &str,
        call_data: &[u8],
        _gas: u64,
    ) -> Result<ContractCallResult, TransportError> {
        let logic = {
            let mut state = self.state.lock();
            state.counts.call_function += 1;
            let contract = state
                .contracts
                .get(contract_id)
                .ok_or_else(|| TransportError::NotFound(contract_id.to_string()))?;
            contract.logic.clone()
        };
        let logic = logic.ok_or_else(|| TransportError::Rpc {
            code: -32000,
            message: "CONTRACT_REVERT_EXECUTED".to_string(),
        })?;
        let result = logic.call(call_data).map_err(|status| TransportError::Rpc {
            code: -32000,
            message: status.to_string(),
        })?;
        Ok(ContractCallResult {
            result,
            gas_used: EXECUTION_GAS,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Connector that counts connections and hands out the shared ledger
pub struct MemoryConnector {
    ledger: Arc<MemoryLedger>,
}

#[async_trait]
impl LedgerConnector for MemoryConnector {
    async fn connect(
        &self,
        _profile: &NetworkProfile,
        account_id: &str,
    ) -> Result<Arc<dyn LedgerTransport>, LedgerError> {
        let refused = {
            let mut state = self.ledger.state.lock();
            state.counts.connect += 1;
            state.fail_connect
        };
        if refused {
            return Err(LedgerError::Transport {
                stage: Stage::Connect,
                source: TransportError::Unavailable(format!("refused {}", account_id)),
            });
        }
        Ok(Arc::clone(&self.ledger) as Arc<dyn LedgerTransport>)
    }
}
