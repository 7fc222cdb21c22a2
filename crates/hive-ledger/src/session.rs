//! Ledger session
//!
//! One authenticated connection to one network, owning the operator
//! credentials for its lifetime. Every write primitive follows the same
//! path:
//!
//! ```text
//! build body ─► fresh TransactionId ─► sign ─► submit ─► precheck OK?
//!                                                   │
//!                       typed result ◄─ SUCCESS? ◄─ poll receipt (timeout)
//! ```
//!
//! Writes are serialised by an async mutex held until the receipt arrives,
//! so a session shared behind `Arc` never has two submissions in flight.
//! Read queries bypass the lock.

use hive_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::abi::{ContractParams, FunctionEncoder};
use crate::credentials::OperatorCredentials;
use crate::error::{LedgerError, Result, Stage, Status};
use crate::network::NetworkProfile;
use crate::transaction::{
    ContractCallResult, FileInfo, Transaction, TransactionBody, TransactionId,
    TransactionIdGenerator, TransactionReceipt, TopicMessage,
};
use crate::transport::LedgerTransport;

/// Acknowledgement of a topic submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    pub transaction_id: String,
    pub sequence_number: Option<u64>,
}

/// Result of contract creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCreation {
    pub contract_id: String,
    pub transaction_id: String,
    pub gas_used: u64,
}

/// Result of a state-changing function call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionExecution {
    pub transaction_id: String,
    pub status: Status,
    pub gas_used: u64,
}

/// Authenticated connection to one ledger network
pub struct LedgerSession {
    credentials: OperatorCredentials,
    profile: NetworkProfile,
    transport: Arc<dyn LedgerTransport>,
    ids: TransactionIdGenerator,
    encoder: FunctionEncoder,
    write_lock: Mutex<()>,
}

impl LedgerSession {
    /// Bind credentials to a connected transport
    pub fn new(
        credentials: OperatorCredentials,
        profile: NetworkProfile,
        transport: Arc<dyn LedgerTransport>,
    ) -> Self {
        let ids = TransactionIdGenerator::new(credentials.account_id());
        Self {
            credentials,
            profile,
            transport,
            ids,
            encoder: FunctionEncoder::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> &OperatorCredentials {
        &self.credentials
    }

    pub fn account_id(&self) -> &str {
        self.credentials.account_id()
    }

    /// Operator public key
    pub fn public_key(&self) -> PublicKey {
        self.credentials.public_key()
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    // ------------------------------------------------------------------
    // Write primitives
    // ------------------------------------------------------------------

    /// Create a file holding `contents`, admin-keyed to the operator
    pub async fn create_file(&self, contents: &[u8]) -> Result<String> {
        let body = TransactionBody::FileCreate {
            contents: contents.to_vec(),
            keys: vec![self.public_key()],
        };
        let (tx_id, receipt) = self.execute(body, self.profile.file_create_max_fee).await?;
        let file_id = receipt.file_id.ok_or(LedgerError::MissingField {
            stage: Stage::CreateFile,
            field: "fileId",
        })?;
        tracing::info!(
            file_id = %file_id,
            transaction_id = %tx_id,
            bytes = contents.len(),
            "file created"
        );
        Ok(file_id)
    }

    /// Append `contents` to an existing file
    pub async fn append_file(&self, file_id: &str, contents: &[u8]) -> Result<()> {
        let body = TransactionBody::FileAppend {
            file_id: file_id.to_string(),
            contents: contents.to_vec(),
        };
        let (tx_id, _) = self.execute(body, self.profile.default_max_fee).await?;
        tracing::debug!(
            file_id = %file_id,
            transaction_id = %tx_id,
            bytes = contents.len(),
            "file appended"
        );
        Ok(())
    }

    /// Create a topic whose submissions are gated by `submit_key`
    pub async fn create_topic(&self, memo: &str, submit_key: &PublicKey) -> Result<String> {
        let body = TransactionBody::TopicCreate {
            memo: memo.to_string(),
            submit_key: submit_key.clone(),
        };
        let (tx_id, receipt) = self.execute(body, self.profile.default_max_fee).await?;
        let topic_id = receipt.topic_id.ok_or(LedgerError::MissingField {
            stage: Stage::CreateTopic,
            field: "topicId",
        })?;
        tracing::info!(topic_id = %topic_id, transaction_id = %tx_id, "topic created");
        Ok(topic_id)
    }

    /// Submit raw message bytes to a topic
    pub async fn submit_message(&self, topic_id: &str, message: &[u8]) -> Result<SubmitAck> {
        let body = TransactionBody::TopicSubmitMessage {
            topic_id: topic_id.to_string(),
            message: message.to_vec(),
        };
        let (tx_id, receipt) = self.execute(body, self.profile.default_max_fee).await?;
        tracing::debug!(topic_id = %topic_id, transaction_id = %tx_id, "message submitted");
        Ok(SubmitAck {
            transaction_id: tx_id.to_string(),
            sequence_number: receipt.topic_sequence_number,
        })
    }

    /// Create a contract from an uploaded bytecode file
    pub async fn create_contract(
        &self,
        file_id: &str,
        gas: u64,
        constructor_params: &ContractParams,
        initial_balance: u64,
    ) -> Result<ContractCreation> {
        let body = TransactionBody::ContractCreate {
            file_id: file_id.to_string(),
            gas,
            constructor_parameters: constructor_params.encode(),
            initial_balance,
        };
        let (tx_id, receipt) = self.execute(body, self.profile.file_create_max_fee).await?;
        let contract_id = receipt.contract_id.ok_or(LedgerError::MissingField {
            stage: Stage::CreateContract,
            field: "contractId",
        })?;
        tracing::info!(
            contract_id = %contract_id,
            file_id = %file_id,
            transaction_id = %tx_id,
            "contract created"
        );
        Ok(ContractCreation {
            contract_id,
            transaction_id: tx_id.to_string(),
            gas_used: receipt.gas_used.unwrap_or(0),
        })
    }

    /// Execute a state-changing contract function
    pub async fn execute_function(
        &self,
        contract_id: &str,
        function_name: &str,
        params: &ContractParams,
        gas: u64,
    ) -> Result<FunctionExecution> {
        let body = TransactionBody::ContractExecute {
            contract_id: contract_id.to_string(),
            gas,
            function_parameters: self.encoder.encode_call(function_name, params),
        };
        let (tx_id, receipt) = self.execute(body, self.profile.default_max_fee).await?;
        tracing::info!(
            contract_id = %contract_id,
            function = %function_name,
            transaction_id = %tx_id,
            "function executed"
        );
        Ok(FunctionExecution {
            transaction_id: tx_id.to_string(),
            status: receipt.status,
            gas_used: receipt.gas_used.unwrap_or(0),
        })
    }

    // ------------------------------------------------------------------
    // Read queries
    // ------------------------------------------------------------------

    /// Full contents of a file
    pub async fn file_contents(&self, file_id: &str) -> Result<Vec<u8>> {
        self.transport
            .file_contents(file_id)
            .await
            .map_err(LedgerError::transport(Stage::FileContents))
    }

    /// File metadata
    pub async fn file_info(&self, file_id: &str) -> Result<FileInfo> {
        self.transport
            .file_info(file_id)
            .await
            .map_err(LedgerError::transport(Stage::FileInfo))
    }

    /// Topic history after a sequence number, in append order
    pub async fn topic_messages(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<TopicMessage>> {
        let mut messages = self
            .transport
            .topic_messages(topic_id, after_sequence)
            .await
            .map_err(LedgerError::transport(Stage::TopicMessages))?;
        messages.sort_by_key(|m| m.sequence_number);
        Ok(messages)
    }

    /// Read-only contract call returning raw ABI bytes
    pub async fn call_function(
        &self,
        contract_id: &str,
        function_name: &str,
        params: &ContractParams,
        gas: u64,
    ) -> Result<ContractCallResult> {
        let call_data = self.encoder.encode_call(function_name, params);
        self.transport
            .call_function(contract_id, &call_data, gas)
            .await
            .map_err(LedgerError::transport(Stage::CallFunction))
    }

    // ------------------------------------------------------------------
    // Transaction path
    // ------------------------------------------------------------------

    async fn execute(
        &self,
        body: TransactionBody,
        max_fee: u64,
    ) -> Result<(TransactionId, TransactionReceipt)> {
        let stage = body.stage();
        let _guard = self.write_lock.lock().await;

        let transaction = Transaction {
            transaction_id: self.ids.next_id(),
            max_fee,
            memo: String::new(),
            body,
        };
        let signed = transaction.sign(self.credentials.key())?;
        let tx_id = transaction.transaction_id;

        let precheck = self
            .transport
            .submit(&signed)
            .await
            .map_err(LedgerError::transport(stage))?;
        if !precheck.is_success() {
            tracing::warn!(
                stage = %stage,
                status = %precheck,
                transaction_id = %tx_id,
                "precheck rejected"
            );
            return Err(LedgerError::Precheck {
                stage,
                status: precheck,
            });
        }

        let receipt = self.await_receipt(stage, &tx_id).await?;
        if !receipt.status.is_success() {
            tracing::warn!(
                stage = %stage,
                status = %receipt.status,
                transaction_id = %tx_id,
                "receipt reports failure"
            );
            return Err(LedgerError::Receipt {
                stage,
                status: receipt.status,
                transaction_id: tx_id.to_string(),
            });
        }
        Ok((tx_id, receipt))
    }

    async fn await_receipt(
        &self,
        stage: Stage,
        tx_id: &TransactionId,
    ) -> Result<TransactionReceipt> {
        let started = Instant::now();
        let poll = async {
            loop {
                match self.transport.receipt(tx_id).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {
                        tracing::debug!(transaction_id = %tx_id, "receipt not yet available");
                        tokio::time::sleep(self.profile.receipt_poll_interval).await;
                    }
                    Err(e) => return Err(LedgerError::Transport { stage, source: e }),
                }
            }
        };
        match tokio::time::timeout(self.profile.receipt_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::ReceiptTimeout {
                stage,
                transaction_id: tx_id.to_string(),
                waited_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }
}

impl std::fmt::Debug for LedgerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSession")
            .field("account_id", &self.credentials.account_id())
            .field("network", &self.profile.network)
            .field("transport", &self.transport.name())
            .finish()
    }
}
