//! Transactions and receipts
//!
//! A [`Transaction`] is bincode-encoded into body bytes; the operator signs
//! those exact bytes and the [`SignedTransaction`] carries both. Each
//! transaction has a fresh [`TransactionId`], so a retried primitive never
//! resubmits bytes the network has already accepted.

use chrono::{DateTime, Utc};
use hive_crypto::{OperatorKey, PublicKey, SignatureBytes};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Stage, Status};

/// Transaction identifier: payer account plus valid-start timestamp
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    /// Paying account
    pub account_id: String,
    /// Valid-start seconds since the epoch
    pub valid_start_secs: i64,
    /// Valid-start nanoseconds
    pub valid_start_nanos: u32,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id, self.valid_start_secs, self.valid_start_nanos
        )
    }
}

/// Generates strictly increasing valid-start timestamps for one account
pub struct TransactionIdGenerator {
    account_id: String,
    last_nanos: Mutex<i128>,
}

impl TransactionIdGenerator {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            last_nanos: Mutex::new(0),
        }
    }

    /// Next id; never repeats even within one clock tick
    pub fn next_id(&self) -> TransactionId {
        let now = Utc::now();
        let now_nanos =
            now.timestamp() as i128 * 1_000_000_000 + now.timestamp_subsec_nanos() as i128;
        let mut last = self.last_nanos.lock();
        let nanos = if now_nanos > *last { now_nanos } else { *last + 1 };
        *last = nanos;
        TransactionId {
            account_id: self.account_id.clone(),
            valid_start_secs: (nanos / 1_000_000_000) as i64,
            valid_start_nanos: (nanos % 1_000_000_000) as u32,
        }
    }
}

/// Operation-specific transaction body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionBody {
    FileCreate {
        contents: Vec<u8>,
        keys: Vec<PublicKey>,
    },
    FileAppend {
        file_id: String,
        contents: Vec<u8>,
    },
    TopicCreate {
        memo: String,
        submit_key: PublicKey,
    },
    TopicSubmitMessage {
        topic_id: String,
        message: Vec<u8>,
    },
    ContractCreate {
        file_id: String,
        gas: u64,
        constructor_parameters: Vec<u8>,
        initial_balance: u64,
    },
    ContractExecute {
        contract_id: String,
        gas: u64,
        function_parameters: Vec<u8>,
    },
}

impl TransactionBody {
    /// Stage this body belongs to
    pub fn stage(&self) -> Stage {
        match self {
            TransactionBody::FileCreate { .. } => Stage::CreateFile,
            TransactionBody::FileAppend { .. } => Stage::AppendFile,
            TransactionBody::TopicCreate { .. } => Stage::CreateTopic,
            TransactionBody::TopicSubmitMessage { .. } => Stage::SubmitMessage,
            TransactionBody::ContractCreate { .. } => Stage::CreateContract,
            TransactionBody::ContractExecute { .. } => Stage::ExecuteFunction,
        }
    }
}

/// Unsigned transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    /// Maximum fee the payer accepts, in tinybars
    pub max_fee: u64,
    pub memo: String,
    pub body: TransactionBody,
}

impl Transaction {
    /// Encode and sign with the operator key
    pub fn sign(&self, key: &OperatorKey) -> Result<SignedTransaction, LedgerError> {
        let body_bytes = bincode::serialize(self).map_err(|e| LedgerError::Encoding {
            stage: self.body.stage(),
            reason: e.to_string(),
        })?;
        let signature = key.sign(&body_bytes);
        Ok(SignedTransaction {
            transaction_id: self.transaction_id.clone(),
            body_bytes,
            signatures: vec![SignaturePair {
                public_key: key.public_key(),
                signature,
            }],
        })
    }
}

/// Public key and the signature it produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    pub public_key: PublicKey,
    pub signature: SignatureBytes,
}

/// Encoded transaction with its signatures
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction_id: TransactionId,
    pub body_bytes: Vec<u8>,
    pub signatures: Vec<SignaturePair>,
}

impl SignedTransaction {
    /// Decode the signed body
    pub fn decode(&self) -> Result<Transaction, bincode::Error> {
        bincode::deserialize(&self.body_bytes)
    }

    /// Whether every signature verifies over the body bytes
    pub fn verify_signatures(&self) -> bool {
        !self.signatures.is_empty()
            && self
                .signatures
                .iter()
                .all(|pair| pair.public_key.verify(&self.body_bytes, &pair.signature).is_ok())
    }

    /// Wire encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Parse from wire encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Network confirmation of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub status: Status,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub contract_id: Option<String>,
    #[serde(default)]
    pub topic_sequence_number: Option<u64>,
    #[serde(default)]
    pub gas_used: Option<u64>,
}

impl TransactionReceipt {
    /// Receipt carrying only a status
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            file_id: None,
            topic_id: None,
            contract_id: None,
            topic_sequence_number: None,
            gas_used: None,
        }
    }
}

/// Metadata of a ledger file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_id: String,
    pub size: u64,
    #[serde(default)]
    pub deleted: bool,
}

/// One message from a topic's history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    pub topic_id: String,
    pub sequence_number: u64,
    pub consensus_timestamp: DateTime<Utc>,
    pub contents: Vec<u8>,
}

/// Result of a read-only contract call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCallResult {
    pub result: Vec<u8>,
    pub gas_used: u64,
}
