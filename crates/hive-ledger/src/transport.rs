//! Network transport seam
//!
//! [`LedgerTransport`] is the opaque RPC surface a session drives: submit a
//! signed transaction, poll for its receipt, and run read-only queries.
//! [`LedgerConnector`] opens a transport for a network profile.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{LedgerError, Status, TransportError};
use crate::network::NetworkProfile;
use crate::transaction::{
    ContractCallResult, FileInfo, SignedTransaction, TopicMessage, TransactionId,
    TransactionReceipt,
};

/// RPC surface of a ledger network
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submit a signed transaction; returns the precheck status
    async fn submit(&self, transaction: &SignedTransaction) -> Result<Status, TransportError>;

    /// Receipt for a transaction, `None` while it is not yet final
    async fn receipt(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionReceipt>, TransportError>;

    /// Full contents of a file
    async fn file_contents(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;

    /// File metadata
    async fn file_info(&self, file_id: &str) -> Result<FileInfo, TransportError>;

    /// Topic messages with sequence number greater than `after_sequence`
    async fn topic_messages(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<TopicMessage>, TransportError>;

    /// Read-only contract call
    async fn call_function(
        &self,
        contract_id: &str,
        call_data: &[u8],
        gas: u64,
    ) -> Result<ContractCallResult, TransportError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

/// Opens transports for network profiles
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Connect and authenticate `account_id` on the profile's network
    async fn connect(
        &self,
        profile: &NetworkProfile,
        account_id: &str,
    ) -> Result<Arc<dyn LedgerTransport>, LedgerError>;
}
