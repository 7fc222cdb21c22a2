//! # HiveMind Ledger
//!
//! The ledger interaction layer: credential resolution, an authenticated
//! session exposing the network's primitive transactions, and the
//! multi-transaction flows built on top of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CredentialResolver  │  network name + account id + key text
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐      ┌───────────────────────┐
//! │    LedgerSession     │─────►│  dyn LedgerTransport  │  JSON-RPC / in-memory
//! └──┬─────────┬─────────┘      └───────────────────────┘
//!    │         │
//!    ▼         ▼
//! ArtifactUploader ─► ContractDeployer      TopicChannel ◄─► MessageSigner
//! ```
//!
//! No global client exists: a session is constructed explicitly and passed
//! by reference to every component that needs it.

pub mod abi;
pub mod credentials;
pub mod deployer;
pub mod error;
pub mod network;
pub mod rpc;
pub mod session;
pub mod topic;
pub mod transaction;
pub mod transport;
pub mod uploader;

pub use abi::{ContractParams, FunctionEncoder, ParamValue, Uint256};
pub use credentials::{CredentialResolver, OperatorCredentials};
pub use deployer::{ContractDeployer, ContractRecord, DeployRequest, DEFAULT_GAS_LIMIT};
pub use error::*;
pub use network::{Network, NetworkProfile};
pub use rpc::{JsonRpcConnector, JsonRpcTransport};
pub use session::{ContractCreation, FunctionExecution, LedgerSession, SubmitAck};
pub use topic::{Received, Topic, TopicChannel, TopicPayload};
pub use transaction::{
    ContractCallResult, FileInfo, SignedTransaction, TopicMessage, Transaction, TransactionBody,
    TransactionId, TransactionReceipt,
};
pub use transport::{LedgerConnector, LedgerTransport};
pub use uploader::{chunk_plan, ArtifactUploader, LedgerFile};
