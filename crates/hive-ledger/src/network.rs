//! # Network Profiles
//!
//! Fixed parameters of each ledger network a session can bind to.
//!
//! | Parameter | Testnet | Mainnet |
//! |-----------|---------|---------|
//! | Max file chunk | 4096 bytes | 4096 bytes |
//! | Max topic message | 1024 bytes | 1024 bytes |
//! | File create max fee | 2 hbar | 2 hbar |
//! | Receipt timeout | 30 s | 30 s |
//!
//! Profiles carry no endpoints of their own. The transport speaks the
//! `ledger_*` JSON-RPC methods of a HiveMind ledger gateway, which public
//! relays and mirror nodes do not serve, so `ledger.endpoints` (and
//! optionally `ledger.mirror_endpoints`) must point at a deployed gateway.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CredentialError;

// ============================================================================
// NETWORK CONSTANTS
// ============================================================================

/// Largest payload a single file create/append transaction may carry
pub const MAX_FILE_CHUNK_SIZE: usize = 4096;

/// Largest message a single topic submission may carry
pub const MAX_TOPIC_MESSAGE_SIZE: usize = 1024;

/// Tinybars per hbar
pub const TINYBARS_PER_HBAR: u64 = 100_000_000;

/// Max fee for file creation (2 hbar)
pub const FILE_CREATE_MAX_FEE: u64 = 2 * TINYBARS_PER_HBAR;

/// Max fee for every other transaction (1 hbar)
pub const DEFAULT_MAX_FEE: u64 = TINYBARS_PER_HBAR;

// ============================================================================
// NETWORK
// ============================================================================

/// Recognised ledger networks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(CredentialError::Configuration(format!(
                "unknown network '{}', expected 'testnet' or 'mainnet'",
                other
            ))),
        }
    }
}

// ============================================================================
// NETWORK PROFILE
// ============================================================================

/// Complete per-network configuration used by a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Network this profile describes
    pub network: Network,

    /// Transaction submission endpoints, tried in order. Empty until configured.
    pub endpoints: Vec<String>,

    /// Read-query endpoints, tried in order. Empty means reuse `endpoints`.
    pub mirror_endpoints: Vec<String>,

    /// Maximum file chunk per transaction
    pub max_chunk_size: usize,

    /// Maximum topic message size
    pub max_message_size: usize,

    /// Max fee for file creation, in tinybars
    pub file_create_max_fee: u64,

    /// Max fee for other transactions, in tinybars
    pub default_max_fee: u64,

    /// How long to wait for a receipt
    pub receipt_timeout: Duration,

    /// Delay between receipt polls
    pub receipt_poll_interval: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl NetworkProfile {
    /// Profile for a recognised network
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            endpoints: Vec::new(),
            mirror_endpoints: Vec::new(),
            max_chunk_size: MAX_FILE_CHUNK_SIZE,
            max_message_size: MAX_TOPIC_MESSAGE_SIZE,
            file_create_max_fee: FILE_CREATE_MAX_FEE,
            default_max_fee: DEFAULT_MAX_FEE,
            receipt_timeout: Duration::from_secs(30),
            receipt_poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Testnet profile
    pub fn testnet() -> Self {
        Self::for_network(Network::Testnet)
    }

    /// Mainnet profile
    pub fn mainnet() -> Self {
        Self::for_network(Network::Mainnet)
    }

    /// Parse a network name (case-insensitive) into its profile
    pub fn from_name(name: &str) -> Result<Self, CredentialError> {
        Ok(Self::for_network(name.parse()?))
    }

    /// Replace the submission endpoints
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        if !endpoints.is_empty() {
            self.endpoints = endpoints;
        }
        self
    }

    /// Replace the read-query endpoints
    pub fn with_mirror_endpoints(mut self, endpoints: Vec<String>) -> Self {
        if !endpoints.is_empty() {
            self.mirror_endpoints = endpoints;
        }
        self
    }

    /// Whether a gateway has been configured for submissions
    pub fn has_gateway(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Replace receipt timing
    pub fn with_receipt_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.receipt_timeout = timeout;
        self.receipt_poll_interval = poll_interval;
        self
    }
}
