//! Agent discovery

use async_trait::async_trait;
use hive_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ProtocolError;

/// A discoverable agent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub capabilities: BTreeSet<String>,
    /// Key the agent signs its messages with
    pub public_key: PublicKey,
    /// Shared channel the agent already listens on, if any
    #[serde(default)]
    pub topic_id: Option<String>,
}

impl AgentDescriptor {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// External registry of agent descriptors
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Ids of agents advertising `capability`
    async fn discover(&self, capability: &str) -> Result<Vec<String>, ProtocolError>;

    /// Descriptor for an agent id
    async fn lookup(&self, agent_id: &str) -> Result<Option<AgentDescriptor>, ProtocolError>;
}

/// In-memory directory built from configuration
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    agents: Vec<AgentDescriptor>,
}

impl StaticDirectory {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }
}

#[async_trait]
impl AgentDirectory for StaticDirectory {
    async fn discover(&self, capability: &str) -> Result<Vec<String>, ProtocolError> {
        Ok(self
            .agents
            .iter()
            .filter(|a| a.has_capability(capability))
            .map(|a| a.id.clone())
            .collect())
    }

    async fn lookup(&self, agent_id: &str) -> Result<Option<AgentDescriptor>, ProtocolError> {
        Ok(self.agents.iter().find(|a| a.id == agent_id).cloned())
    }
}
