//! Contract registry adapter
//!
//! A closed set of actions against the registry contract. Reads are local
//! contract calls; registration is a single `registerContract` execution.
//! Parameters are validated before any ledger traffic.

use hive_ledger::abi::decode_string;
use hive_ledger::{ContractParams, LedgerSession, ParamValue};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// Default gas for registry calls
pub const DEFAULT_REGISTRY_GAS: u64 = 300_000;

/// Registry actions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryAction {
    GetContracts,
    RegisterContract,
    GetContractDetails,
}

impl RegistryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryAction::GetContracts => "get_contracts",
            RegistryAction::RegisterContract => "register_contract",
            RegistryAction::GetContractDetails => "get_contract_details",
        }
    }

    /// Whether the action needs a contract id
    pub fn needs_contract(&self) -> bool {
        !matches!(self, RegistryAction::GetContracts)
    }
}

impl fmt::Display for RegistryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryAction {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get_contracts" => Ok(RegistryAction::GetContracts),
            "register_contract" => Ok(RegistryAction::RegisterContract),
            "get_contract_details" => Ok(RegistryAction::GetContractDetails),
            other => Err(RegistryError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Talks to one registry contract through a session
pub struct RegistryAdapter<'a> {
    session: &'a LedgerSession,
    gas: u64,
}

impl<'a> RegistryAdapter<'a> {
    pub fn new(session: &'a LedgerSession) -> Self {
        Self {
            session,
            gas: DEFAULT_REGISTRY_GAS,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Run `action` (by name) against `registry_id`
    pub async fn interact(
        &self,
        registry_id: &str,
        action: &str,
        contract_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<Value, RegistryError> {
        let action: RegistryAction = action.parse()?;
        self.run(registry_id, action, contract_id, metadata).await
    }

    /// Run a parsed action
    pub async fn run(
        &self,
        registry_id: &str,
        action: RegistryAction,
        contract_id: Option<&str>,
        metadata: Option<&Value>,
    ) -> Result<Value, RegistryError> {
        let contract_id = contract_id.map(str::trim).filter(|id| !id.is_empty());
        if action.needs_contract() && contract_id.is_none() {
            return Err(RegistryError::MissingParameter("contract_id"));
        }
        if let Some(metadata) = metadata {
            if !metadata.is_object() {
                return Err(RegistryError::InvalidMetadata(
                    "metadata must be a JSON object".to_string(),
                ));
            }
        }
        tracing::debug!(registry_id = %registry_id, action = %action, "registry interaction");

        match (action, contract_id) {
            (RegistryAction::GetContracts, _) => self.get_contracts(registry_id).await,
            (RegistryAction::RegisterContract, Some(contract_id)) => {
                self.register_contract(registry_id, contract_id, metadata).await
            }
            (RegistryAction::GetContractDetails, Some(contract_id)) => {
                self.get_contract_details(registry_id, contract_id).await
            }
            (_, None) => Err(RegistryError::MissingParameter("contract_id")),
        }
    }

    async fn get_contracts(&self, registry_id: &str) -> Result<Value, RegistryError> {
        let document = self.read(registry_id, "getContracts", ContractParams::new()).await?;
        let contracts = match document {
            Value::Array(items) => Value::Array(items),
            other => return Err(RegistryError::Decode(format!("expected array, got {}", other))),
        };
        Ok(json!({
            "contracts": contracts,
            "registry_id": registry_id,
        }))
    }

    async fn register_contract(
        &self,
        registry_id: &str,
        contract_id: &str,
        metadata: Option<&Value>,
    ) -> Result<Value, RegistryError> {
        let metadata = metadata.cloned().unwrap_or_else(|| json!({}));
        let params = ContractParams::new()
            .with("contractId", ParamValue::String(contract_id.to_string()))
            .with("metadata", ParamValue::String(metadata.to_string()));
        let execution = self
            .session
            .execute_function(registry_id, "registerContract", &params, self.gas)
            .await?;

        tracing::info!(
            registry_id = %registry_id,
            contract_id = %contract_id,
            transaction_id = %execution.transaction_id,
            "contract registered"
        );
        Ok(json!({
            "status": "registered",
            "contract_id": contract_id,
            "registry_id": registry_id,
            "metadata": metadata,
            "transaction_id": execution.transaction_id,
        }))
    }

    async fn get_contract_details(
        &self,
        registry_id: &str,
        contract_id: &str,
    ) -> Result<Value, RegistryError> {
        let params = ContractParams::new()
            .with("contractId", ParamValue::String(contract_id.to_string()));
        let mut entry = self.read(registry_id, "getContract", params).await?;
        match entry.as_object_mut() {
            Some(fields) => {
                fields.insert("registry_id".to_string(), Value::String(registry_id.to_string()));
            }
            None => return Err(RegistryError::Decode(format!("expected object, got {}", entry))),
        }
        Ok(entry)
    }

    /// Local call returning one ABI `string` holding a JSON document
    async fn read(
        &self,
        registry_id: &str,
        function: &str,
        params: ContractParams,
    ) -> Result<Value, RegistryError> {
        let result = self
            .session
            .call_function(registry_id, function, &params, self.gas)
            .await?;
        let text = decode_string(&result.result)?;
        serde_json::from_str(&text).map_err(|e| RegistryError::Decode(e.to_string()))
    }
}
