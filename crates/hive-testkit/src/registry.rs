//! Registry contract stub
//!
//! Behaves like the on-chain contract registry: `registerContract(string,string)`
//! stores an entry, `getContracts()` and `getContract(string)` return JSON
//! documents ABI-encoded as a single `string`.

use hive_ledger::abi::{decode_string_args, encode_params, selector};
use hive_ledger::{ParamValue, Status};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::ledger::ContractLogic;

pub const REGISTER_SIGNATURE: &str = "registerContract(string,string)";
pub const LIST_SIGNATURE: &str = "getContracts()";
pub const DETAILS_SIGNATURE: &str = "getContract(string)";

/// In-memory registry contract state
#[derive(Default)]
pub struct RegistryContract {
    entries: RwLock<IndexMap<String, Value>>,
}

impl RegistryContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered contracts
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn split(call_data: &[u8]) -> Result<([u8; 4], &[u8]), Status> {
        if call_data.len() < 4 {
            return Err(Status::ContractRevertExecuted);
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&call_data[..4]);
        Ok((sel, &call_data[4..]))
    }

    fn encode_json(value: &Value) -> Vec<u8> {
        encode_params(&[&ParamValue::String(value.to_string())])
    }
}

impl ContractLogic for RegistryContract {
    fn execute(&self, call_data: &[u8], caller: &str) -> Result<Vec<u8>, Status> {
        let (sel, args) = Self::split(call_data)?;
        if sel != selector(REGISTER_SIGNATURE) {
            return Err(Status::ContractRevertExecuted);
        }
        let decoded = decode_string_args(args, 2).map_err(|_| Status::ContractRevertExecuted)?;
        let metadata: Value = serde_json::from_str(&decoded[1]).unwrap_or(Value::Null);
        let entry = json!({
            "id": decoded[0],
            "owner": caller,
            "metadata": metadata,
        });
        self.entries.write().insert(decoded[0].clone(), entry);
        Ok(Vec::new())
    }

    fn call(&self, call_data: &[u8]) -> Result<Vec<u8>, Status> {
        let (sel, args) = Self::split(call_data)?;
        if sel == selector(LIST_SIGNATURE) {
            let all: Vec<Value> = self.entries.read().values().cloned().collect();
            return Ok(Self::encode_json(&Value::Array(all)));
        }
        if sel == selector(DETAILS_SIGNATURE) {
            let decoded = decode_string_args(args, 1).map_err(|_| Status::ContractRevertExecuted)?;
            let entry = self.entries.read().get(&decoded[0]).cloned();
            return match entry {
                Some(entry) => Ok(Self::encode_json(&entry)),
                None => Err(Status::ContractRevertExecuted),
            };
        }
        Err(Status::ContractRevertExecuted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_ledger::abi::decode_string;
    use hive_ledger::{ContractParams, FunctionEncoder};

    #[test]
    fn test_register_then_list() {
        let registry = RegistryContract::new();
        let encoder = FunctionEncoder::new();
        let params = ContractParams::new()
            .with("contractId", ParamValue::String("0.0.5000".into()))
            .with("metadata", ParamValue::String(r#"{"name":"Token"}"#.into()));
        registry
            .execute(&encoder.encode_call("registerContract", &params), "0.0.1001")
            .unwrap();
        assert_eq!(registry.len(), 1);

        let listed = registry
            .call(&encoder.encode_call("getContracts", &ContractParams::new()))
            .unwrap();
        let parsed: Value = serde_json::from_str(&decode_string(&listed).unwrap()).unwrap();
        assert_eq!(parsed[0]["id"], "0.0.5000");
        assert_eq!(parsed[0]["owner"], "0.0.1001");
        assert_eq!(parsed[0]["metadata"]["name"], "Token");
    }

    #[test]
    fn test_unknown_selector_reverts() {
        let registry = RegistryContract::new();
        assert_eq!(registry.call(&[1, 2, 3, 4]), Err(Status::ContractRevertExecuted));
        assert_eq!(registry.call(&[1]), Err(Status::ContractRevertExecuted));
    }
}
