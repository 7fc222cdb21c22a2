//! Contract deployment from an uploaded file
//!
//! Before creating the contract the deployer confirms the ledger file holds
//! exactly the uploaded number of bytes. Any failure is wrapped in a
//! [`DeploymentError`] carrying the file id; the file itself is left in
//! place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi::ContractParams;
use crate::error::{DeployFailure, DeploymentError};
use crate::session::LedgerSession;
use crate::uploader::LedgerFile;

/// Default gas limit for contract creation
pub const DEFAULT_GAS_LIMIT: u64 = 4_000_000;

/// What to deploy and how
#[derive(Clone, Debug, PartialEq)]
pub struct DeployRequest {
    /// Bytecode held by the uploaded file
    pub bytecode: Vec<u8>,
    /// Contract ABI (JSON array)
    pub abi: Value,
    /// Constructor parameters in declaration order
    pub constructor_params: ContractParams,
    pub gas: u64,
    /// Initial contract balance in tinybars
    pub initial_balance: u64,
}

impl DeployRequest {
    /// Request with default gas and zero balance
    pub fn new(bytecode: Vec<u8>, abi: Value) -> Self {
        Self {
            bytecode,
            abi,
            constructor_params: ContractParams::new(),
            gas: DEFAULT_GAS_LIMIT,
            initial_balance: 0,
        }
    }

    pub fn with_params(mut self, params: ContractParams) -> Self {
        self.constructor_params = params;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_initial_balance(mut self, initial_balance: u64) -> Self {
        self.initial_balance = initial_balance;
        self
    }
}

/// Immutable record of one deployment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub contract_id: String,
    pub file_id: String,
    #[serde(with = "hex_bytes")]
    pub bytecode: Vec<u8>,
    pub abi: Value,
    pub constructor_args: ContractParams,
    pub deployer: String,
    pub gas_used: u64,
    pub transaction_id: String,
}

/// Creates contracts from completed ledger files
pub struct ContractDeployer<'a> {
    session: &'a LedgerSession,
}

impl<'a> ContractDeployer<'a> {
    pub fn new(session: &'a LedgerSession) -> Self {
        Self { session }
    }

    /// Deploy the contract whose bytecode `file` holds
    pub async fn deploy(
        &self,
        file: &LedgerFile,
        request: DeployRequest,
    ) -> Result<ContractRecord, DeploymentError> {
        let fail = |cause: DeployFailure| DeploymentError {
            file_id: file.file_id.clone(),
            cause,
        };

        let info = self
            .session
            .file_info(&file.file_id)
            .await
            .map_err(|e| fail(e.into()))?;
        if info.deleted || info.size != file.total_bytes {
            tracing::warn!(
                file_id = %file.file_id,
                expected = file.total_bytes,
                actual = info.size,
                "file does not hold the full artifact"
            );
            return Err(fail(DeployFailure::IncompleteArtifact {
                expected: file.total_bytes,
                actual: if info.deleted { 0 } else { info.size },
            }));
        }

        let creation = self
            .session
            .create_contract(
                &file.file_id,
                request.gas,
                &request.constructor_params,
                request.initial_balance,
            )
            .await
            .map_err(|e| fail(e.into()))?;

        Ok(ContractRecord {
            contract_id: creation.contract_id,
            file_id: file.file_id.clone(),
            bytecode: request.bytecode,
            abi: request.abi,
            constructor_args: request.constructor_params,
            deployer: self.session.account_id().to_string(),
            gas_used: creation.gas_used,
            transaction_id: creation.transaction_id,
        })
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{ParamValue, Uint256};
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request = DeployRequest::new(vec![0x60, 0x80], json!([]));
        assert_eq!(request.gas, 4_000_000);
        assert_eq!(request.initial_balance, 0);
        assert!(request.constructor_params.is_empty());
    }

    #[test]
    fn test_record_json_shape() {
        let record = ContractRecord {
            contract_id: "0.0.900".to_string(),
            file_id: "0.0.800".to_string(),
            bytecode: vec![0x60, 0x80],
            abi: json!([]),
            constructor_args: ContractParams::new()
                .with("supply", ParamValue::UInt256(Uint256::from_u128(10))),
            deployer: "0.0.2".to_string(),
            gas_used: 21000,
            transaction_id: "0.0.2@1.000000001".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["bytecode"], "6080");
        assert_eq!(value["constructorArgs"]["supply"]["value"], "10");
        let back: ContractRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
