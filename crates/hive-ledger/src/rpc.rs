//! JSON-RPC transport
//!
//! Talks to a ledger gateway over HTTP JSON-RPC 2.0. Binary payloads travel
//! base64-encoded. Submissions go to the consensus endpoints, read queries to
//! the mirror endpoints; within each list the transport fails over to the
//! next endpoint on connection errors and remembers the last one that worked.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, Stage, Status, TransportError};
use crate::network::NetworkProfile;
use crate::transaction::{
    ContractCallResult, FileInfo, SignedTransaction, TopicMessage, TransactionId,
    TransactionReceipt,
};
use crate::transport::{LedgerConnector, LedgerTransport};

/// JSON-RPC error code for unknown entities
pub const RPC_NOT_FOUND: i64 = -32004;

/// Gateway method names
pub mod methods {
    pub const SUBMIT_TRANSACTION: &str = "ledger_submitTransaction";
    pub const GET_RECEIPT: &str = "ledger_getTransactionReceipt";
    pub const GET_ACCOUNT_INFO: &str = "ledger_getAccountInfo";
    pub const GET_FILE_CONTENTS: &str = "ledger_getFileContents";
    pub const GET_FILE_INFO: &str = "ledger_getFileInfo";
    pub const GET_TOPIC_MESSAGES: &str = "ledger_getTopicMessages";
    pub const CALL_CONTRACT: &str = "ledger_callContract";
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct SubmitResult {
    status: Status,
}

#[derive(Deserialize)]
struct ContentsResult {
    contents: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTopicMessage {
    topic_id: String,
    sequence_number: u64,
    consensus_timestamp: chrono::DateTime<chrono::Utc>,
    contents: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCallResult {
    result: String,
    gas_used: u64,
}

fn decode_b64(s: &str) -> Result<Vec<u8>, TransportError> {
    STANDARD
        .decode(s)
        .map_err(|e| TransportError::Decode(format!("base64: {}", e)))
}

/// HTTP JSON-RPC client for one network
pub struct JsonRpcTransport {
    client: reqwest::Client,
    endpoints: Vec<String>,
    mirror_endpoints: Vec<String>,
    current: AtomicUsize,
    current_mirror: AtomicUsize,
    next_request_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Create a transport for a profile
    pub fn new(profile: &NetworkProfile) -> Result<Self, TransportError> {
        if !profile.has_gateway() {
            return Err(TransportError::Unavailable(format!(
                "no ledger gateway configured for {}; set ledger.endpoints to a gateway \
                 serving the ledger_* methods",
                profile.network
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(profile.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let mirror_endpoints = if profile.mirror_endpoints.is_empty() {
            profile.endpoints.clone()
        } else {
            profile.mirror_endpoints.clone()
        };
        Ok(Self {
            client,
            endpoints: profile.endpoints.clone(),
            mirror_endpoints,
            current: AtomicUsize::new(0),
            current_mirror: AtomicUsize::new(0),
            next_request_id: AtomicU64::new(1),
        })
    }

    async fn call<R: DeserializeOwned>(
        &self,
        mirror: bool,
        method: &str,
        params: Value,
    ) -> Result<R, TransportError> {
        let (endpoints, cursor) = if mirror {
            (&self.mirror_endpoints, &self.current_mirror)
        } else {
            (&self.endpoints, &self.current)
        };
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let start = cursor.load(Ordering::Relaxed);
        let mut last_error = None;
        for step in 0..endpoints.len() {
            let index = (start + step) % endpoints.len();
            let endpoint = &endpoints[index];
            let response = match self.client.post(endpoint).json(&request).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("RPC {} to {} failed: {}", method, endpoint, e);
                    last_error = Some(TransportError::Http(e.to_string()));
                    continue;
                }
            };
            if !response.status().is_success() {
                let status = response.status();
                tracing::warn!("RPC {} to {} returned HTTP {}", method, endpoint, status);
                last_error = Some(TransportError::Http(format!("HTTP {}", status)));
                continue;
            }
            cursor.store(index, Ordering::Relaxed);

            let body: RpcResponse = response
                .json()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))?;
            if let Some(err) = body.error {
                return Err(if err.code == RPC_NOT_FOUND {
                    TransportError::NotFound(err.message)
                } else {
                    TransportError::Rpc {
                        code: err.code,
                        message: err.message,
                    }
                });
            }
            let result = body.result.unwrap_or(Value::Null);
            return serde_json::from_value(result)
                .map_err(|e| TransportError::Decode(format!("{}: {}", method, e)));
        }

        Err(last_error
            .unwrap_or_else(|| TransportError::Unavailable("no endpoints".to_string())))
    }
}

#[async_trait]
impl LedgerTransport for JsonRpcTransport {
    async fn submit(&self, transaction: &SignedTransaction) -> Result<Status, TransportError> {
        let bytes = transaction
            .to_bytes()
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        let result: SubmitResult = self
            .call(false, methods::SUBMIT_TRANSACTION, json!([STANDARD.encode(bytes)]))
            .await?;
        Ok(result.status)
    }

    async fn receipt(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<TransactionReceipt>, TransportError> {
        self.call(false, methods::GET_RECEIPT, json!([transaction_id.to_string()]))
            .await
    }

    async fn file_contents(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let result: ContentsResult = self
            .call(true, methods::GET_FILE_CONTENTS, json!([file_id]))
            .await?;
        decode_b64(&result.contents)
    }

    async fn file_info(&self, file_id: &str) -> Result<FileInfo, TransportError> {
        self.call(true, methods::GET_FILE_INFO, json!([file_id])).await
    }

    async fn topic_messages(
        &self,
        topic_id: &str,
        after_sequence: u64,
    ) -> Result<Vec<TopicMessage>, TransportError> {
        let wire: Vec<WireTopicMessage> = self
            .call(
                true,
                methods::GET_TOPIC_MESSAGES,
                json!([topic_id, after_sequence]),
            )
            .await?;
        wire.into_iter()
            .map(|m| {
                Ok(TopicMessage {
                    topic_id: m.topic_id,
                    sequence_number: m.sequence_number,
                    consensus_timestamp: m.consensus_timestamp,
                    contents: decode_b64(&m.contents)?,
                })
            })
            .collect()
    }

    async fn call_function(
        &self,
        contract_id: &str,
        call_data: &[u8],
        gas: u64,
    ) -> Result<ContractCallResult, TransportError> {
        let wire: WireCallResult = self
            .call(
                true,
                methods::CALL_CONTRACT,
                json!([contract_id, STANDARD.encode(call_data), gas]),
            )
            .await?;
        Ok(ContractCallResult {
            result: decode_b64(&wire.result)?,
            gas_used: wire.gas_used,
        })
    }

    fn name(&self) -> &str {
        "json-rpc"
    }
}

/// Opens [`JsonRpcTransport`]s and confirms the operator account exists
#[derive(Clone, Debug, Default)]
pub struct JsonRpcConnector;

#[async_trait]
impl LedgerConnector for JsonRpcConnector {
    async fn connect(
        &self,
        profile: &NetworkProfile,
        account_id: &str,
    ) -> Result<Arc<dyn LedgerTransport>, LedgerError> {
        let transport =
            JsonRpcTransport::new(profile).map_err(LedgerError::transport(Stage::Connect))?;
        let _account: Value = transport
            .call(true, methods::GET_ACCOUNT_INFO, json!([account_id]))
            .await
            .map_err(LedgerError::transport(Stage::Connect))?;
        tracing::info!(
            "Connected to {} at {} as {}",
            profile.network,
            transport.endpoints[0],
            account_id
        );
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_requires_gateway() {
        match JsonRpcTransport::new(&NetworkProfile::testnet()) {
            Err(TransportError::Unavailable(message)) => {
                assert!(message.contains("ledger.endpoints"));
                assert!(message.contains("testnet"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("transport built without a gateway"),
        }
    }

    #[tokio::test]
    async fn test_connect_without_gateway_fails_before_any_request() {
        let err = JsonRpcConnector
            .connect(&NetworkProfile::mainnet(), "0.0.1001")
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("ledger.endpoints"));
    }

    #[test]
    fn test_mirror_falls_back_to_submit_endpoints() {
        let profile =
            NetworkProfile::testnet().with_endpoints(vec!["http://127.0.0.1:7546".to_string()]);
        let transport = JsonRpcTransport::new(&profile).unwrap();
        assert_eq!(transport.mirror_endpoints, profile.endpoints);
    }

    #[test]
    fn test_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 3,
            method: methods::GET_FILE_INFO,
            params: json!(["0.0.10"]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "ledger_getFileInfo");
        assert_eq!(value["params"][0], "0.0.10");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let profile = NetworkProfile::testnet()
            .with_endpoints(vec!["http://127.0.0.1:9".to_string()])
            .with_mirror_endpoints(vec!["http://127.0.0.1:9".to_string()]);
        let transport = JsonRpcTransport::new(&profile).unwrap();
        let err = transport.file_info("0.0.1").await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }
}
