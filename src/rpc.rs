// src/rpc.rs
use alloy::primitives::{keccak256, Address};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Event signatures emitted by the tipping contract. Structurally identical;
/// only the currency differs.
pub const NATIVE_TIP_SIGNATURE: &str = "ETHTipped(address,address,uint256,string)";
pub const TOKEN_TIP_SIGNATURE: &str = "TokensTipped(address,address,uint256,string)";

/// topic0 for an event signature, 0x-prefixed.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// A raw log record as returned by `eth_getLogs`.
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    #[allow(dead_code)]
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,

    #[serde(rename = "blockNumber")]
    pub block_number_hex: String,

    #[serde(rename = "transactionHash")]
    pub tx_hash: String,

    #[serde(rename = "logIndex")]
    pub log_index_hex: String,
}

/// Transport-level failure talking to the log source. A pass that hits one
/// of these is aborted whole; partial data is never surfaced.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rpc request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error: HTTP {0}")]
    Status(StatusCode),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T, TransportError> {
        if let Some(err) = self.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| TransportError::Other("rpc response missing result".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    #[serde(rename = "timestamp")]
    timestamp_hex: String,
}

/// Read-only view of the tipping contract's event history.
///
/// Log queries always cover the full range (earliest to latest); callers
/// run from-scratch aggregation passes, not incremental indexing.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    /// All logs for one event signature over the contract's full history.
    async fn get_logs(&self, event_signature: &str) -> Result<Vec<Log>, TransportError>;

    /// Unix timestamp of a block.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, TransportError>;
}

/// `LogSource` over plain JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpLogSource {
    client: Client,
    rpc_url: String,
    contract: Address,
}

impl HttpLogSource {
    pub fn new(rpc_url: String, contract: Address) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            rpc_url,
            contract,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        payload: serde_json::Value,
    ) -> Result<T, TransportError> {
        let resp = self.client.post(&self.rpc_url).json(&payload).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(TransportError::Status(resp.status()));
        }
        let text = resp.text().await?;
        debug!("📩 Raw rpc response: {}", text);

        let parsed: RpcResponse<T> = serde_json::from_str(&text)?;
        parsed.into_result()
    }
}

impl LogSource for HttpLogSource {
    async fn get_logs(&self, event_signature: &str) -> Result<Vec<Log>, TransportError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getLogs",
            "params": [{
                "fromBlock": "earliest",
                "toBlock": "latest",
                "address": self.contract.to_string(),
                "topics": [event_topic(event_signature)]
            }]
        });

        info!(
            "📡 Sending eth_getLogs → {} ({})",
            self.rpc_url, event_signature
        );

        self.call(payload).await
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, TransportError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBlockByNumber",
            "params": [format!("0x{:x}", block_number), false]
        });

        debug!("📡 Sending eth_getBlockByNumber → block {}", block_number);

        let header: BlockHeader = self.call(payload).await?;
        u64::from_str_radix(header.timestamp_hex.trim_start_matches("0x"), 16)
            .map_err(|e| TransportError::Other(format!("bad block timestamp: {}", e)))
    }
}
