use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::blockchain::client::ChainClient;
use crate::config::RpcConfig;
use crate::error::ChainError;
use crate::logging::LogContext;
use crate::models::chain::quantity;
use crate::models::{Block, CallRequest, Receipt};

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC client for an EVM node over HTTP(S)
pub struct RpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
    receipt_poll_interval: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: String, timeout_seconds: u64, receipt_poll_interval: Duration) -> Result<Self, ChainError> {
        LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", serde_json::json!(endpoint))
            .with_metadata("timeout_seconds", serde_json::json!(timeout_seconds))
            .info("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout_seconds,
            receipt_poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, ChainError> {
        Self::new(
            config.endpoint.clone(),
            config.timeout_seconds,
            Duration::from_millis(config.receipt_poll_interval_ms),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request. A JSON `null` result comes back as `Value::Null`;
    /// callers decide what absence means.
    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", serde_json::json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout { seconds: self.timeout_seconds }
                } else if e.is_connect() {
                    ChainError::Transport(e.to_string())
                } else {
                    ChainError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await?;
        let rpc_response: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| ChainError::InvalidResponse(format!("{} returned unparseable body: {}", method, e)))?;

        if let Some(error) = rpc_response.error {
            return Err(ChainError::Rpc { code: error.code, message: error.message });
        }

        Ok(rpc_response.result)
    }

    async fn request_quantity(&self, method: &str, params: Vec<Value>) -> Result<u64, ChainError> {
        let value = self.make_request(method, params).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse(format!("{} result is not a string", method)))?;
        quantity::parse(hex).map_err(ChainError::InvalidResponse)
    }

    async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>, ChainError> {
        let value = self
            .make_request("eth_getTransactionReceipt", vec![Value::String(tx_hash.to_string())])
            .await?;

        if value.is_null() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ChainError::InvalidResponse(format!("Failed to parse receipt {}: {}", tx_hash, e)))
    }
}

/// Node errors on estimation and submission mean the transaction itself was refused
fn into_rejected(error: ChainError) -> ChainError {
    match error {
        ChainError::Rpc { code, message } => ChainError::Rejected { code, message },
        other => other,
    }
}

fn parse_hex_to_u128(hex_str: &str) -> Result<u128, ChainError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u128::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("Failed to parse hex '{}' to u128: {}", hex_str, e)))
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        self.request_quantity("eth_blockNumber", vec![]).await
    }

    async fn get_block(&self, number: u64) -> Result<Block, ChainError> {
        let params = vec![
            Value::String(format!("0x{:x}", number)),
            Value::Bool(true), // Include full transaction objects
        ];

        let value = self.make_request("eth_getBlockByNumber", params).await?;
        if value.is_null() {
            return Err(ChainError::NotFound { what: format!("block {}", number) });
        }

        let block: Block = serde_json::from_value(value)
            .map_err(|e| ChainError::InvalidResponse(format!("Failed to parse block {}: {}", number, e)))?;

        LogContext::new("rpc_client", "get_block")
            .with_block_number(number)
            .with_metadata("transaction_count", serde_json::json!(block.transactions.len()))
            .debug(&format!("Retrieved block {} with {} transactions", number, block.transactions.len()));

        Ok(block)
    }

    async fn account_nonce(&self, address: Address) -> Result<u64, ChainError> {
        let params = vec![Value::String(address.to_string()), Value::String("pending".to_string())];
        self.request_quantity("eth_getTransactionCount", params).await
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let value = self.make_request("eth_gasPrice", vec![]).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_gasPrice result is not a string".to_string()))?;
        parse_hex_to_u128(hex)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainError> {
        let params = vec![serde_json::to_value(call)
            .map_err(|e| ChainError::InvalidResponse(format!("Failed to encode call: {}", e)))?];
        self.request_quantity("eth_estimateGas", params).await.map_err(into_rejected)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, ChainError> {
        let value = self
            .make_request("eth_sendRawTransaction", vec![Value::String(raw.to_string())])
            .await
            .map_err(into_rejected)?;

        let hash = value
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_sendRawTransaction result is not a string".to_string()))?;
        hash.parse()
            .map_err(|_| ChainError::InvalidResponse(format!("Invalid transaction hash: {}", hash)))
    }

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<Option<Receipt>, ChainError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                return Ok(Some(receipt));
            }

            if Instant::now() + self.receipt_poll_interval > deadline {
                LogContext::new("rpc_client", "wait_for_receipt")
                    .with_transaction_hash(&tx_hash.to_string())
                    .debug(&format!("No receipt within {}s", timeout.as_secs()));
                return Ok(None);
            }

            sleep(self.receipt_poll_interval).await;
        }
    }
}
