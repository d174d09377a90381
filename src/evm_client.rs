//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible blockchain nodes
//! via their JSON-RPC API. It submits transactions from an account the node has
//! unlocked, waits for receipts and performs read-only calls.

use ethereum_types::{Address, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::abi;
use crate::error::BridgeError;

/// ERC20 `balanceOf(address)`
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    #[serde(default)]
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    /// Revert payload, either a hex string or an object with a `data` field
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// EVM event log entry
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: String,
    /// Array of topics (indexed event parameters)
    pub topics: Vec<String>,
    /// Event data (non-indexed parameters)
    pub data: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
    #[serde(rename = "logIndex", default)]
    pub log_index: Option<String>,
}

impl EvmLog {
    /// Whether this log was emitted by `address`. Unparseable addresses never match.
    pub fn is_from(&self, address: &Address) -> bool {
        abi::parse_address(&self.address)
            .map(|emitter| emitter == *address)
            .unwrap_or(false)
    }
}

/// Transaction receipt returned by eth_getTransactionReceipt
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// Transaction status ("0x1" = success, "0x0" = reverted)
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    #[serde(rename = "gasUsed", default)]
    pub gas_used: Option<String>,
    #[serde(default)]
    pub logs: Vec<EvmLog>,
}

impl TransactionReceipt {
    /// True when the receipt reports status 0 (execution reverted)
    pub fn reverted(&self) -> bool {
        matches!(
            self.status.as_deref().map(abi::parse_quantity),
            Some(Ok(status)) if status.is_zero()
        )
    }
}

/// Transaction object for eth_sendTransaction / eth_call
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(rename = "gasPrice", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

impl TransactionRequest {
    pub fn new(from: Option<&Address>, to: &Address, data: &[u8]) -> Self {
        Self {
            from: from.map(abi::format_address),
            to: abi::format_address(to),
            data: abi::to_hex(data),
            ..Default::default()
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        self.gas = gas_limit.map(|gas| abi::format_quantity(U256::from(gas)));
        self
    }

    pub fn with_gas_price(mut self, gas_price: Option<U256>) -> Self {
        self.gas_price = gas_price.map(abi::format_quantity);
        self
    }
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible blockchain nodes via JSON-RPC
#[derive(Debug, Clone)]
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    base_url: String,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL
    ///
    /// # Arguments
    ///
    /// * `node_url` - Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    pub fn new(node_url: &str) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
        })
    }

    /// Sends one JSON-RPC request and returns its (possibly null) result.
    ///
    /// Transport failures become `Network`, node errors are classified by
    /// [`classify_rpc_error`]. A body that arrived but is not a JSON-RPC
    /// response is `Rpc` (carrying the HTTP status) when the status is not
    /// 2xx, otherwise `ProtocolViolation`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, BridgeError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        debug!("Sending {} request to {}", method, self.base_url);

        let http_response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;
        let status = http_response.status();
        let body = http_response.text().await?;

        // JSON-RPC errors may arrive with a non-2xx status
        let response: JsonRpcResponse<T> = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(e) if !status.is_success() => {
                warn!("HTTP {} from {} on {}", status, self.base_url, method);
                return Err(BridgeError::Rpc {
                    code: status.as_u16() as i64,
                    message: format!("HTTP {}: {}", status, body_excerpt(&body, e)),
                });
            }
            Err(e) => {
                return Err(BridgeError::ProtocolViolation(format!(
                    "Invalid JSON-RPC response to {}: {}",
                    method,
                    body_excerpt(&body, e)
                )))
            }
        };

        if let Some(error) = response.error {
            warn!(
                "JSON-RPC error from {} on {}: {} (code: {})",
                self.base_url, method, error.message, error.code
            );
            return Err(classify_rpc_error(error));
        }

        Ok(response.result)
    }

    /// Like [`EvmClient::request`], but a null result is a protocol violation
    async fn request_some<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, BridgeError> {
        self.request(method, params).await?.ok_or_else(|| {
            BridgeError::ProtocolViolation(format!("No result in {} response", method))
        })
    }

    /// Gets the current block number
    pub async fn get_block_number(&self) -> Result<u64, BridgeError> {
        let block_hex: String = self.request_some("eth_blockNumber", vec![]).await?;
        let block_number = abi::parse_quantity(&block_hex)?;
        if block_number.bits() > 64 {
            return Err(BridgeError::ProtocolViolation(format!(
                "block number {} does not fit in u64",
                block_hex
            )));
        }
        Ok(block_number.low_u64())
    }

    /// Lists the accounts the node manages (unlocked dev accounts)
    pub async fn get_accounts(&self) -> Result<Vec<Address>, BridgeError> {
        let accounts: Vec<String> = self.request("eth_accounts", vec![]).await?.unwrap_or_default();
        accounts
            .iter()
            .map(|account| {
                abi::parse_address(account).map_err(|_| {
                    BridgeError::ProtocolViolation(format!("invalid account '{}'", account))
                })
            })
            .collect()
    }

    /// Native coin balance (wei) of `address` at the latest block
    pub async fn get_balance(&self, address: &Address) -> Result<U256, BridgeError> {
        let balance_hex: String = self
            .request_some(
                "eth_getBalance",
                vec![
                    serde_json::json!(abi::format_address(address)),
                    serde_json::json!("latest"),
                ],
            )
            .await?;
        abi::parse_quantity(&balance_hex)
    }

    /// Read-only call against the latest block. No gas is spent and no state changes.
    ///
    /// A reverted call surfaces as `Revert`, like a reverted transaction.
    pub async fn call(
        &self,
        from: Option<&Address>,
        to: &Address,
        data: &[u8],
    ) -> Result<Vec<u8>, BridgeError> {
        self.call_at(from, to, data, "latest").await
    }

    /// Read-only call against `block` (a hex block number or a tag such as "latest")
    pub async fn call_at(
        &self,
        from: Option<&Address>,
        to: &Address,
        data: &[u8],
        block: &str,
    ) -> Result<Vec<u8>, BridgeError> {
        let tx = serde_json::to_value(TransactionRequest::new(from, to, data))
            .map_err(|e| BridgeError::InvalidInput(format!("Failed to serialize call: {}", e)))?;
        let result: String = self
            .request_some("eth_call", vec![tx, serde_json::json!(block)])
            .await?;
        abi::decode_hex(&result)
    }

    /// ERC20 token balance of `owner`
    pub async fn erc20_balance_of(
        &self,
        token: &Address,
        owner: &Address,
    ) -> Result<U256, BridgeError> {
        let data = abi::encode_call(
            abi::selector(BALANCE_OF_SIGNATURE),
            &[abi::encode_address(owner)],
        );
        let output = self.call(None, token, &data).await?;
        let words = abi::split_words(&output)?;
        match words.as_slice() {
            [word] => Ok(abi::decode_u256(word)),
            _ => Err(BridgeError::ProtocolViolation(format!(
                "balanceOf on {} returned {} words, expected 1",
                abi::format_address(token),
                words.len()
            ))),
        }
    }

    /// Submits a transaction signed by the node (eth_sendTransaction).
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Transaction hash
    /// * `Err(BridgeError::Revert)` - The node rejected the transaction during execution
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, BridgeError> {
        let params = vec![serde_json::to_value(tx).map_err(|e| {
            BridgeError::InvalidInput(format!("Failed to serialize transaction: {}", e))
        })?];
        let hash: String = self.request_some("eth_sendTransaction", params).await?;
        info!("Submitted transaction {} to {}", hash, tx.to);
        Ok(hash)
    }

    /// Queries a transaction receipt by hash using eth_getTransactionReceipt
    ///
    /// # Returns
    ///
    /// * `Ok(Some(receipt))` - The transaction is included
    /// * `Ok(None)` - Pending or unknown
    pub async fn get_transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, BridgeError> {
        let hash = normalize_hash(hash);
        self.request("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await
    }

    /// Polls for a receipt until it is available or `timeout` elapses.
    ///
    /// A timeout only stops waiting; the submitted transaction is not retracted
    /// and may still be included.
    pub async fn wait_for_receipt(
        &self,
        hash: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TransactionReceipt, BridgeError> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.get_transaction_receipt(hash).await? {
                debug!(
                    "Receipt for {} available after {}ms",
                    hash,
                    started.elapsed().as_millis()
                );
                return Ok(receipt);
            }
            if started.elapsed() + poll_interval > timeout {
                return Err(BridgeError::ReceiptTimeout {
                    tx_hash: normalize_hash(hash),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Returns the base URL of this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

/// Maps a JSON-RPC error to a revert when the node says execution reverted,
/// otherwise to a plain RPC error.
///
/// Nodes disagree on the format: anvil/geth use code 3 with the payload in
/// `data`, hardhat uses a generic code and puts the reason in the message.
fn classify_rpc_error(error: JsonRpcError) -> BridgeError {
    let is_revert = error.code == 3 || error.message.to_lowercase().contains("revert");
    if !is_revert {
        return BridgeError::Rpc {
            code: error.code,
            message: error.message,
        };
    }

    let reason = error
        .data
        .as_ref()
        .and_then(revert_data)
        .and_then(|data| abi::decode_revert_reason(&data))
        .or_else(|| reason_from_message(&error.message));

    BridgeError::Revert {
        reason,
        tx_hash: None,
    }
}

fn revert_data(value: &serde_json::Value) -> Option<Vec<u8>> {
    let hex_str = match value {
        serde_json::Value::String(s) => s.as_str(),
        serde_json::Value::Object(map) => map.get("data")?.as_str()?,
        _ => return None,
    };
    abi::decode_hex(hex_str).ok()
}

fn reason_from_message(message: &str) -> Option<String> {
    if let Some(rest) = message.split("reverted with reason string '").nth(1) {
        return rest.split('\'').next().map(|s| s.to_string());
    }
    if let Some(rest) = message.split("execution reverted: ").nth(1) {
        let reason = rest.trim();
        if !reason.is_empty() {
            return Some(reason.to_string());
        }
    }
    None
}

fn body_excerpt(body: &str, error: serde_json::Error) -> String {
    let excerpt: String = body.chars().take(200).collect();
    if excerpt.trim().is_empty() {
        format!("empty body ({})", error)
    } else {
        format!("{} ({})", excerpt.trim(), error)
    }
}

/// Ensures a 0x prefix on a transaction hash
fn normalize_hash(hash: &str) -> String {
    if hash.starts_with("0x") {
        hash.to_string()
    } else {
        format!("0x{}", hash)
    }
}
