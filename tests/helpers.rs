//! Shared test helpers for bridge client tests
//!
//! This module provides constants, config builders and JSON-RPC mock helpers.

#![allow(dead_code)]

use defi_bridge_client::config::{BridgeClientConfig, EvmChainConfig, ProxyConfig, TransactionConfig};
use defi_bridge_client::{EventAbi, DEFAULT_COMPLETION_EVENT};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Dummy proxy contract address (emitter of the completion event)
pub const DUMMY_PROXY_ADDR: &str = "0x00000000000000000000000000000000000000a1";

/// Dummy unlocked sender account
pub const DUMMY_SENDER_ADDR: &str = "0x00000000000000000000000000000000000000b2";

/// Dummy bridge contract address
pub const DUMMY_BRIDGE_ADDR: &str = "0x00000000000000000000000000000000000000c3";

/// Mainnet DAI
pub const DAI_ADDR: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

/// Mainnet DPI (a SetToken)
pub const DPI_ADDR: &str = "0x1494ca1f11d487c2bbe4543e90080aeba4ba3c2b";

/// Mainnet UNI
pub const UNI_ADDR: &str = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";

/// Dummy transaction hash (64 hex characters)
pub const DUMMY_TX_HASH: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000d4";

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

// ============================================================================
// CONFIG
// ============================================================================

/// Config pointing at `rpc_url` with short polling so timeouts stay fast
pub fn build_test_config(rpc_url: &str) -> BridgeClientConfig {
    BridgeClientConfig {
        chain: EvmChainConfig {
            name: "test-evm".to_string(),
            rpc_url: rpc_url.to_string(),
            chain_id: 31337,
        },
        proxy: ProxyConfig {
            address: DUMMY_PROXY_ADDR.to_string(),
            sender: DUMMY_SENDER_ADDR.to_string(),
            completion_event: DEFAULT_COMPLETION_EVENT.to_string(),
        },
        transaction: TransactionConfig {
            receipt_poll_interval_ms: 10,
            receipt_timeout_ms: 300,
            gas_limit: None,
            gas_price: None,
        },
    }
}

// ============================================================================
// LOG AND RECEIPT BUILDERS
// ============================================================================

/// Left-pads a 0x address to a 32-byte topic
pub fn pad_address(address: &str) -> String {
    format!("0x{:0>64}", address.strip_prefix("0x").unwrap_or(address))
}

/// One ABI word as 64 hex characters
pub fn word(value: u128) -> String {
    format!("{:064x}", value)
}

pub fn completion_topic() -> String {
    EventAbi::parse(DEFAULT_COMPLETION_EVENT).unwrap().topic_hex()
}

/// Completion event log as emitted by the proxy
pub fn completion_log(
    emitter: &str,
    bridge: &str,
    output_value_a: u128,
    output_value_b: u128,
    is_async: bool,
) -> Value {
    json!({
        "address": emitter,
        "topics": [completion_topic(), pad_address(bridge)],
        "data": format!(
            "0x{}{}{}",
            word(output_value_a),
            word(output_value_b),
            word(is_async as u128)
        ),
        "blockNumber": "0x10",
        "transactionHash": DUMMY_TX_HASH,
        "logIndex": "0x1"
    })
}

/// ERC20 Transfer log emitted by `token`
pub fn transfer_log(token: &str, from: &str, to: &str, amount: u128) -> Value {
    json!({
        "address": token,
        "topics": [TRANSFER_TOPIC, pad_address(from), pad_address(to)],
        "data": format!("0x{}", word(amount)),
        "blockNumber": "0x10",
        "transactionHash": DUMMY_TX_HASH,
        "logIndex": "0x0"
    })
}

pub fn receipt_json(status: &str, logs: Vec<Value>) -> Value {
    json!({
        "transactionHash": DUMMY_TX_HASH,
        "status": status,
        "blockNumber": "0x10",
        "gasUsed": "0x1e8480",
        "logs": logs
    })
}

// ============================================================================
// MOCK SERVER HELPERS
// ============================================================================

/// Mount a successful JSON-RPC response for `rpc_method`
pub async fn mount_result(mock_server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": result
        })))
        .mount(mock_server)
        .await;
}

/// Mount a JSON-RPC error response for `rpc_method`
pub async fn mount_error(
    mock_server: &MockServer,
    rpc_method: &str,
    code: i64,
    message: &str,
    data: Option<Value>,
) {
    let mut error = json!({ "code": code, "message": message });
    if let Some(data) = data {
        error["data"] = data;
    }
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": error
        })))
        .mount(mock_server)
        .await;
}

/// Mount eth_sendTransaction returning DUMMY_TX_HASH and a receipt for it
pub async fn mount_transaction(mock_server: &MockServer, receipt: Value) {
    mount_result(mock_server, "eth_sendTransaction", json!(DUMMY_TX_HASH)).await;
    mount_result(mock_server, "eth_getTransactionReceipt", receipt).await;
}

/// Revert payload for `Error(string)`
pub fn error_string_data(reason: &str) -> String {
    let bytes = reason.as_bytes();
    let padded_len = (bytes.len() + 31) / 32 * 32;
    let mut body = hex::encode(bytes);
    body.push_str(&"0".repeat((padded_len - bytes.len()) * 2));
    format!("0x08c379a0{}{}{}", word(32), word(bytes.len() as u128), body)
}

/// JSON bodies of every request the mock server received, in order
pub async fn received_bodies(mock_server: &MockServer) -> Vec<Value> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}
