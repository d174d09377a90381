//! Configuration Management Module
//!
//! This module handles loading and validating configuration for the bridge client.
//! Configuration includes the chain endpoint, the proxy contract and receipt polling.

use serde::{Deserialize, Serialize};

use crate::abi;
use crate::error::BridgeError;
use crate::event::{AbiType, EventAbi, DEFAULT_COMPLETION_EVENT};
use crate::proxy::SendTxOptions;

/// Environment variable overriding the default config path
pub const CONFIG_PATH_ENV: &str = "BRIDGE_CLIENT_CONFIG_PATH";

/// Default config path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/bridge_client.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
///
/// ```toml
/// [chain]
/// name = "mainnet-fork"
/// rpc_url = "http://127.0.0.1:8545"
/// chain_id = 1
///
/// [proxy]
/// address = "0x..."
/// sender = "0x..."
///
/// [transaction]
/// receipt_timeout_ms = 60000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeClientConfig {
    pub chain: EvmChainConfig,
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub transaction: TransactionConfig,
}

/// Configuration for an EVM-compatible chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// RPC endpoint URL for EVM chain communication
    pub rpc_url: String,
    /// Chain ID (e.g., 1 for a mainnet fork)
    pub chain_id: u64,
}

/// The deployed proxy contract and the account that calls it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Address of the proxy contract
    pub address: String,
    /// Account the node has unlocked; all transactions are sent from it
    pub sender: String,
    /// Completion event signature, with parameter names
    #[serde(default = "default_completion_event")]
    pub completion_event: String,
}

/// Submission and confirmation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// How long to wait for inclusion before giving up (the tx is not retracted)
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Gas price ceiling in wei, decimal string (values can exceed u64)
    #[serde(default)]
    pub gas_price: Option<String>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_ms: default_receipt_timeout_ms(),
            gas_limit: None,
            gas_price: None,
        }
    }
}

impl TransactionConfig {
    /// Configured defaults for every call
    pub fn send_options(&self) -> Result<SendTxOptions, BridgeError> {
        let gas_price = self
            .gas_price
            .as_deref()
            .map(abi::parse_u256)
            .transpose()
            .map_err(|e| BridgeError::Config(format!("Invalid transaction.gas_price: {}", e)))?;
        Ok(SendTxOptions {
            gas_price,
            gas_limit: self.gas_limit,
        })
    }
}

fn default_completion_event() -> String {
    DEFAULT_COMPLETION_EVENT.to_string()
}

fn default_receipt_poll_interval_ms() -> u64 {
    500
}

fn default_receipt_timeout_ms() -> u64 {
    120_000
}

impl BridgeClientConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Path priority: `path` argument, then `BRIDGE_CLIENT_CONFIG_PATH`, then
    /// `config/bridge_client.toml`. The loaded configuration is validated.
    pub fn load_from_path(path: Option<&str>) -> Result<Self, BridgeError> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(BridgeError::Config(format!(
                "Configuration file '{}' not found",
                config_path
            )));
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            BridgeError::Config(format!("Failed to read '{}': {}", config_path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Loads configuration from the default location (see [`Self::load_from_path`])
    pub fn load() -> Result<Self, BridgeError> {
        Self::load_from_path(None)
    }

    /// Parses and validates a TOML document
    pub fn from_toml(content: &str) -> Result<Self, BridgeError> {
        let config: BridgeClientConfig = toml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - RPC URL is set
    /// - Proxy and sender addresses are 20-byte hex
    /// - Poll interval is positive and not longer than the receipt timeout
    /// - The completion event declares `outputValueA`, `outputValueB` and `isAsync`
    /// - Gas price, if set, is a decimal number
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(BridgeError::Config("chain.rpc_url must not be empty".to_string()));
        }

        abi::parse_address(&self.proxy.address)
            .map_err(|e| BridgeError::Config(format!("Invalid proxy.address: {}", e)))?;
        abi::parse_address(&self.proxy.sender)
            .map_err(|e| BridgeError::Config(format!("Invalid proxy.sender: {}", e)))?;

        let tx = &self.transaction;
        if tx.receipt_poll_interval_ms == 0 {
            return Err(BridgeError::Config(
                "transaction.receipt_poll_interval_ms must be positive".to_string(),
            ));
        }
        if tx.receipt_timeout_ms < tx.receipt_poll_interval_ms {
            return Err(BridgeError::Config(format!(
                "transaction.receipt_timeout_ms ({}) is shorter than the poll interval ({})",
                tx.receipt_timeout_ms, tx.receipt_poll_interval_ms
            )));
        }
        tx.send_options()?;

        let event = EventAbi::parse(&self.proxy.completion_event)
            .map_err(|e| BridgeError::Config(format!("Invalid proxy.completion_event: {}", e)))?;
        for (field, expected) in [
            ("outputValueA", "uint"),
            ("outputValueB", "uint"),
            ("isAsync", "bool"),
        ] {
            let ok = match event.param(field).map(|p| p.ty) {
                Some(AbiType::Uint(_)) => expected == "uint",
                Some(AbiType::Bool) => expected == "bool",
                _ => false,
            };
            if !ok {
                return Err(BridgeError::Config(format!(
                    "proxy.completion_event must declare {} {}",
                    expected, field
                )));
            }
        }

        Ok(())
    }
}
