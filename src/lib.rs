//! DeFi bridge proxy client
//!
//! Encodes `convert` / `finalise` calls for bridges sitting behind the proxy
//! contract, submits them over EVM JSON-RPC and decodes the completion event.

pub mod abi;
pub mod asset;
pub mod config;
pub mod error;
pub mod event;
pub mod evm_client;
pub mod proxy;

// Re-export public types for convenience
pub use asset::{AssetDescriptor, AssetKind};
pub use config::BridgeClientConfig;
pub use error::BridgeError;
pub use event::{DecodedEvent, EventAbi, DEFAULT_COMPLETION_EVENT};
pub use evm_client::{EvmClient, EvmLog, TransactionReceipt};
pub use proxy::{BridgeCallRequest, BridgeCallResult, DefiBridgeProxy, SendTxOptions};
