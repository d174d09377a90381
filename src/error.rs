//! Error types
//!
//! Every failure a bridge call can end in is one of these variants. Reverts and
//! protocol violations are kept apart so a caller never mistakes "nothing
//! happened on-chain" for "the bridge legitimately produced nothing".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The transaction (or call) was rejected by chain execution. No state changed.
    #[error("Transaction reverted{}{}", tx_suffix(.tx_hash), reason_suffix(.reason))]
    Revert {
        reason: Option<String>,
        tx_hash: Option<String>,
    },

    /// The node answered, but not in the shape this client expects from the proxy contract.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The connection to the node failed. Never retried here.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Gave up waiting for a receipt. The transaction may still be included later.
    #[error("Timed out after {waited_ms}ms waiting for receipt of {tx_hash}")]
    ReceiptTimeout { tx_hash: String, waited_ms: u64 },

    /// JSON-RPC error that is not a revert, or a non-2xx HTTP status without a JSON-RPC body
    #[error("JSON-RPC error: {message} (code: {code})")]
    Rpc { code: i64, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn is_revert(&self) -> bool {
        matches!(self, BridgeError::Revert { .. })
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, BridgeError::ProtocolViolation(_))
    }

    /// Errors a caller may reasonably retry after checking the sender's nonce.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            BridgeError::Network(_) | BridgeError::ReceiptTimeout { .. }
        )
    }

    /// Revert reason string, if the node supplied one
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            BridgeError::Revert { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}

fn tx_suffix(tx_hash: &Option<String>) -> String {
    tx_hash
        .as_ref()
        .map(|hash| format!(" (tx {})", hash))
        .unwrap_or_default()
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|reason| format!(": {}", reason))
        .unwrap_or_default()
}
