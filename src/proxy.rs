//! DeFi Bridge Proxy
//!
//! Client for the on-chain proxy contract that forwards `convert` / `finalise`
//! calls to a bridge and reports the outcome through a completion event.
//!
//! Every call is one transaction: encode, submit from the configured sender,
//! wait for the receipt, then pick the single completion log emitted by the
//! proxy itself. Token transfer logs and bridge-internal events in the same
//! receipt are ignored.

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::abi::{self, Word};
use crate::asset::AssetDescriptor;
use crate::config::BridgeClientConfig;
use crate::error::BridgeError;
use crate::event::EventAbi;
use crate::evm_client::{EvmClient, TransactionReceipt, TransactionRequest};

const ASSET_TUPLE: &str = "(uint256,address,uint8)";

/// `convert(bridge, inputA, inputB, outputA, outputB, totalInputValue, interactionNonce, auxData)`
pub fn convert_signature() -> String {
    format!(
        "convert(address,{t},{t},{t},{t},uint256,uint256,uint256)",
        t = ASSET_TUPLE
    )
}

/// `finalise(bridge, inputA, inputB, outputA, outputB, interactionNonce, auxData)`
pub fn finalise_signature() -> String {
    format!(
        "finalise(address,{t},{t},{t},{t},uint256,uint256)",
        t = ASSET_TUPLE
    )
}

pub const CAN_FINALISE_SIGNATURE: &str = "canFinalise(address,uint256)";

// ============================================================================
// REQUEST AND RESULT TYPES
// ============================================================================

/// One attempt to invoke a bridge through the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCallRequest {
    pub bridge_address: Address,
    pub input_asset_a: AssetDescriptor,
    pub input_asset_b: AssetDescriptor,
    pub output_asset_a: AssetDescriptor,
    pub output_asset_b: AssetDescriptor,
    /// Amount of input asset A moved to the bridge before the call. Unused by `finalise`.
    pub total_input_value: U256,
    pub interaction_nonce: U256,
    /// Passed through to the bridge uninterpreted
    pub aux_data: U256,
}

impl BridgeCallRequest {
    /// A request with every asset slot unused and all values zero
    pub fn new(bridge_address: Address) -> Self {
        Self {
            bridge_address,
            input_asset_a: AssetDescriptor::not_used(),
            input_asset_b: AssetDescriptor::not_used(),
            output_asset_a: AssetDescriptor::not_used(),
            output_asset_b: AssetDescriptor::not_used(),
            total_input_value: U256::zero(),
            interaction_nonce: U256::zero(),
            aux_data: U256::zero(),
        }
    }

    pub fn input_a(mut self, asset: AssetDescriptor) -> Self {
        self.input_asset_a = asset;
        self
    }

    pub fn input_b(mut self, asset: AssetDescriptor) -> Self {
        self.input_asset_b = asset;
        self
    }

    pub fn output_a(mut self, asset: AssetDescriptor) -> Self {
        self.output_asset_a = asset;
        self
    }

    pub fn output_b(mut self, asset: AssetDescriptor) -> Self {
        self.output_asset_b = asset;
        self
    }

    pub fn total_input_value(mut self, value: U256) -> Self {
        self.total_input_value = value;
        self
    }

    pub fn interaction_nonce(mut self, nonce: U256) -> Self {
        self.interaction_nonce = nonce;
        self
    }

    pub fn aux_data(mut self, aux_data: U256) -> Self {
        self.aux_data = aux_data;
        self
    }

    fn head_words(&self) -> Vec<Word> {
        let mut words = Vec::with_capacity(13);
        words.push(abi::encode_address(&self.bridge_address));
        for asset in [
            &self.input_asset_a,
            &self.input_asset_b,
            &self.output_asset_a,
            &self.output_asset_b,
        ] {
            words.extend_from_slice(&asset.encode());
        }
        words
    }

    /// Calldata for `convert`. Asset descriptors are canonicalized.
    pub fn encode_convert(&self) -> Vec<u8> {
        let mut words = self.head_words();
        words.push(abi::encode_u256(self.total_input_value));
        words.push(abi::encode_u256(self.interaction_nonce));
        words.push(abi::encode_u256(self.aux_data));
        abi::encode_call(abi::selector(&convert_signature()), &words)
    }

    /// Calldata for `finalise`
    pub fn encode_finalise(&self) -> Vec<u8> {
        let mut words = self.head_words();
        words.push(abi::encode_u256(self.interaction_nonce));
        words.push(abi::encode_u256(self.aux_data));
        abi::encode_call(abi::selector(&finalise_signature()), &words)
    }
}

/// Calldata for `canFinalise(bridge, interactionNonce)`
pub fn encode_can_finalise(bridge_address: &Address, interaction_nonce: U256) -> Vec<u8> {
    abi::encode_call(
        abi::selector(CAN_FINALISE_SIGNATURE),
        &[
            abi::encode_address(bridge_address),
            abi::encode_u256(interaction_nonce),
        ],
    )
}

/// Per-transaction overrides. `None` leaves the choice to the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendTxOptions {
    /// Gas price ceiling in wei
    pub gas_price: Option<U256>,
    pub gas_limit: Option<u64>,
}

impl SendTxOptions {
    /// Fills unset fields from `defaults`
    pub fn or(self, defaults: SendTxOptions) -> Self {
        Self {
            gas_price: self.gas_price.or(defaults.gas_price),
            gas_limit: self.gas_limit.or(defaults.gas_limit),
        }
    }
}

/// Outcome of a bridge interaction, decoded from the proxy's completion event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCallResult {
    pub output_value_a: U256,
    pub output_value_b: U256,
    /// True when the bridge deferred completion; the real values arrive via `finalise`
    pub is_async: bool,
    pub transaction_hash: String,
}

// ============================================================================
// COMPLETION EVENT DECODING
// ============================================================================

/// Decodes the completion event from a receipt.
///
/// Logs are filtered by emitter (`emitter`, the proxy) and by the event topic;
/// exactly one must remain. Fields are read by name.
pub fn decode_completion(
    receipt: &TransactionReceipt,
    emitter: &Address,
    event: &EventAbi,
) -> Result<BridgeCallResult, BridgeError> {
    let matching: Vec<_> = receipt
        .logs
        .iter()
        .filter(|log| log.is_from(emitter))
        .filter(|log| event.matches(log))
        .collect();

    let log = match matching.as_slice() {
        [log] => *log,
        [] => {
            return Err(BridgeError::ProtocolViolation(format!(
                "receipt {} has no {} log from {} ({} logs total)",
                receipt.transaction_hash,
                event.name,
                abi::format_address(emitter),
                receipt.logs.len()
            )))
        }
        many => {
            return Err(BridgeError::ProtocolViolation(format!(
                "receipt {} has {} {} logs from {}, expected exactly one",
                receipt.transaction_hash,
                many.len(),
                event.name,
                abi::format_address(emitter)
            )))
        }
    };

    let decoded = event.decode(log)?;
    Ok(BridgeCallResult {
        output_value_a: decoded.uint("outputValueA")?,
        output_value_b: decoded.uint("outputValueB")?,
        is_async: decoded.bool("isAsync")?,
        transaction_hash: receipt.transaction_hash.clone(),
    })
}

// ============================================================================
// PROXY CLIENT
// ============================================================================

/// Client bound to one deployed proxy contract.
///
/// Immutable after construction; share it freely between concurrent calls.
#[derive(Debug, Clone)]
pub struct DefiBridgeProxy {
    client: EvmClient,
    /// Proxy contract address (emitter of the completion event)
    address: Address,
    /// Unlocked account transactions are sent from
    sender: Address,
    completion_event: EventAbi,
    default_options: SendTxOptions,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl DefiBridgeProxy {
    /// Builds a proxy client from a validated configuration
    pub fn new(config: &BridgeClientConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let client = EvmClient::new(&config.chain.rpc_url)?;
        Ok(Self {
            client,
            address: abi::parse_address(&config.proxy.address)?,
            sender: abi::parse_address(&config.proxy.sender)?,
            completion_event: EventAbi::parse(&config.proxy.completion_event)?,
            default_options: config.transaction.send_options()?,
            receipt_poll_interval: Duration::from_millis(config.transaction.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_millis(config.transaction.receipt_timeout_ms),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn client(&self) -> &EvmClient {
        &self.client
    }

    pub fn completion_event(&self) -> &EventAbi {
        &self.completion_event
    }

    /// Runs `convert` on the bridge through the proxy.
    ///
    /// The proxy moves `total_input_value` of input asset A from its own balance
    /// to the bridge and executes the conversion in the same transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeCallResult)` - Decoded completion event (zero outputs are valid)
    /// * `Err(BridgeError::Revert)` - The transaction reverted; nothing changed
    /// * `Err(BridgeError::ProtocolViolation)` - No single decodable completion log
    pub async fn convert(
        &self,
        request: &BridgeCallRequest,
        options: SendTxOptions,
    ) -> Result<BridgeCallResult, BridgeError> {
        info!(
            "convert: bridge={} inputA={} inputB={} outputA={} outputB={} totalInputValue={} nonce={}",
            abi::format_address(&request.bridge_address),
            request.input_asset_a,
            request.input_asset_b,
            request.output_asset_a,
            request.output_asset_b,
            request.total_input_value,
            request.interaction_nonce
        );
        let result = self.execute(request.encode_convert(), options).await?;
        info!(
            "convert completed: outputValueA={} outputValueB={} isAsync={}",
            result.output_value_a, result.output_value_b, result.is_async
        );
        Ok(result)
    }

    /// Completes an async interaction identified by `interaction_nonce`.
    /// Same decoding and failure rules as [`DefiBridgeProxy::convert`].
    pub async fn finalise(
        &self,
        request: &BridgeCallRequest,
        options: SendTxOptions,
    ) -> Result<BridgeCallResult, BridgeError> {
        info!(
            "finalise: bridge={} nonce={}",
            abi::format_address(&request.bridge_address),
            request.interaction_nonce
        );
        let result = self.execute(request.encode_finalise(), options).await?;
        info!(
            "finalise completed: outputValueA={} outputValueB={} isAsync={}",
            result.output_value_a, result.output_value_b, result.is_async
        );
        Ok(result)
    }

    /// Asks the proxy whether the bridge is ready to finalise `interaction_nonce`.
    ///
    /// Read-only (`eth_call`): no gas, no state change, safe to poll.
    pub async fn can_finalise(
        &self,
        bridge_address: &Address,
        interaction_nonce: U256,
    ) -> Result<bool, BridgeError> {
        let data = encode_can_finalise(bridge_address, interaction_nonce);
        let output = self
            .client
            .call(Some(&self.sender), &self.address, &data)
            .await?;
        let words = abi::split_words(&output)?;
        let ready = match words.as_slice() {
            [word] => abi::decode_bool(word)?,
            _ => {
                return Err(BridgeError::ProtocolViolation(format!(
                    "canFinalise returned {} words, expected 1",
                    words.len()
                )))
            }
        };
        debug!(
            "canFinalise(bridge={}, nonce={}) = {}",
            abi::format_address(bridge_address),
            interaction_nonce,
            ready
        );
        Ok(ready)
    }

    /// Submits calldata to the proxy, waits for the receipt and decodes the completion.
    ///
    /// A receipt with status 0 carries no reason, so the call is replayed with
    /// `eth_call` at the receipt's block to recover one. If the replay does not
    /// revert (or fails) the `Revert` is returned without a reason.
    async fn execute(
        &self,
        data: Vec<u8>,
        options: SendTxOptions,
    ) -> Result<BridgeCallResult, BridgeError> {
        let options = options.or(self.default_options);
        let tx = TransactionRequest::new(Some(&self.sender), &self.address, &data)
            .with_gas_limit(options.gas_limit)
            .with_gas_price(options.gas_price);

        let hash = self.client.send_transaction(&tx).await?;
        let receipt = self
            .client
            .wait_for_receipt(&hash, self.receipt_poll_interval, self.receipt_timeout)
            .await?;

        if receipt.reverted() {
            let reason = self.replay_revert_reason(&data, &receipt).await;
            warn!(
                "Transaction {} reverted{}",
                receipt.transaction_hash,
                reason
                    .as_deref()
                    .map(|r| format!(": {}", r))
                    .unwrap_or_default()
            );
            return Err(BridgeError::Revert {
                reason,
                tx_hash: Some(receipt.transaction_hash),
            });
        }

        decode_completion(&receipt, &self.address, &self.completion_event)
    }

    async fn replay_revert_reason(
        &self,
        data: &[u8],
        receipt: &TransactionReceipt,
    ) -> Option<String> {
        let block = receipt.block_number.as_deref().unwrap_or("latest");
        match self
            .client
            .call_at(Some(&self.sender), &self.address, data, block)
            .await
        {
            Err(BridgeError::Revert { reason, .. }) => reason,
            Err(e) => {
                debug!(
                    "Replay of {} at block {} failed: {}",
                    receipt.transaction_hash, block, e
                );
                None
            }
            Ok(_) => None,
        }
    }
}
