//! Event ABI
//!
//! Parses a human-readable event signature and decodes matching logs into
//! named fields, so callers look values up by name instead of by position.
//!
//! ```text
//! AztecBridgeInteraction(address indexed bridgeAddress,uint256 outputValueA,uint256 outputValueB,bool isAsync)
//! ```

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::abi::{self, Word};
use crate::error::BridgeError;
use crate::evm_client::EvmLog;

/// Completion event emitted by the proxy contract after every bridge interaction
pub const DEFAULT_COMPLETION_EVENT: &str = "AztecBridgeInteraction(address indexed bridgeAddress,uint256 outputValueA,uint256 outputValueB,bool isAsync)";

/// Static parameter types an event may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Uint(usize),
    Bool,
}

impl AbiType {
    fn parse(ty: &str) -> Result<Self, BridgeError> {
        match ty {
            "address" => Ok(AbiType::Address),
            "bool" => Ok(AbiType::Bool),
            "uint" => Ok(AbiType::Uint(256)),
            _ => {
                let bits = ty
                    .strip_prefix("uint")
                    .and_then(|bits| bits.parse::<usize>().ok())
                    .filter(|bits| *bits > 0 && *bits <= 256 && bits % 8 == 0)
                    .ok_or_else(|| {
                        BridgeError::InvalidInput(format!(
                            "Unsupported event parameter type '{}'",
                            ty
                        ))
                    })?;
                Ok(AbiType::Uint(bits))
            }
        }
    }

    fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".to_string(),
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Bool => "bool".to_string(),
        }
    }

    fn decode(&self, word: &Word) -> Result<AbiValue, BridgeError> {
        match self {
            AbiType::Address => Ok(AbiValue::Address(abi::decode_address(word)?)),
            AbiType::Uint(bits) => Ok(AbiValue::Uint(abi::decode_uint(word, *bits)?)),
            AbiType::Bool => Ok(AbiValue::Bool(abi::decode_bool(word)?)),
        }
    }
}

/// A single decoded event value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub ty: AbiType,
    pub indexed: bool,
}

/// Parsed event description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAbi {
    pub name: String,
    pub params: Vec<EventParam>,
}

impl EventAbi {
    /// Parses `Name(type [indexed] name,...)`. Every parameter must be named.
    pub fn parse(signature: &str) -> Result<Self, BridgeError> {
        let signature = signature.trim();
        let invalid = |why: &str| {
            BridgeError::InvalidInput(format!("Invalid event signature '{}': {}", signature, why))
        };

        let open = signature.find('(').ok_or_else(|| invalid("missing '('"))?;
        let inner = signature[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing ')'"))?;
        let name = signature[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("bad event name"));
        }

        let mut params: Vec<EventParam> = Vec::new();
        if !inner.trim().is_empty() {
            for raw in inner.split(',') {
                let tokens: Vec<&str> = raw.split_whitespace().collect();
                let (ty, indexed, param_name) = match tokens.as_slice() {
                    [ty, "indexed", name] => (*ty, true, *name),
                    [ty, name] if *name != "indexed" => (*ty, false, *name),
                    _ => {
                        return Err(invalid(&format!(
                            "parameter '{}' must be 'type [indexed] name'",
                            raw.trim()
                        )))
                    }
                };
                if params.iter().any(|p| p.name == param_name) {
                    return Err(invalid(&format!("duplicate parameter '{}'", param_name)));
                }
                params.push(EventParam {
                    name: param_name.to_string(),
                    ty: AbiType::parse(ty)?,
                    indexed,
                });
            }
        }

        if params.iter().filter(|p| p.indexed).count() > 3 {
            return Err(invalid("at most 3 indexed parameters"));
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Canonical signature used for hashing, e.g. `Transfer(address,address,uint256)`
    pub fn canonical_signature(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.ty.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// topics[0] of every log of this event
    pub fn topic(&self) -> [u8; 32] {
        abi::keccak256(self.canonical_signature().as_bytes())
    }

    pub fn topic_hex(&self) -> String {
        abi::to_hex(&self.topic())
    }

    pub fn param(&self, name: &str) -> Option<&EventParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether a log carries this event's topic
    pub fn matches(&self, log: &EvmLog) -> bool {
        log.topics
            .first()
            .map(|topic| topic.eq_ignore_ascii_case(&self.topic_hex()))
            .unwrap_or(false)
    }

    /// Decodes a log of this event into named fields.
    ///
    /// Indexed parameters come from topics[1..], the rest from the data words in
    /// declaration order.
    pub fn decode(&self, log: &EvmLog) -> Result<DecodedEvent, BridgeError> {
        if !self.matches(log) {
            return Err(BridgeError::ProtocolViolation(format!(
                "log topic does not match event {}",
                self.canonical_signature()
            )));
        }

        let indexed_count = self.params.iter().filter(|p| p.indexed).count();
        if log.topics.len() != indexed_count + 1 {
            return Err(BridgeError::ProtocolViolation(format!(
                "event {} expects {} topics, log has {}",
                self.name,
                indexed_count + 1,
                log.topics.len()
            )));
        }

        let data_words = abi::split_words(&abi::decode_hex(&log.data)?)?;
        let data_count = self.params.len() - indexed_count;
        if data_words.len() != data_count {
            return Err(BridgeError::ProtocolViolation(format!(
                "event {} expects {} data words, log has {}",
                self.name,
                data_count,
                data_words.len()
            )));
        }

        let mut topics = log.topics.iter().skip(1);
        let mut words = data_words.iter();
        let mut fields = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = if param.indexed {
                let topic = topics.next().ok_or_else(|| {
                    BridgeError::ProtocolViolation(format!("missing topic for {}", param.name))
                })?;
                param.ty.decode(&topic_word(topic)?)?
            } else {
                let word = words.next().ok_or_else(|| {
                    BridgeError::ProtocolViolation(format!("missing data for {}", param.name))
                })?;
                param.ty.decode(word)?
            };
            fields.push((param.name.clone(), value));
        }

        Ok(DecodedEvent {
            name: self.name.clone(),
            fields,
        })
    }
}

fn topic_word(topic: &str) -> Result<Word, BridgeError> {
    let bytes = abi::decode_hex(topic)?;
    let mut words = abi::split_words(&bytes)?;
    if words.len() != 1 {
        return Err(BridgeError::ProtocolViolation(format!(
            "topic '{}' is not 32 bytes",
            topic
        )));
    }
    Ok(words.remove(0))
}

/// A decoded log, fields in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub fields: Vec<(String, AbiValue)>,
}

impl DecodedEvent {
    pub fn get(&self, name: &str) -> Option<&AbiValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn uint(&self, name: &str) -> Result<U256, BridgeError> {
        match self.get(name) {
            Some(AbiValue::Uint(value)) => Ok(*value),
            Some(other) => Err(self.wrong_type(name, "uint", other)),
            None => Err(self.missing(name)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, BridgeError> {
        match self.get(name) {
            Some(AbiValue::Bool(value)) => Ok(*value),
            Some(other) => Err(self.wrong_type(name, "bool", other)),
            None => Err(self.missing(name)),
        }
    }

    pub fn address(&self, name: &str) -> Result<Address, BridgeError> {
        match self.get(name) {
            Some(AbiValue::Address(value)) => Ok(*value),
            Some(other) => Err(self.wrong_type(name, "address", other)),
            None => Err(self.missing(name)),
        }
    }

    fn missing(&self, name: &str) -> BridgeError {
        BridgeError::ProtocolViolation(format!("event {} has no field '{}'", self.name, name))
    }

    fn wrong_type(&self, name: &str, expected: &str, got: &AbiValue) -> BridgeError {
        BridgeError::ProtocolViolation(format!(
            "event {} field '{}' should be {}, got {:?}",
            self.name, name, expected, got
        ))
    }
}
