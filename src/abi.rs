//! ABI word codec
//!
//! Hand-rolled encoding for the handful of static Solidity types the proxy
//! contract uses. Every value occupies one 32-byte big-endian word.

use ethereum_types::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::error::BridgeError;

/// Size of one ABI word in bytes
pub const WORD_SIZE: usize = 32;

/// Selector of `Error(string)`, the standard revert payload
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`, emitted on assertion failures and overflows
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

pub type Word = [u8; WORD_SIZE];

// ============================================================================
// HASHING
// ============================================================================

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Function selector: first 4 bytes of keccak256 of the canonical signature,
/// e.g. `canFinalise(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

// ============================================================================
// ENCODING
// ============================================================================

pub fn encode_address(address: &Address) -> Word {
    let mut word = [0u8; WORD_SIZE];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn encode_u256(value: U256) -> Word {
    let mut word = [0u8; WORD_SIZE];
    value.to_big_endian(&mut word);
    word
}

pub fn encode_u64(value: u64) -> Word {
    encode_u256(U256::from(value))
}

pub fn encode_bool(value: bool) -> Word {
    encode_u64(value as u64)
}

/// Concatenates a selector and argument words into calldata
pub fn encode_call(selector: [u8; 4], words: &[Word]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * WORD_SIZE);
    data.extend_from_slice(&selector);
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

// ============================================================================
// DECODING
// ============================================================================

/// Splits ABI data into words. The length must be an exact multiple of 32.
pub fn split_words(data: &[u8]) -> Result<Vec<Word>, BridgeError> {
    if data.len() % WORD_SIZE != 0 {
        return Err(BridgeError::ProtocolViolation(format!(
            "ABI data length {} is not a multiple of {}",
            data.len(),
            WORD_SIZE
        )));
    }
    Ok(data
        .chunks_exact(WORD_SIZE)
        .map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

pub fn decode_u256(word: &Word) -> U256 {
    U256::from_big_endian(word)
}

/// Decodes a `uintN` word, rejecting values wider than `bits`.
pub fn decode_uint(word: &Word, bits: usize) -> Result<U256, BridgeError> {
    let value = decode_u256(word);
    if value.bits() > bits {
        return Err(BridgeError::ProtocolViolation(format!(
            "value {} does not fit in uint{}",
            value, bits
        )));
    }
    Ok(value)
}

pub fn decode_u64(word: &Word) -> Result<u64, BridgeError> {
    Ok(decode_uint(word, 64)?.low_u64())
}

/// Decodes an address word. The 12 high bytes must be zero.
pub fn decode_address(word: &Word) -> Result<Address, BridgeError> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(BridgeError::ProtocolViolation(format!(
            "word 0x{} is not a left-padded address",
            hex::encode(word)
        )));
    }
    Ok(Address::from_slice(&word[12..]))
}

/// Decodes a bool word. Only 0 and 1 are accepted.
pub fn decode_bool(word: &Word) -> Result<bool, BridgeError> {
    match decode_u256(word) {
        v if v.is_zero() => Ok(false),
        v if v == U256::one() => Ok(true),
        v => Err(BridgeError::ProtocolViolation(format!(
            "value {} is not a valid bool",
            v
        ))),
    }
}

/// Extracts a human-readable reason from revert data.
///
/// Understands `Error(string)` and `Panic(uint256)`. Returns `None` for empty
/// data and for custom errors this client has no ABI for.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (head, body) = data.split_at(4);
    if head == ERROR_STRING_SELECTOR {
        // offset (32) + length (32) + utf8 bytes
        if body.len() < 2 * WORD_SIZE {
            return None;
        }
        let offset = U256::from_big_endian(&body[..WORD_SIZE]);
        if offset != U256::from(WORD_SIZE) {
            return None;
        }
        let length = U256::from_big_endian(&body[WORD_SIZE..2 * WORD_SIZE]);
        if length.bits() > 32 {
            return None;
        }
        let length = length.low_u64() as usize;
        let start = 2 * WORD_SIZE;
        let bytes = body.get(start..start + length)?;
        return Some(String::from_utf8_lossy(bytes).into_owned());
    }
    if head == PANIC_SELECTOR && body.len() >= WORD_SIZE {
        let code = U256::from_big_endian(&body[..WORD_SIZE]);
        return Some(format!("panic code 0x{:x}", code));
    }
    None
}

// ============================================================================
// HEX HELPERS
// ============================================================================

/// Decodes a hex string with or without the 0x prefix
pub fn decode_hex(input: &str) -> Result<Vec<u8>, BridgeError> {
    let s = input.trim();
    let without = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(without)
        .map_err(|e| BridgeError::ProtocolViolation(format!("invalid hex '{}': {}", input, e)))
}

/// Encodes bytes as a 0x-prefixed lowercase hex string
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Formats an address as a full 0x-prefixed lowercase hex string
pub fn format_address(address: &Address) -> String {
    to_hex(address.as_bytes())
}

/// Parses a 20-byte address with or without the 0x prefix
pub fn parse_address(input: &str) -> Result<Address, BridgeError> {
    let s = input.trim();
    let without = s.strip_prefix("0x").unwrap_or(s);
    if without.len() != 40 {
        return Err(BridgeError::InvalidInput(format!(
            "Address '{}' must be 40 hex characters",
            input
        )));
    }
    let bytes = hex::decode(without)
        .map_err(|_| BridgeError::InvalidInput(format!("Address '{}' must be hex", input)))?;
    Ok(Address::from_slice(&bytes))
}

/// Parses a decimal unsigned integer into a U256
pub fn parse_u256(input: &str) -> Result<U256, BridgeError> {
    U256::from_dec_str(input.trim()).map_err(|e| {
        BridgeError::InvalidInput(format!("'{}' is not a valid decimal number: {:?}", input, e))
    })
}

/// Parses a JSON-RPC hex quantity such as `0x1bc16d674ec80000`
pub fn parse_quantity(input: &str) -> Result<U256, BridgeError> {
    let without = input.strip_prefix("0x").unwrap_or(input);
    if without.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(without, 16).map_err(|e| {
        BridgeError::ProtocolViolation(format!("invalid hex quantity '{}': {:?}", input, e))
    })
}

/// Formats a value as a JSON-RPC hex quantity (no leading zeros)
pub fn format_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}
