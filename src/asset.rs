//! Asset Descriptors
//!
//! One side of a bridge call. On the wire each descriptor is the static tuple
//! `(uint256 id, address erc20Address, uint8 assetType)`, three words long.

use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::abi::{self, Word};
use crate::error::BridgeError;

/// Number of ABI words one descriptor occupies
pub const ASSET_WORDS: usize = 3;

/// Asset type, numbered as the on-chain enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    #[default]
    NotUsed,
    Eth,
    Erc20,
    Virtual,
}

impl AssetKind {
    pub fn as_u8(self) -> u8 {
        match self {
            AssetKind::NotUsed => 0,
            AssetKind::Eth => 1,
            AssetKind::Erc20 => 2,
            AssetKind::Virtual => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AssetKind::NotUsed),
            1 => Some(AssetKind::Eth),
            2 => Some(AssetKind::Erc20),
            3 => Some(AssetKind::Virtual),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AssetKind::NotUsed => "not-used",
            AssetKind::Eth => "eth",
            AssetKind::Erc20 => "erc20",
            AssetKind::Virtual => "virtual",
        }
    }
}

/// Identifies one input or output slot of a bridge call.
///
/// Fields are public so callers can build descriptors freely; whatever they
/// put in, [`AssetDescriptor::canonical`] is what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Caller-assigned slot identifier (0 if unused)
    pub id: u64,
    pub kind: AssetKind,
    /// Token contract, zero address unless `kind` is `Erc20`
    pub token_address: Address,
}

impl AssetDescriptor {
    /// The canonical "no asset" descriptor
    pub fn not_used() -> Self {
        Self::default()
    }

    pub fn eth(id: u64) -> Self {
        Self {
            id,
            kind: AssetKind::Eth,
            token_address: Address::zero(),
        }
    }

    pub fn erc20(id: u64, token_address: Address) -> Self {
        Self {
            id,
            kind: AssetKind::Erc20,
            token_address,
        }
    }

    pub fn virtual_asset(id: u64) -> Self {
        Self {
            id,
            kind: AssetKind::Virtual,
            token_address: Address::zero(),
        }
    }

    pub fn is_used(&self) -> bool {
        self.kind != AssetKind::NotUsed
    }

    /// Normalizes the descriptor before encoding.
    ///
    /// `NotUsed` always becomes id 0 with the zero address, so two callers
    /// describing "no asset" encode identically. Only `Erc20` keeps a token
    /// address.
    pub fn canonical(&self) -> Self {
        match self.kind {
            AssetKind::NotUsed => Self::not_used(),
            AssetKind::Erc20 => *self,
            AssetKind::Eth | AssetKind::Virtual => Self {
                token_address: Address::zero(),
                ..*self
            },
        }
    }

    /// Encodes the canonical form as `(id, tokenAddress, kind)`
    pub fn encode(&self) -> [Word; ASSET_WORDS] {
        let asset = self.canonical();
        [
            abi::encode_u64(asset.id),
            abi::encode_address(&asset.token_address),
            abi::encode_u64(asset.kind.as_u8() as u64),
        ]
    }

    /// Decodes three words produced by [`AssetDescriptor::encode`]
    pub fn decode(words: &[Word]) -> Result<Self, BridgeError> {
        if words.len() != ASSET_WORDS {
            return Err(BridgeError::ProtocolViolation(format!(
                "asset tuple must be {} words, got {}",
                ASSET_WORDS,
                words.len()
            )));
        }
        let id = abi::decode_u64(&words[0])?;
        let token_address = abi::decode_address(&words[1])?;
        let raw_kind = abi::decode_uint(&words[2], 8)?.low_u64() as u8;
        let kind = AssetKind::from_u8(raw_kind).ok_or_else(|| {
            BridgeError::ProtocolViolation(format!("unknown asset type {}", raw_kind))
        })?;
        Ok(Self {
            id,
            kind,
            token_address,
        })
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let asset = self.canonical();
        match asset.kind {
            AssetKind::NotUsed => write!(f, "not-used"),
            AssetKind::Erc20 => write!(
                f,
                "erc20:{}:{}",
                abi::format_address(&asset.token_address),
                asset.id
            ),
            kind => write!(f, "{}:{}", kind.label(), asset.id),
        }
    }
}

/// Parses the command-line form of a descriptor:
/// `not-used`, `eth[:<id>]`, `erc20:<address>[:<id>]`, `virtual[:<id>]`.
impl FromStr for AssetDescriptor {
    type Err = BridgeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.trim().split(':').collect();
        let parse_id = |s: Option<&&str>| -> Result<u64, BridgeError> {
            match s {
                None => Ok(0),
                Some(s) => s.parse::<u64>().map_err(|_| {
                    BridgeError::InvalidInput(format!("asset id '{}' in '{}' is not a u64", s, input))
                }),
            }
        };
        match parts[0].to_ascii_lowercase().as_str() {
            "not-used" | "none" if parts.len() == 1 => Ok(Self::not_used()),
            "eth" if parts.len() <= 2 => Ok(Self::eth(parse_id(parts.get(1))?)),
            "virtual" if parts.len() <= 2 => Ok(Self::virtual_asset(parse_id(parts.get(1))?)),
            "erc20" if parts.len() == 2 || parts.len() == 3 => {
                let token_address = abi::parse_address(parts[1])?;
                Ok(Self::erc20(parse_id(parts.get(2))?, token_address))
            }
            _ => Err(BridgeError::InvalidInput(format!(
                "Asset '{}' must be one of: not-used, eth[:id], erc20:<address>[:id], virtual[:id]",
                input
            ))),
        }
    }
}
