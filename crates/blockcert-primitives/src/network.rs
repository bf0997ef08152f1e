//! Network parameters: version bytes for addresses and WIF keys.

use serde::{Deserialize, Serialize};

use crate::PrimitivesError;

/// Ledger network an address or key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Mainnet (addresses start with '1').
    #[default]
    Mainnet,
    /// Testnet (addresses start with 'm' or 'n').
    Testnet,
}

impl Network {
    /// Version byte prepended to a P2PKH address payload.
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    /// Version byte prepended to a WIF private key payload.
    pub fn wif_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    /// Detect the network from a P2PKH address version byte.
    pub fn from_p2pkh_version(version: u8) -> Result<Self, PrimitivesError> {
        match version {
            0x00 => Ok(Network::Mainnet),
            0x6f => Ok(Network::Testnet),
            other => Err(PrimitivesError::UnknownVersion(other)),
        }
    }

    /// Detect the network from a WIF version byte.
    pub fn from_wif_version(version: u8) -> Result<Self, PrimitivesError> {
        match version {
            0x80 => Ok(Network::Mainnet),
            0xef => Ok(Network::Testnet),
            other => Err(PrimitivesError::UnknownVersion(other)),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}
