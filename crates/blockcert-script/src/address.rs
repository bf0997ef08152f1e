/// P2PKH address handling.
///
/// Addresses identify the issuer, the recipients, the revocation key and the
/// funding addresses. Each one maps to a P2PKH locking script.

use std::fmt;
use std::str::FromStr;

use blockcert_primitives::base58;
use blockcert_primitives::ec::PublicKey;
use blockcert_primitives::Network;

use crate::{Script, ScriptError};

/// A P2PKH address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The Base58Check address string.
    pub address_string: String,
    /// The 20-byte Hash160 of the public key.
    pub public_key_hash: [u8; 20],
    /// The network this address belongs to.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check-encoded address string.
    ///
    /// # Arguments
    /// * `addr` - The address string.
    ///
    /// # Returns
    /// An `Address`, or `InvalidAddress` naming why it was rejected.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let invalid = |reason: String| ScriptError::InvalidAddress {
            address: addr.to_string(),
            reason,
        };

        let payload = base58::check_decode(addr).map_err(|e| invalid(e.to_string()))?;
        if payload.len() != 21 {
            return Err(invalid(format!("payload is {} bytes, want 21", payload.len())));
        }
        let network =
            Network::from_p2pkh_version(payload[0]).map_err(|e| invalid(e.to_string()))?;

        let mut public_key_hash = [0u8; 20];
        public_key_hash.copy_from_slice(&payload[1..]);
        Ok(Address {
            address_string: addr.to_string(),
            public_key_hash,
            network,
        })
    }

    /// Create an address from a 20-byte public key hash.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        let mut payload = Vec::with_capacity(21);
        payload.push(network.p2pkh_version());
        payload.extend_from_slice(hash);
        Address {
            address_string: base58::check_encode(&payload),
            public_key_hash: *hash,
            network,
        }
    }

    /// Address of a public key in its own SEC1 encoding.
    pub fn from_public_key(key: &PublicKey, network: Network) -> Self {
        Self::from_public_key_hash(&key.hash160(), network)
    }

    /// The P2PKH locking script paying this address.
    pub fn locking_script(&self) -> Script {
        Script::p2pkh(&self.public_key_hash)
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address_string)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.address_string)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_string(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_mainnet() {
        let addr = Address::from_string("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH").unwrap();
        assert_eq!(addr.network, Network::Mainnet);
        assert_eq!(
            hex::encode(addr.public_key_hash),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_same_hash_on_both_networks() {
        let main = Address::from_string("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH").unwrap();
        let test = Address::from_string("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r").unwrap();
        assert_eq!(test.network, Network::Testnet);
        assert_eq!(main.public_key_hash, test.public_key_hash);
        assert_eq!(
            Address::from_public_key_hash(&main.public_key_hash, Network::Testnet),
            test
        );
    }

    #[test]
    fn test_locking_script() {
        let addr: Address = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".parse().unwrap();
        assert_eq!(
            addr.locking_script().to_hex(),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
    }

    #[test]
    fn test_from_public_key_respects_encoding() {
        let key = PublicKey::from_hex(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .unwrap();
        assert_eq!(
            Address::from_public_key(&key, Network::Mainnet).to_string(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
        assert_eq!(
            Address::from_public_key(&key.with_compression(false), Network::Mainnet).to_string(),
            "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm"
        );
    }

    #[test]
    fn test_rejects_bad_checksum_and_version() {
        assert!(Address::from_string("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMJ").is_err());
        // P2SH version byte 0x05
        let p2sh = base58::check_encode(&[&[0x05u8][..], &[0u8; 20][..]].concat());
        let err = Address::from_string(&p2sh).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidAddress { .. }));
    }
}
