//! secp256k1 private key with WIF import and export.
//!
//! A key remembers whether its WIF asked for a compressed public key, because
//! the issuing address is the Hash160 of whichever encoding the wallet used.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::{CompactSignature, Signature};
use crate::network::Network;
use crate::PrimitivesError;

/// Length of a serialized private key scalar in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Flag byte appended to a WIF payload for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key used to sign transactions and certificate messages.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
    compressed: bool,
    network: Network,
}

impl PrivateKey {
    /// Generate a new random key (compressed, mainnet).
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
            compressed: true,
            network: Network::Mainnet,
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// The key defaults to compressed public key encoding on mainnet.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)`, or an error if the scalar is zero or not below the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner,
            compressed: true,
            network: Network::Mainnet,
        })
    }

    /// Decode a WIF (Wallet Import Format) string.
    ///
    /// The version byte selects the network and a trailing 0x01 flag
    /// selects compressed public key encoding.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the WIF is malformed or the checksum fails.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let mut payload = base58::check_decode(wif.trim()).map_err(|e| match e {
            PrimitivesError::ChecksumMismatch => e,
            other => PrimitivesError::InvalidWif(other.to_string()),
        })?;

        let compressed = match payload.len() {
            34 if payload[33] == COMPRESS_MAGIC => true,
            34 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            33 => false,
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid payload length {}",
                    n
                )))
            }
        };
        let network = Network::from_wif_version(payload[0])
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        let key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN]);
        payload.zeroize();
        Ok(key?.with_compression(compressed).with_network(network))
    }

    /// Encode the key as WIF for its network and compression setting.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(2 + PRIVATE_KEY_BYTES_LEN);
        payload.push(self.network.wif_version());
        payload.extend_from_slice(&self.to_bytes());
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        let wif = base58::check_encode(&payload);
        payload.zeroize();
        wif
    }

    /// Return a copy of this key with the given public key encoding.
    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Return a copy of this key tagged with the given network.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Derive the public key, carrying over the compression setting.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.inner.verifying_key(), self.compressed)
    }

    /// P2PKH address of this key on its own network.
    pub fn address(&self) -> String {
        self.pub_key().to_address(self.network)
    }

    /// Sign a 32-byte digest with an RFC 6979 deterministic nonce.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign (a sighash or message hash).
    ///
    /// # Returns
    /// A low-S normalized `Signature`.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Sign a 32-byte digest and return a 65-byte recoverable signature.
    pub fn sign_compact(&self, hash: &[u8]) -> Result<CompactSignature, PrimitivesError> {
        CompactSignature::sign(hash, self)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        // SigningKey zeroizes its own scalar; scrub our serialized copy too.
        let mut bytes = self.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
            && self.compressed == other.compressed
            && self.network == other.network
    }
}

impl Eq for PrivateKey {}
