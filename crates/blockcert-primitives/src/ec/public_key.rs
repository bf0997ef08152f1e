//! secp256k1 public key with P2PKH address derivation.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::base58;
use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::network::Network;
use crate::PrimitivesError;

/// A secp256k1 public key.
///
/// Carries the SEC1 encoding (compressed or uncompressed) it was parsed from
/// or derived with, since the Hash160 of that encoding is what P2PKH scripts
/// commit to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse SEC1-encoded bytes (33-byte compressed or 65-byte uncompressed).
    ///
    /// # Arguments
    /// * `bytes` - SEC1-encoded public key bytes.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or an error if the bytes are not a valid point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes.first() {
            Some(0x02) | Some(0x03) => true,
            Some(0x04) => false,
            _ => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "unsupported encoding of {} bytes",
                    bytes.len()
                )))
            }
        };
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner, compressed })
    }

    /// Parse a hex-encoded SEC1 public key.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    pub(crate) fn from_verifying_key(inner: VerifyingKey, compressed: bool) -> Self {
        PublicKey { inner, compressed }
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Return the same point with the other SEC1 encoding selected.
    pub fn with_compression(&self, compressed: bool) -> Self {
        PublicKey { inner: self.inner, compressed }
    }

    /// Serialize in the key's own SEC1 encoding.
    ///
    /// # Returns
    /// 33 bytes when compressed, 65 bytes otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_encoded_point(self.compressed).as_bytes().to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Hash160 of the key's SEC1 encoding.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Derive the Base58Check P2PKH address for `network`.
    ///
    /// # Arguments
    /// * `network` - Selects the address version byte.
    ///
    /// # Returns
    /// The address string.
    pub fn to_address(&self, network: Network) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(network.p2pkh_version());
        payload.extend_from_slice(&self.hash160());
        base58::check_encode(&payload)
    }

    /// Verify a DER-style signature over a 32-byte digest.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        sig.verify(hash, self)
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}
