//! ECDSA signatures over secp256k1.
//!
//! `Signature` is the DER form placed in transaction unlocking scripts.
//! `CompactSignature` is the 65-byte recoverable form used by signed
//! messages: a header byte `27 + recovery_id (+ 4 if compressed)`
//! followed by R and S.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{self, RecoveryId, VerifyingKey};

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Length of a compact recoverable signature.
pub const COMPACT_SIGNATURE_LEN: usize = 65;

/// Lowest header byte of a compact signature.
const COMPACT_HEADER_BASE: u8 = 27;

/// Header offset marking a compressed public key.
const COMPACT_COMPRESSED_FLAG: u8 = 4;

fn as_digest(hash: &[u8]) -> Result<&[u8; 32], PrimitivesError> {
    hash.try_into().map_err(|_| {
        PrimitivesError::InvalidSignature(format!(
            "expected a 32-byte digest, got {} bytes",
            hash.len()
        ))
    })
}

/// A low-S normalized ECDSA signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Sign a 32-byte digest using an RFC 6979 deterministic nonce.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign.
    /// * `priv_key` - The signing key.
    ///
    /// # Returns
    /// A low-S signature, or an error if `hash` is not 32 bytes.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let digest = as_digest(hash)?;
        let (sig, _) = priv_key.signing_key().sign_prehash_recoverable(digest)?;
        Ok(Signature { inner: sig.normalize_s().unwrap_or(sig) })
    }

    /// Parse a strict DER-encoded signature.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let sig = ecdsa::Signature::from_der(bytes)?;
        Ok(Signature { inner: sig.normalize_s().unwrap_or(sig) })
    }

    /// Serialize as DER: `0x30 len 0x02 rlen r 0x02 slen s`.
    pub fn to_der(&self) -> Vec<u8> {
        self.inner.to_der().as_bytes().to_vec()
    }

    /// Verify against a 32-byte digest and public key.
    ///
    /// # Returns
    /// `true` if the signature is valid, `false` otherwise (including a malformed digest).
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        match as_digest(hash) {
            Ok(digest) => pub_key.verifying_key().verify_prehash(digest, &self.inner).is_ok(),
            Err(_) => false,
        }
    }
}

/// A 65-byte recoverable signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactSignature([u8; COMPACT_SIGNATURE_LEN]);

impl CompactSignature {
    /// Sign a 32-byte digest, recording the recovery id and the key's compression.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign.
    /// * `priv_key` - The signing key; its compression flag sets the header.
    ///
    /// # Returns
    /// The compact signature, or an error if `hash` is not 32 bytes.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let digest = as_digest(hash)?;
        let (sig, recovery_id) = priv_key.signing_key().sign_prehash_recoverable(digest)?;

        let mut out = [0u8; COMPACT_SIGNATURE_LEN];
        out[0] = COMPACT_HEADER_BASE + recovery_id.to_byte();
        if priv_key.is_compressed() {
            out[0] += COMPACT_COMPRESSED_FLAG;
        }
        out[1..].copy_from_slice(&sig.to_bytes());
        Ok(CompactSignature(out))
    }

    /// Parse 65 bytes, validating the header range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let arr: [u8; COMPACT_SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            PrimitivesError::InvalidSignature(format!(
                "compact signature must be {} bytes, got {}",
                COMPACT_SIGNATURE_LEN,
                bytes.len()
            ))
        })?;
        if !(COMPACT_HEADER_BASE..COMPACT_HEADER_BASE + 8).contains(&arr[0]) {
            return Err(PrimitivesError::InvalidSignature(format!(
                "invalid compact header byte {}",
                arr[0]
            )));
        }
        Ok(CompactSignature(arr))
    }

    pub fn as_bytes(&self) -> &[u8; COMPACT_SIGNATURE_LEN] {
        &self.0
    }

    /// Whether the signer used a compressed public key.
    pub fn is_compressed(&self) -> bool {
        self.0[0] - COMPACT_HEADER_BASE >= COMPACT_COMPRESSED_FLAG
    }

    /// Recover the signer's public key from the digest that was signed.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte digest.
    ///
    /// # Returns
    /// The public key, in the encoding recorded by the header byte.
    pub fn recover(&self, hash: &[u8]) -> Result<PublicKey, PrimitivesError> {
        let digest = as_digest(hash)?;
        let recid = (self.0[0] - COMPACT_HEADER_BASE) & 0x03;
        let recovery_id = RecoveryId::from_byte(recid)
            .ok_or_else(|| PrimitivesError::InvalidSignature("invalid recovery id".to_string()))?;
        let sig = ecdsa::Signature::from_slice(&self.0[1..])?;
        let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)?;
        Ok(PublicKey::from_verifying_key(key, self.is_compressed()))
    }
}
