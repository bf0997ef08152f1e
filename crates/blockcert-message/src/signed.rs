//! Signed message format.
//!
//! The digest is `sha256d(varstr(MAGIC) || varstr(message))` where `varstr`
//! is a VarInt length prefix followed by the bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use blockcert_primitives::base58;
use blockcert_primitives::ec::{CompactSignature, PrivateKey, PublicKey};
use blockcert_primitives::hash::sha256d;
use blockcert_primitives::util::WireWriter;
use blockcert_primitives::Network;

use crate::MessageError;

/// Prefix mixed into every signed message digest.
const MAGIC: &[u8] = b"Bitcoin Signed Message:\n";

/// Digest a message the way wallets do before signing it.
pub fn magic_hash(message: &[u8]) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(MAGIC.len() + message.len() + 10);
    writer.write_var_bytes(MAGIC);
    writer.write_var_bytes(message);
    sha256d(&writer.into_bytes())
}

/// Sign a message and return the base64 compact signature.
///
/// The header byte records whether `signer` uses a compressed public key,
/// so the recovered address matches the signer's own address. Signing is
/// deterministic: the same key and message always give the same output.
///
/// # Arguments
/// * `message` - The message bytes.
/// * `signer` - The private key to sign with.
///
/// # Returns
/// The base64 encoding of the 65-byte compact signature.
pub fn sign(message: &[u8], signer: &PrivateKey) -> Result<String, MessageError> {
    let signature = signer.sign_compact(&magic_hash(message))?;
    Ok(BASE64.encode(signature.as_bytes()))
}

/// Recover the public key that produced `signature` over `message`.
pub fn recover(message: &[u8], signature: &str) -> Result<PublicKey, MessageError> {
    let bytes = BASE64
        .decode(signature.trim())
        .map_err(|e| MessageError::InvalidEncoding(e.to_string()))?;
    let compact = CompactSignature::from_bytes(&bytes)?;
    Ok(compact.recover(&magic_hash(message))?)
}

/// Verify that `signature` over `message` was made by the key behind `address`.
///
/// # Arguments
/// * `address` - A Base58Check P2PKH address; its version byte selects the network.
/// * `signature` - Base64 compact signature.
/// * `message` - The message bytes.
///
/// # Returns
/// `Ok(true)` if the recovered key hashes to `address`, `Ok(false)` if it
/// recovers to some other key, or an error if the inputs are malformed.
pub fn verify(address: &str, signature: &str, message: &[u8]) -> Result<bool, MessageError> {
    let payload = base58::check_decode(address.trim())?;
    let version = *payload
        .first()
        .ok_or(blockcert_primitives::PrimitivesError::UnexpectedEof)?;
    let network = Network::from_p2pkh_version(version)?;

    let pub_key = recover(message, signature)?;
    Ok(pub_key.to_address(network) == address.trim())
}
