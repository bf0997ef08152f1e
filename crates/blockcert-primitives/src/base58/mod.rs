//! Base58Check encoding used by addresses and WIF private keys.
//!
//! The payload is followed by the first four bytes of its SHA-256d
//! checksum before Base58 encoding with the Bitcoin alphabet.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Encode a byte slice as plain Base58.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).with_alphabet(bs58::Alphabet::BITCOIN).into_string()
}

/// Decode a plain Base58 string.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))
}

/// Encode `data` with a 4-byte SHA-256d checksum appended.
///
/// # Arguments
/// * `data` - Version byte followed by the payload.
///
/// # Returns
/// The Base58Check string.
pub fn check_encode(data: &[u8]) -> String {
    let checksum = sha256d(data);
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..4]);
    encode(&payload)
}

/// Decode a Base58Check string and verify its checksum.
///
/// # Arguments
/// * `s` - The Base58Check string.
///
/// # Returns
/// The payload without the checksum, or `ChecksumMismatch`.
pub fn check_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    let mut decoded = decode(s)?;
    if decoded.len() < 5 {
        return Err(PrimitivesError::InvalidBase58(format!(
            "{} bytes is too short for a checked payload",
            decoded.len()
        )));
    }
    let split = decoded.len() - 4;
    let expected = sha256d(&decoded[..split]);
    if decoded[split..] != expected[..4] {
        return Err(PrimitivesError::ChecksumMismatch);
    }
    decoded.truncate(split);
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros_become_ones() {
        assert_eq!(encode(&[0, 0, 1]), "112");
        assert_eq!(decode("112").unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_check_encode_address_payload() {
        // version 0x00 + hash160 of the compressed generator point
        let payload =
            hex::decode("00751e76e8199196d454941c45d1b3a323f1433bd6").unwrap();
        assert_eq!(check_encode(&payload), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(check_decode("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH").unwrap(), payload);
    }

    #[test]
    fn test_check_decode_detects_corruption() {
        let err = check_decode("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMJ").unwrap_err();
        assert!(matches!(err, PrimitivesError::ChecksumMismatch));
    }

    #[test]
    fn test_check_decode_rejects_bad_alphabet() {
        assert!(matches!(
            check_decode("0OIl"),
            Err(PrimitivesError::InvalidBase58(_))
        ));
    }
}
