/// Script type: a sequence of opcodes and data pushes.
///
/// Certificate transactions only ever produce two kinds of locking script,
/// P2PKH for value outputs and `OP_RETURN <digest>` for the commitment, so
/// this type offers builders and classifiers for exactly those.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Build `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(public_key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        bytes.extend_from_slice(public_key_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(bytes)
    }

    /// Build a provably unspendable data script: `OP_RETURN <data>`.
    ///
    /// # Arguments
    /// * `data` - The payload; a 32-byte digest encodes as `6a20<digest>`.
    ///
    /// # Returns
    /// The data script, or `DataTooBig` for an unencodable payload.
    pub fn op_return(data: &[u8]) -> Result<Self, ScriptError> {
        let mut script = Script(vec![OP_RETURN]);
        script.append_push_data(data)?;
        Ok(script)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render as space-separated ASM, or an empty string if the script is malformed.
    pub fn to_asm(&self) -> String {
        match self.chunks() {
            Ok(chunks) => chunks
                .iter()
                .map(ScriptChunk::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check for the P2PKH pattern: `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a data output script (`OP_RETURN` or `OP_FALSE OP_RETURN`).
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        b.first() == Some(&OP_RETURN) || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Extract the 20-byte public key hash from a P2PKH script.
    ///
    /// # Returns
    /// The hash, or `NotP2PKH` if the script has any other shape.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2PKH);
        }
        let mut pkh = [0u8; 20];
        pkh.copy_from_slice(&self.0[3..23]);
        Ok(pkh)
    }

    /// Return the single push following `OP_RETURN` in a data script.
    ///
    /// # Returns
    /// `Some(payload)` when the script is exactly one data push after the
    /// `OP_RETURN` marker, `None` for anything else.
    pub fn data_payload(&self) -> Option<Vec<u8>> {
        if !self.is_data() {
            return None;
        }
        let chunks = self.chunks().ok()?;
        let rest = match chunks.as_slice() {
            [ret, rest @ ..] if ret.op == OP_RETURN => rest,
            [f, ret, rest @ ..] if f.op == OP_FALSE && ret.op == OP_RETURN => rest,
            _ => return None,
        };
        match rest {
            [only] => only.data.clone(),
            _ => None,
        }
    }

    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Append data bytes with the minimal push prefix.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append raw opcodes, rejecting push opcodes.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| is_push_data(op)) {
            return Err(ScriptError::InvalidOpcodeType(op));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: [u8; 20] = [
        0x75, 0x1e, 0x76, 0xe8, 0x19, 0x91, 0x96, 0xd4, 0x54, 0x94,
        0x1c, 0x45, 0xd1, 0xb3, 0xa3, 0x23, 0xf1, 0x43, 0x3b, 0xd6,
    ];

    #[test]
    fn test_p2pkh_builder_and_classifier() {
        let script = Script::p2pkh(&PKH);
        assert_eq!(script.to_hex(), "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac");
        assert!(script.is_p2pkh());
        assert!(!script.is_data());
        assert_eq!(script.public_key_hash().unwrap(), PKH);
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 751e76e8199196d454941c45d1b3a323f1433bd6 OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    #[test]
    fn test_op_return_digest_layout() {
        let digest = [0x5au8; 32];
        let script = Script::op_return(&digest).unwrap();
        assert_eq!(script.len(), 34);
        assert!(script.to_hex().starts_with("6a20"));
        assert!(script.is_data());
        assert_eq!(script.data_payload(), Some(digest.to_vec()));
    }

    #[test]
    fn test_data_payload_accepts_false_return() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_FALSE, OP_RETURN]).unwrap();
        script.append_push_data(b"hello").unwrap();
        assert_eq!(script.data_payload(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_data_payload_rejects_multiple_pushes() {
        let mut script = Script::op_return(b"one").unwrap();
        script.append_push_data(b"two").unwrap();
        assert_eq!(script.data_payload(), None);
        assert_eq!(Script::p2pkh(&PKH).data_payload(), None);
    }

    #[test]
    fn test_public_key_hash_rejects_non_p2pkh() {
        let script = Script::op_return(&[0u8; 20]).unwrap();
        assert!(matches!(script.public_key_hash(), Err(ScriptError::NotP2PKH)));
    }

    #[test]
    fn test_append_opcodes_rejects_push() {
        let mut script = Script::new();
        assert!(matches!(
            script.append_opcodes(&[OP_DUP, OP_DATA_20]),
            Err(ScriptError::InvalidOpcodeType(OP_DATA_20))
        ));
        assert!(script.is_empty());
    }

    #[test]
    fn test_serde_hex() {
        let script = Script::p2pkh(&PKH);
        let json = serde_json::to_string(&script).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
    }
}
