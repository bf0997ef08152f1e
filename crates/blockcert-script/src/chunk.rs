//! Script chunk decoding and push-data encoding.
//!
//! A chunk is either a bare opcode or a push carrying its data. Unlike a full
//! interpreter, decoding keeps going after `OP_RETURN` so the pushes of a data
//! output can be read back.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The pushed bytes, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render the chunk as an ASM token: pushes as hex, opcodes by name.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) => hex::encode(data),
            None => opcode_name(self.op),
        }
    }
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes.
///
/// # Returns
/// The parsed chunks, or `DataTooSmall` if a push overruns the script.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        let (header, length) = match op {
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => (2, read_len(bytes, pos, 1)?),
            OP_PUSHDATA2 => (3, read_len(bytes, pos, 2)?),
            OP_PUSHDATA4 => (5, read_len(bytes, pos, 4)?),
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
                continue;
            }
        };
        let start = pos + header;
        let data = bytes
            .get(start..start + length)
            .ok_or(ScriptError::DataTooSmall { offset: pos, wanted: length })?;
        chunks.push(ScriptChunk { op, data: Some(data.to_vec()) });
        pos = start + length;
    }

    Ok(chunks)
}

/// Little-endian length of `width` bytes following the opcode at `pos`.
fn read_len(bytes: &[u8], pos: usize, width: usize) -> Result<usize, ScriptError> {
    let raw = bytes
        .get(pos + 1..pos + 1 + width)
        .ok_or(ScriptError::DataTooSmall { offset: pos, wanted: width })?;
    Ok(raw.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Arguments
/// * `data_len` - The length of the data to be pushed.
///
/// # Returns
/// The prefix bytes, or `DataTooBig` beyond `OP_PUSHDATA4` range.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_p2pkh() {
        let script = hex::decode("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap();
        let chunks = decode_script(&script).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].op, OP_DUP);
        assert_eq!(chunks[2].data.as_ref().map(Vec::len), Some(20));
        assert_eq!(chunks[4].op, OP_CHECKSIG);
    }

    #[test]
    fn test_decode_continues_after_op_return() {
        let mut script = vec![OP_RETURN, OP_DATA_32];
        script.extend_from_slice(&[0xab; 32]);
        let chunks = decode_script(&script).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], ScriptChunk { op: OP_RETURN, data: None });
        assert_eq!(chunks[1].data, Some(vec![0xab; 32]));
    }

    #[test]
    fn test_decode_pushdata1() {
        let mut script = vec![OP_PUSHDATA1, 80];
        script.extend_from_slice(&[1u8; 80]);
        let chunks = decode_script(&script).unwrap();
        assert_eq!(chunks[0].op, OP_PUSHDATA1);
        assert_eq!(chunks[0].data.as_ref().map(Vec::len), Some(80));
    }

    #[test]
    fn test_decode_truncated_push() {
        let err = decode_script(&[OP_DATA_32, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, ScriptError::DataTooSmall { offset: 0, wanted: 32 }));
        assert!(decode_script(&[OP_PUSHDATA2, 0x01]).is_err());
    }

    #[test]
    fn test_push_prefix_boundaries() {
        assert_eq!(push_data_prefix(32).unwrap(), vec![0x20]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![0x4b]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(push_data_prefix(65536).unwrap(), vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]);
    }
}
