//! Transaction input and the outpoint it spends.

use std::fmt;

use blockcert_primitives::chainhash::Hash;
use blockcert_primitives::util::{WireReader, WireWriter};
use blockcert_script::Script;
use serde::{Deserialize, Serialize};

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Sequence number of a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Reference to a specific output of a previous transaction.
///
/// Ordered by txid then index, which gives unspent-output selection a
/// stable tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction ID of the output's transaction.
    pub txid: Hash,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A single transaction input.
///
/// The unlocking script is empty until the input is signed. The spent
/// output, when known, is kept alongside for signature hashing; it is not
/// part of the wire encoding.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | previous txid      | 32 bytes (LE)    |
/// | previous index     | 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    pub previous_output: OutPoint,
    pub unlocking_script: Script,
    pub sequence_number: u32,
    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create an unsigned input spending `previous_output`.
    pub fn new(previous_output: OutPoint) -> Self {
        TransactionInput {
            previous_output,
            unlocking_script: Script::new(),
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            source_output: None,
        }
    }

    /// Create an unsigned input that also knows the output it spends.
    ///
    /// # Arguments
    /// * `previous_output` - The outpoint being spent.
    /// * `source_output` - Value and locking script of that outpoint.
    pub fn spending(previous_output: OutPoint, source_output: TransactionOutput) -> Self {
        let mut input = Self::new(previous_output);
        input.source_output = Some(source_output);
        input
    }

    /// The output this input spends, if it was supplied.
    pub fn source_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// Deserialize an input from a `WireReader`.
    ///
    /// # Returns
    /// The input without source output information, or a `SerializationError`.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::SerializationError(format!("reading previous txid: {}", e))
        })?;
        let vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading previous index: {}", e))
        })?;
        let script = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;
        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            previous_output: OutPoint::new(Hash::new(txid), vout),
            unlocking_script: Script::from_bytes(script),
            sequence_number,
            source_output: None,
        })
    }

    /// Serialize this input, substituting `script` for the unlocking script.
    pub(crate) fn write_with_script(&self, writer: &mut WireWriter, script: &[u8]) {
        writer.write_bytes(self.previous_output.txid.as_bytes());
        writer.write_u32_le(self.previous_output.vout);
        writer.write_var_bytes(script);
        writer.write_u32_le(self.sequence_number);
    }

    pub fn write_to(&self, writer: &mut WireWriter) {
        self.write_with_script(writer, self.unlocking_script.as_bytes());
    }
}
