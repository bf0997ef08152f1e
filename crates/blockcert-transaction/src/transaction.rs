//! Core transaction type.
//!
//! Represents a transaction with version, inputs, outputs and locktime,
//! with wire encoding, transaction ID computation and signature hashing.

use blockcert_primitives::chainhash::{double_hash_h, Hash};
use blockcert_primitives::util::{WireReader, WireWriter, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash::{self, SighashScheme};
use crate::TransactionError;

/// A transaction: version, inputs, outputs and lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Create an empty version 1 transaction with lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex is
    /// invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse exactly one transaction from `bytes`, rejecting trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `WireReader`.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = read_count(reader, "input")?;
        let mut inputs = Vec::with_capacity(input_count.min(1024));
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = read_count(reader, "output")?;
        let mut outputs = Vec::with_capacity(output_count.min(1024));
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction { version, inputs, outputs, lock_time })
    }

    /// Serialize to the standard wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }
        self.write_outputs(&mut writer);
        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    pub(crate) fn write_outputs(&self, writer: &mut WireWriter) {
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Transaction ID: SHA-256d of the serialized bytes.
    ///
    /// Use `to_string()` on the result for the conventional display form.
    pub fn tx_id(&self) -> Hash {
        double_hash_h(&self.to_bytes())
    }

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Sum of all output values.
    ///
    /// # Returns
    /// The total, or `None` on overflow.
    pub fn total_output_satoshis(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.satoshis))
    }

    /// Sum of the values of the outputs this transaction spends.
    ///
    /// # Returns
    /// The total, or an error if any input lacks its source output.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        let mut total = 0u64;
        for (index, input) in self.inputs.iter().enumerate() {
            let source = input.source_output().ok_or_else(|| {
                TransactionError::InvalidTransaction(format!(
                    "input {} has no source output",
                    index
                ))
            })?;
            total = total.checked_add(source.satoshis).ok_or_else(|| {
                TransactionError::InvalidTransaction("input value overflow".to_string())
            })?;
        }
        Ok(total)
    }

    /// Outputs carrying `OP_RETURN` data, with their indexes.
    pub fn data_outputs(&self) -> impl Iterator<Item = (usize, &TransactionOutput)> {
        self.outputs.iter().enumerate().filter(|(_, o)| o.is_data())
    }

    /// Compute the signature hash for one input under `scheme`.
    ///
    /// The input must carry its source output: its locking script is the
    /// script code, and its value is committed to by the FORKID scheme.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input being signed.
    /// * `scheme` - Legacy or FORKID hashing, both with `SIGHASH_ALL`.
    ///
    /// # Returns
    /// A 32-byte digest to be signed by ECDSA.
    pub fn signature_hash(
        &self,
        input_index: usize,
        scheme: SighashScheme,
    ) -> Result<[u8; 32], TransactionError> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                self.inputs.len()
            ))
        })?;
        let source = input.source_output().ok_or_else(|| {
            TransactionError::SigningError(format!(
                "input {} has no source output to sign against",
                input_index
            ))
        })?;

        let script_code = source.locking_script.as_bytes();
        match scheme {
            SighashScheme::Legacy => {
                sighash::legacy_signature_hash(self, input_index, script_code, scheme.flag())
            }
            SighashScheme::ForkId => sighash::forkid_signature_hash(
                self,
                input_index,
                script_code,
                scheme.flag(),
                source.satoshis,
            ),
        }
    }
}

fn read_count(reader: &mut WireReader, what: &str) -> Result<usize, TransactionError> {
    let count = reader.read_varint().map_err(|e| {
        TransactionError::SerializationError(format!("reading {} count: {}", what, e))
    })?;
    usize::try_from(count.value()).map_err(|_| {
        TransactionError::SerializationError(format!("{} count {} too large", what, count.value()))
    })
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
