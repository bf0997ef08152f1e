//! Signature hash computation for transaction signing.
//!
//! Two schemes are supported, both signing all inputs and all outputs:
//!
//! - **Legacy**: the original algorithm. The transaction is re-serialized
//!   with every unlocking script blanked except the signed input's, which
//!   is replaced by the spent output's script, and the 4-byte sighash type
//!   is appended before double hashing.
//! - **FORKID**: the BIP-143 style digest used after the UAHF fork, which
//!   also commits to the value being spent.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

use blockcert_primitives::hash::sha256d;
use blockcert_primitives::util::{WireWriter, VarInt};
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Replay-protection flag of the FORKID scheme.
pub const SIGHASH_FORKID: u32 = 0x40;

/// `SIGHASH_ALL | SIGHASH_FORKID`.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Which digest algorithm an input signature commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SighashScheme {
    /// Original algorithm with `SIGHASH_ALL` (0x01).
    #[default]
    Legacy,
    /// BIP-143 style algorithm with `SIGHASH_ALL | SIGHASH_FORKID` (0x41).
    ForkId,
}

impl SighashScheme {
    /// The sighash type committed to and appended to the DER signature.
    pub fn flag(self) -> u32 {
        match self {
            SighashScheme::Legacy => SIGHASH_ALL,
            SighashScheme::ForkId => SIGHASH_ALL_FORKID,
        }
    }

    /// Identify the scheme from the trailing byte of a script signature.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag as u32 {
            SIGHASH_ALL => Some(SighashScheme::Legacy),
            SIGHASH_ALL_FORKID => Some(SighashScheme::ForkId),
            _ => None,
        }
    }
}

fn check_index(tx: &Transaction, input_index: usize) -> Result<(), TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }
    Ok(())
}

/// Compute the legacy (pre-FORKID) signature hash for `SIGHASH_ALL`.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - Locking script of the output being spent.
/// * `sighash_type` - Appended as 4 little-endian bytes before hashing.
///
/// # Returns
/// A 32-byte double-SHA256 digest.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    check_index(tx, input_index)?;

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_varint(VarInt::from(tx.inputs.len()));
    for (i, input) in tx.inputs.iter().enumerate() {
        let script: &[u8] = if i == input_index { script_code } else { &[] };
        input.write_with_script(&mut writer, script);
    }
    tx.write_outputs(&mut writer);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(sha256d(&writer.into_bytes()))
}

/// Compute the BIP-143 style signature hash for `SIGHASH_ALL | FORKID`.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - Locking script of the output being spent.
/// * `sighash_type` - The combined sighash flags.
/// * `satoshis` - Value of the output being spent.
///
/// # Returns
/// A 32-byte double-SHA256 digest.
pub fn forkid_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = forkid_preimage(tx, input_index, script_code, sighash_type, satoshis)?;
    Ok(sha256d(&preimage))
}

/// Build the FORKID preimage before double hashing.
///
/// 1. nVersion
/// 2. hashPrevouts
/// 3. hashSequence
/// 4. outpoint of the signed input
/// 5. scriptCode (VarInt-prefixed)
/// 6. value of the spent output
/// 7. nSequence of the signed input
/// 8. hashOutputs
/// 9. nLocktime
/// 10. sighash type
pub fn forkid_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    check_index(tx, input_index)?;
    let input = &tx.inputs[input_index];

    let mut prevouts = WireWriter::with_capacity(tx.inputs.len() * 36);
    let mut sequences = WireWriter::with_capacity(tx.inputs.len() * 4);
    for i in &tx.inputs {
        prevouts.write_bytes(i.previous_output.txid.as_bytes());
        prevouts.write_u32_le(i.previous_output.vout);
        sequences.write_u32_le(i.sequence_number);
    }
    let mut outputs = WireWriter::new();
    for o in &tx.outputs {
        o.write_to(&mut outputs);
    }

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&sha256d(&prevouts.into_bytes()));
    writer.write_bytes(&sha256d(&sequences.into_bytes()));
    writer.write_bytes(input.previous_output.txid.as_bytes());
    writer.write_u32_le(input.previous_output.vout);
    writer.write_var_bytes(script_code);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&sha256d(&outputs.into_bytes()));
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}
