//! Script templates for signing transaction inputs.
//!
//! Provides the `UnlockingScriptTemplate` trait and a P2PKH implementation.

pub mod p2pkh;

use blockcert_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// A signing strategy that produces unlocking scripts.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for the given input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// `Ok(Script)` containing the unlocking script, or an error on failure.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError>;

    /// Sign `input_index` and install the resulting unlocking script.
    fn sign_input(&self, tx: &mut Transaction, input_index: usize) -> Result<(), TransactionError> {
        let script = self.sign(tx, input_index)?;
        tx.inputs[input_index].unlocking_script = script;
        Ok(())
    }
}
