//! Certificate transaction construction.
//!
//! Output layout, in order:
//!
//! | # | value            | script                      |
//! |---|------------------|-----------------------------|
//! | 0 | dust             | recipient P2PKH             |
//! | 1 | dust             | revocation P2PKH            |
//! | 2 | input − cost     | issuer P2PKH (only if > 0)  |
//! | 3 | 0                | `OP_RETURN <32-byte digest>` |
//!
//! where `cost = 2·dust + fee`.

use blockcert_script::Script;
use blockcert_transaction::{Transaction, TransactionInput, TransactionOutput};

use crate::amount::FeeSchedule;
use crate::utxo::UnspentOutput;
use crate::IssuerError;

/// Builds one unsigned transaction per certificate.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    fees: FeeSchedule,
    revocation_script: Script,
    change_script: Script,
}

impl TransactionBuilder {
    /// # Arguments
    /// * `fees` - Dust floor and fee.
    /// * `revocation_script` - Locking script of the revocation address.
    /// * `change_script` - The issuer's own locking script.
    pub fn new(fees: FeeSchedule, revocation_script: Script, change_script: Script) -> Self {
        TransactionBuilder {
            fees,
            revocation_script,
            change_script,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Build the draft spending `input` and committing to `digest`.
    ///
    /// The input carries its source output so the draft can be signed
    /// directly.
    ///
    /// # Returns
    /// The unsigned transaction, or `InsufficientFunds` when the input is
    /// worth less than `2·dust + fee`.
    pub fn build(
        &self,
        input: &UnspentOutput,
        recipient_script: &Script,
        digest: &[u8; 32],
    ) -> Result<Transaction, IssuerError> {
        let cost = self.fees.certificate_cost()?;
        let change = input
            .value
            .checked_sub(cost)
            .ok_or(IssuerError::InsufficientFunds {
                required: cost,
                available: input.value,
            })?;

        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::spending(input.outpoint, input.to_output()));
        tx.add_output(TransactionOutput::new(self.fees.dust, recipient_script.clone()));
        tx.add_output(TransactionOutput::new(
            self.fees.dust,
            self.revocation_script.clone(),
        ));
        if change > 0 {
            tx.add_output(TransactionOutput::new(change, self.change_script.clone()));
        }
        tx.add_output(TransactionOutput::new(0, Script::op_return(digest)?));

        tracing::debug!(
            outpoint = %input.outpoint,
            input_value = input.value,
            change,
            "built certificate transaction"
        );
        Ok(tx)
    }
}
