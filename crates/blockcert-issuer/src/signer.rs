//! Signing certificate transactions with the issuer's key.

use blockcert_primitives::ec::PrivateKey;
use blockcert_transaction::template::{p2pkh, UnlockingScriptTemplate};
use blockcert_transaction::{SighashScheme, Transaction, TransactionError};

use crate::IssuerError;

/// Signs every input of a draft with one P2PKH key.
pub struct TransactionSigner {
    key: PrivateKey,
    scheme: SighashScheme,
}

impl TransactionSigner {
    pub fn new(key: PrivateKey, scheme: SighashScheme) -> Self {
        TransactionSigner { key, scheme }
    }

    /// The key in whichever encoding hashes to `public_key_hash`.
    fn key_for(&self, public_key_hash: &[u8; 20]) -> Option<PrivateKey> {
        [self.key.is_compressed(), !self.key.is_compressed()]
            .into_iter()
            .map(|compressed| self.key.clone().with_compression(compressed))
            .find(|key| &key.pub_key().hash160() == public_key_hash)
    }

    /// Sign `draft`, returning the signed copy.
    ///
    /// Each input must carry its source output, locked to P2PKH of the
    /// issuer's key. The signed input is checked before it is returned.
    ///
    /// # Returns
    /// The signed transaction, or `Signing` on a missing or non-P2PKH
    /// source output or a key/script mismatch.
    pub fn sign(&self, draft: &Transaction) -> Result<Transaction, IssuerError> {
        let mut tx = draft.clone();
        for index in 0..tx.inputs.len() {
            let source = tx.inputs[index].source_output().ok_or_else(|| {
                IssuerError::Signing(format!("input {} has no source output", index))
            })?;
            let expected = source.locking_script.public_key_hash().map_err(|_| {
                IssuerError::Signing(format!(
                    "input {} spends non-P2PKH script {}",
                    index, source.locking_script
                ))
            })?;
            let key = self.key_for(&expected).ok_or_else(|| {
                IssuerError::Signing(format!(
                    "key {} does not control input {} (script {})",
                    self.key.address(),
                    index,
                    source.locking_script
                ))
            })?;

            p2pkh::unlock(key, self.scheme)
                .sign_input(&mut tx, index)
                .map_err(signing_error)?;
            p2pkh::verify_input(&tx, index).map_err(signing_error)?;
        }
        Ok(tx)
    }
}

fn signing_error(err: TransactionError) -> IssuerError {
    match err {
        TransactionError::SigningError(msg) => IssuerError::Signing(msg),
        other => IssuerError::Signing(other.to_string()),
    }
}
