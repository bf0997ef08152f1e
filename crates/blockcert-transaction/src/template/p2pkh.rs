//! Pay-to-Public-Key-Hash (P2PKH) signing and checking.
//!
//! Unlocking scripts have the form `<DER signature || sighash byte> <pubkey>`,
//! where the public key is in whichever SEC1 encoding hashes to the
//! spent script's public key hash.

use blockcert_primitives::ec::{PrivateKey, PublicKey, Signature};
use blockcert_script::Script;

use crate::sighash::SighashScheme;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Create a P2PKH unlocker for `private_key` under `scheme`.
pub fn unlock(private_key: PrivateKey, scheme: SighashScheme) -> P2PKH {
    P2PKH { private_key, scheme }
}

/// P2PKH signing template holding a private key and sighash scheme.
pub struct P2PKH {
    private_key: PrivateKey,
    scheme: SighashScheme,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input after checking that the key matches its spent script.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// The unlocking script, or `SigningError` when the source output is
    /// missing, is not P2PKH, or is locked to a different key.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let input = tx.inputs.get(input_index).ok_or_else(|| {
            TransactionError::SigningError(format!(
                "input index {} out of range (tx has {} inputs)",
                input_index,
                tx.inputs.len()
            ))
        })?;
        let source = input.source_output().ok_or_else(|| {
            TransactionError::SigningError(format!("input {} has no source output", input_index))
        })?;
        let expected = source.locking_script.public_key_hash().map_err(|_| {
            TransactionError::SigningError(format!(
                "input {} spends a non-P2PKH script {}",
                input_index, source.locking_script
            ))
        })?;

        let pub_key = self.private_key.pub_key();
        if pub_key.hash160() != expected {
            return Err(TransactionError::SigningError(format!(
                "key {} does not match the script guarding input {}",
                self.private_key.address(),
                input_index
            )));
        }

        let sig_hash = tx.signature_hash(input_index, self.scheme)?;
        let signature = self.private_key.sign(&sig_hash)?;

        let mut sig_buf = signature.to_der();
        sig_buf.push(self.scheme.flag() as u8);

        let mut script = Script::new();
        script.append_push_data(&sig_buf)?;
        script.append_push_data(&pub_key.to_bytes())?;
        Ok(script)
    }
}

/// Check the unlocking script of a signed P2PKH input.
///
/// Confirms the pushed key hashes to the spent script's public key hash and
/// the signature is valid for the scheme named by its trailing sighash byte.
///
/// # Arguments
/// * `tx` - A signed transaction whose input carries its source output.
/// * `input_index` - The input to check.
///
/// # Returns
/// `Ok(())` when the input is properly signed, `SigningError` otherwise.
pub fn verify_input(tx: &Transaction, input_index: usize) -> Result<(), TransactionError> {
    let fail = |reason: &str| {
        TransactionError::SigningError(format!("input {}: {}", input_index, reason))
    };

    let input = tx
        .inputs
        .get(input_index)
        .ok_or_else(|| fail("index out of range"))?;
    let source = input.source_output().ok_or_else(|| fail("no source output"))?;
    let expected = source
        .locking_script
        .public_key_hash()
        .map_err(|_| fail("source output is not P2PKH"))?;

    let chunks = input.unlocking_script.chunks()?;
    let (sig_push, key_push) = match chunks.as_slice() {
        [s, k] => (
            s.data.as_deref().ok_or_else(|| fail("missing signature push"))?,
            k.data.as_deref().ok_or_else(|| fail("missing public key push"))?,
        ),
        _ => return Err(fail("unlocking script is not <sig> <pubkey>")),
    };

    let (flag, der) = sig_push.split_last().ok_or_else(|| fail("empty signature"))?;
    let scheme = SighashScheme::from_flag(*flag).ok_or_else(|| fail("unsupported sighash type"))?;
    let pub_key = PublicKey::from_bytes(key_push)?;
    if pub_key.hash160() != expected {
        return Err(fail("public key does not match the spent script"));
    }

    let signature = Signature::from_der(der)?;
    let sig_hash = tx.signature_hash(input_index, scheme)?;
    if !pub_key.verify(&sig_hash, &signature) {
        return Err(fail("signature does not verify"));
    }
    Ok(())
}
