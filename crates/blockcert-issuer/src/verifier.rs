//! Cross-checking a signed transaction against its certificate.

use blockcert_transaction::Transaction;

use crate::certificate::Certificate;
use crate::committer::certificate_digest;
use crate::{IssuerError, VerificationCheck};

/// Checks certificates against the issuer's address.
#[derive(Clone, Debug)]
pub struct TransactionVerifier {
    issuer_address: String,
}

impl TransactionVerifier {
    pub fn new(issuer_address: impl Into<String>) -> Self {
        TransactionVerifier {
            issuer_address: issuer_address.into(),
        }
    }

    /// Run both checks; the first failure is returned.
    ///
    /// # Arguments
    /// * `cert` - The signed certificate.
    /// * `signed_bytes` - The persisted signed certificate bytes.
    /// * `signed_tx` - The signed transaction that should commit to them.
    pub fn verify(
        &self,
        cert: &Certificate,
        signed_bytes: &[u8],
        signed_tx: &Transaction,
    ) -> Result<(), IssuerError> {
        let fail = |check| IssuerError::Verification {
            uid: cert.uid().to_string(),
            check,
        };
        if !self.signature_matches(cert) {
            return Err(fail(VerificationCheck::Signature));
        }
        if !commitment_matches(signed_bytes, signed_tx) {
            return Err(fail(VerificationCheck::Commitment));
        }
        tracing::info!(uid = cert.uid(), "verified signature and commitment");
        Ok(())
    }

    /// Whether the certificate's signature over its claim id was made by
    /// the issuer. Malformed signatures count as a mismatch.
    pub fn signature_matches(&self, cert: &Certificate) -> bool {
        let Some(signature) = cert.signature() else {
            return false;
        };
        match blockcert_message::verify(&self.issuer_address, signature, cert.claim_id().as_bytes()) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(uid = cert.uid(), error = %e, "unreadable certificate signature");
                false
            }
        }
    }
}

/// The 32-byte payload of the first data output, read back from the
/// transaction's wire encoding.
pub fn embedded_digest(signed_tx: &Transaction) -> Option<[u8; 32]> {
    let decoded = Transaction::from_bytes(&signed_tx.to_bytes()).ok()?;
    let payload = decoded
        .data_outputs()
        .find_map(|(_, output)| output.locking_script.data_payload())?;
    payload.try_into().ok()
}

/// Whether `signed_tx` commits to the digest of `signed_bytes`.
pub fn commitment_matches(signed_bytes: &[u8], signed_tx: &Transaction) -> bool {
    embedded_digest(signed_tx) == Some(certificate_digest(signed_bytes))
}
