//! Signing certificates and computing their digests.

use blockcert_primitives::ec::PrivateKey;
use blockcert_primitives::hash::sha256;

use crate::certificate::Certificate;
use crate::IssuerError;

/// The signed form of a certificate and the digest anchored on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    /// Canonical bytes of the signed certificate, as persisted.
    pub signed_bytes: Vec<u8>,
    /// SHA-256 of `signed_bytes`.
    pub digest: [u8; 32],
}

/// Digest a persisted signed certificate.
pub fn certificate_digest(signed_bytes: &[u8]) -> [u8; 32] {
    sha256(signed_bytes)
}

/// Signs certificates with the issuer's key.
pub struct CertificateCommitter<'a> {
    key: &'a PrivateKey,
}

impl<'a> CertificateCommitter<'a> {
    pub fn new(key: &'a PrivateKey) -> Self {
        CertificateCommitter { key }
    }

    /// Sign the certificate's claim identifier and digest the result.
    ///
    /// The signature is a signed message over `assertion.uid`, stored in the
    /// `signature` field, replacing any earlier one. Signing is deterministic,
    /// so committing the same document twice yields identical bytes.
    ///
    /// # Arguments
    /// * `cert` - The certificate; gains its `signature` field.
    ///
    /// # Returns
    /// The canonical signed bytes and their digest.
    pub fn commit(&self, cert: &mut Certificate) -> Result<Commitment, IssuerError> {
        let signature = blockcert_message::sign(cert.claim_id().as_bytes(), self.key)?;
        cert.set_signature(signature);

        let signed_bytes = cert.to_canonical_bytes()?;
        let digest = certificate_digest(&signed_bytes);
        tracing::debug!(
            uid = cert.uid(),
            digest = %hex::encode(digest),
            "committed certificate"
        );
        Ok(Commitment {
            signed_bytes,
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(claim: &str) -> Certificate {
        let json = format!(
            r#"{{"recipient": {{"givenName": "Ada", "familyName": "Lovelace", "pubkey": "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"}}, "assertion": {{"uid": "{}"}}}}"#,
            claim
        );
        Certificate::from_json("ada", json.as_bytes()).unwrap()
    }

    fn issuer() -> PrivateKey {
        PrivateKey::from_bytes(&sha256(b"issuer")).unwrap()
    }

    #[test]
    fn test_signature_verifies_for_issuer() {
        let key = issuer();
        let mut cert = doc("claim-1");
        CertificateCommitter::new(&key).commit(&mut cert).unwrap();
        let sig = cert.signature().unwrap();
        assert!(blockcert_message::verify(&key.address(), sig, b"claim-1").unwrap());

        let other = PrivateKey::from_bytes(&sha256(b"someone else")).unwrap();
        assert!(!blockcert_message::verify(&other.address(), sig, b"claim-1").unwrap());
    }

    #[test]
    fn test_digest_covers_signed_bytes() {
        let key = issuer();
        let mut cert = doc("claim-1");
        let commitment = CertificateCommitter::new(&key).commit(&mut cert).unwrap();
        assert_eq!(commitment.signed_bytes, cert.to_canonical_bytes().unwrap());
        assert_eq!(commitment.digest, sha256(&commitment.signed_bytes));
    }

    #[test]
    fn test_recommit_is_identical() {
        let key = issuer();
        let committer = CertificateCommitter::new(&key);
        let mut first = doc("claim-1");
        let a = committer.commit(&mut first).unwrap();

        // Already signed: the signature is replaced by an identical one.
        let b = committer.commit(&mut first).unwrap();
        assert_eq!(a, b);

        let mut fresh = doc("claim-1");
        assert_eq!(committer.commit(&mut fresh).unwrap(), a);
    }

    #[test]
    fn test_distinct_claims_distinct_digests() {
        let key = issuer();
        let committer = CertificateCommitter::new(&key);
        let a = committer.commit(&mut doc("claim-1")).unwrap();
        let b = committer.commit(&mut doc("claim-2")).unwrap();
        assert_ne!(a.digest, b.digest);
    }
}
