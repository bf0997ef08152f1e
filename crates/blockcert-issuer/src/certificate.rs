//! Certificate documents.
//!
//! A certificate is an arbitrary JSON object that must carry
//! `recipient.givenName`, `recipient.familyName`, `recipient.pubkey` (the
//! recipient's address) and `assertion.uid` (the claim identifier that the
//! issuer signs). Every other field is kept as-is.

use serde_json::{Map, Value};

use crate::IssuerError;

/// Name of the field the issuer's signature is stored under.
pub const SIGNATURE_FIELD: &str = "signature";

/// A certificate and the artifact key it is stored under.
#[derive(Clone, Debug, PartialEq)]
pub struct Certificate {
    uid: String,
    document: Map<String, Value>,
}

impl Certificate {
    /// Parse a certificate document.
    ///
    /// # Arguments
    /// * `uid` - Artifact key, usually the file stem of the unsigned certificate.
    /// * `json` - The raw JSON bytes.
    ///
    /// # Returns
    /// The certificate, or `InvalidCertificate` if a required field is
    /// missing or is not a string.
    pub fn from_json(uid: &str, json: &[u8]) -> Result<Self, IssuerError> {
        let value: Value = serde_json::from_slice(json).map_err(|e| {
            IssuerError::InvalidCertificate(format!("{}: not valid JSON: {}", uid, e))
        })?;
        let document = match value {
            Value::Object(map) => map,
            _ => {
                return Err(IssuerError::InvalidCertificate(format!(
                    "{}: top level is not an object",
                    uid
                )))
            }
        };
        let cert = Certificate {
            uid: uid.to_string(),
            document,
        };
        for path in [
            ["recipient", "givenName"],
            ["recipient", "familyName"],
            ["recipient", "pubkey"],
            ["assertion", "uid"],
        ] {
            cert.text(path)?;
        }
        Ok(cert)
    }

    fn text(&self, path: [&str; 2]) -> Result<&str, IssuerError> {
        self.document
            .get(path[0])
            .and_then(|v| v.get(path[1]))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                IssuerError::InvalidCertificate(format!(
                    "{}: missing string field {}.{}",
                    self.uid, path[0], path[1]
                ))
            })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The recipient's ledger address.
    pub fn recipient_address(&self) -> &str {
        self.text(["recipient", "pubkey"]).unwrap_or_default()
    }

    /// The claim identifier the issuer signs.
    pub fn claim_id(&self) -> &str {
        self.text(["assertion", "uid"]).unwrap_or_default()
    }

    pub fn signature(&self) -> Option<&str> {
        self.document.get(SIGNATURE_FIELD).and_then(Value::as_str)
    }

    pub fn set_signature(&mut self, signature: String) {
        self.document
            .insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
    }

    /// Canonical encoding: compact JSON with object keys sorted at every level.
    ///
    /// The certificate digest is taken over exactly these bytes, so two runs
    /// over the same document always hash the same.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, IssuerError> {
        let sorted = canonicalize(&Value::Object(self.document.clone()));
        Ok(serde_json::to_vec(&sorted)?)
    }
}

/// Rebuild `value` inserting object keys in sorted order, independent of
/// the map type `serde_json` was built with.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, item) in entries {
                sorted.insert(key.clone(), canonicalize(item));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
