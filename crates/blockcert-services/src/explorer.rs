//! Explorer client for the unspent outputs of an address.

use blockcert_issuer::{IssuerError, UnspentOutput, UnspentSource};
use blockcert_primitives::chainhash::Hash;
use blockcert_script::Script;
use blockcert_transaction::OutPoint;

use crate::error::ServiceError;
use crate::runtime::call_sync;
use crate::types::{ExplorerConfig, ExplorerUnspent, UnspentResponse};

/// Body text the explorer answers with when an address has no outputs.
const NO_OUTPUTS: &str = "No free outputs to spend";

/// HTTP client for the explorer's `/unspent` endpoint.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    /// Client configuration.
    config: ExplorerConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl ExplorerClient {
    /// Create a new explorer client with the given configuration.
    pub fn new(config: ExplorerConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    /// Unspent outputs of `address`, in the order the explorer lists them.
    pub async fn unspent_async(&self, address: &str) -> Result<Vec<UnspentOutput>, ServiceError> {
        let url = format!("{}/unspent", self.config.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("active", address), ("format", "json")])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            if text.contains(NO_OUTPUTS) {
                return Ok(Vec::new());
            }
            return Err(ServiceError::Rejected {
                operation: "unspent".to_string(),
                status: i64::from(status.as_u16()),
                message: text,
            });
        }

        let response: UnspentResponse = serde_json::from_str(&text)?;
        let outputs = response
            .unspent_outputs
            .iter()
            .map(to_unspent)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(address, count = outputs.len(), "fetched unspent outputs");
        Ok(outputs)
    }
}

/// `tx_hash` is already in internal byte order, so it is not reversed.
fn to_unspent(entry: &ExplorerUnspent) -> Result<UnspentOutput, ServiceError> {
    let bytes = hex::decode(&entry.tx_hash)
        .map_err(|e| ServiceError::malformed("unspent", format!("tx_hash: {}", e)))?;
    let txid = Hash::from_bytes(&bytes)
        .map_err(|e| ServiceError::malformed("unspent", e.to_string()))?;
    let script = Script::from_hex(&entry.script)
        .map_err(|e| ServiceError::malformed("unspent", format!("script: {}", e)))?;
    Ok(UnspentOutput::new(
        OutPoint::new(txid, entry.tx_output_n),
        script,
        entry.value,
    ))
}

impl UnspentSource for ExplorerClient {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError> {
        call_sync("unspent", self.unspent_async(address))
    }
}
