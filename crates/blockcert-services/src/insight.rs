//! Insight API client for broadcasting.

use blockcert_issuer::{Broadcaster, IssuerError};
use blockcert_transaction::Transaction;

use crate::error::ServiceError;
use crate::runtime::call_sync;
use crate::types::{InsightConfig, SendRequest, SendResponse};

/// HTTP client for Insight's `/tx/send`.
#[derive(Debug, Clone)]
pub struct InsightClient {
    /// Client configuration.
    config: InsightConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl InsightClient {
    /// Create a new Insight client with the given configuration.
    pub fn new(config: InsightConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    /// Broadcast a transaction and return the txid Insight reports.
    pub async fn send_async(&self, tx: &Transaction) -> Result<String, ServiceError> {
        let url = format!("{}/tx/send", self.config.base_url);
        let rawtx = tx.to_hex();

        let resp = self
            .client
            .post(&url)
            .json(&SendRequest { rawtx: &rawtx })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(ServiceError::Rejected {
                operation: "tx/send".to_string(),
                status: i64::from(status.as_u16()),
                message,
            });
        }

        let response: SendResponse = resp.json().await?;
        Ok(response.txid)
    }
}

impl Broadcaster for InsightClient {
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError> {
        call_sync("tx/send", self.send_async(tx))
    }
}
