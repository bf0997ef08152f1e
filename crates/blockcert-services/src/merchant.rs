//! Hosted wallet (merchant API) client.
//!
//! Every command is a `GET {base}/merchant/{guid}/{command}` carrying the
//! wallet password and the command's parameters in the query string. A
//! non-success status carries the reason in the body's `error` field.

use serde_json::{Map, Value};

use blockcert_issuer::{FundingService, IssuerError};

use crate::error::ServiceError;
use crate::runtime::call_sync;
use crate::types::MerchantConfig;

/// HTTP client for the hosted wallet's merchant API.
#[derive(Debug, Clone)]
pub struct MerchantClient {
    /// Client configuration.
    config: MerchantConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl MerchantClient {
    /// Create a new merchant client with the given configuration.
    pub fn new(config: MerchantConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    async fn call(&self, command: &str, params: &[(&str, String)]) -> Result<Value, ServiceError> {
        let url = format!(
            "{}/merchant/{}/{}",
            self.config.base_url, self.config.wallet_guid, command
        );
        tracing::debug!(command, "merchant api call");

        let resp = self
            .client
            .get(&url)
            .query(&[("password", self.config.password.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(String::from))
                .unwrap_or(text);
            return Err(ServiceError::Rejected {
                operation: command.to_string(),
                status: i64::from(status.as_u16()),
                message,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn field(command: &str, body: &Value, name: &str) -> Result<String, ServiceError> {
        body.get(name)
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ServiceError::malformed(command, format!("missing {}", name)))
    }

    /// Enable API access for the session with `api_code`.
    pub async fn login_async(&self, api_code: &str) -> Result<(), ServiceError> {
        self.call("login", &[("api_code", api_code.to_string())])
            .await
            .map(|_| ())
    }

    /// Balance of `address` counting outputs with at least `confirmations`
    /// confirmations. `None` if the response carries no balance.
    pub async fn balance_async(
        &self,
        address: &str,
        confirmations: u32,
    ) -> Result<Option<u64>, ServiceError> {
        let body = self
            .call(
                "address_balance",
                &[
                    ("address", address.to_string()),
                    ("confirmations", confirmations.to_string()),
                ],
            )
            .await?;
        Ok(body.get("balance").and_then(Value::as_u64))
    }

    /// Generate a labelled wallet address.
    pub async fn new_address_async(&self, label: &str) -> Result<String, ServiceError> {
        let body = self
            .call("new_address", &[("label", label.to_string())])
            .await?;
        Self::field("new_address", &body, "address")
    }

    /// Pay several recipients in one transaction.
    ///
    /// # Arguments
    /// * `from` - Wallet address to spend from.
    /// * `recipients` - `(address, satoshis)` pairs, sent as a JSON object.
    /// * `fee` - Fee in satoshis.
    ///
    /// # Returns
    /// The transaction hash reported by the wallet.
    pub async fn send_many_async(
        &self,
        from: &str,
        recipients: &[(String, u64)],
        fee: u64,
    ) -> Result<String, ServiceError> {
        let recipients: Map<String, Value> = recipients
            .iter()
            .map(|(address, amount)| (address.clone(), Value::from(*amount)))
            .collect();
        let body = self
            .call(
                "sendmany",
                &[
                    ("from", from.to_string()),
                    ("recipients", serde_json::to_string(&recipients)?),
                    ("fee", fee.to_string()),
                ],
            )
            .await?;
        Self::field("sendmany", &body, "tx_hash")
    }

    /// Pay a single recipient.
    pub async fn payment_async(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        fee: u64,
    ) -> Result<String, ServiceError> {
        let body = self
            .call(
                "payment",
                &[
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                    ("amount", amount.to_string()),
                    ("fee", fee.to_string()),
                ],
            )
            .await?;
        Self::field("payment", &body, "tx_hash")
    }

    /// Archive a wallet address.
    pub async fn archive_address_async(&self, address: &str) -> Result<(), ServiceError> {
        self.call("archive_address", &[("address", address.to_string())])
            .await
            .map(|_| ())
    }
}

impl FundingService for MerchantClient {
    fn login(&self, api_key: &str) -> Result<(), IssuerError> {
        call_sync("login", self.login_async(api_key))
    }

    fn balance(&self, address: &str, confirmations: u32) -> Result<Option<u64>, IssuerError> {
        call_sync("address_balance", self.balance_async(address, confirmations))
    }

    fn new_address(&self, label: &str) -> Result<String, IssuerError> {
        call_sync("new_address", self.new_address_async(label))
    }

    fn send_many(
        &self,
        from: &str,
        recipients: &[(String, u64)],
        fee: u64,
    ) -> Result<String, IssuerError> {
        call_sync("sendmany", self.send_many_async(from, recipients, fee))
    }

    fn pay(&self, from: &str, to: &str, amount: u64, fee: u64) -> Result<String, IssuerError> {
        call_sync("payment", self.payment_async(from, to, amount, fee))
    }

    fn archive(&self, address: &str) -> Result<(), IssuerError> {
        call_sync("archive_address", self.archive_address_async(address))
    }
}
