//! Local full node over JSON-RPC 1.0.

use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::value::RawValue;

use blockcert_issuer::{Amount, Broadcaster, IssuerError, UnspentOutput, UnspentSource};
use blockcert_primitives::chainhash::Hash;
use blockcert_script::Script;
use blockcert_transaction::{OutPoint, Transaction};

use crate::error::ServiceError;
use crate::runtime::call_sync;
use crate::types::{NodeRpcConfig, NodeUnspent, RpcRequest, RpcResponse};

/// Widest confirmation range `listunspent` accepts.
const MAX_CONFIRMATIONS: u64 = 9_999_999;

/// JSON-RPC client for a local node's wallet.
#[derive(Debug, Clone)]
pub struct NodeRpcClient {
    /// Client configuration.
    config: NodeRpcConfig,
    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl NodeRpcClient {
    /// Create a new node client with the given configuration.
    pub fn new(config: NodeRpcConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    /// Call `method` with positional `params` and decode its result.
    ///
    /// The node answers RPC errors with a non-success status and a JSON body,
    /// so the body is read before the status is checked. The result is
    /// decoded from its original text, so amounts keep their exact digits.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "blockcert",
            method,
            params,
        };
        let resp = self
            .client
            .post(&self.config.url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let response = match serde_json::from_str::<RpcResponse>(&text) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                return Err(ServiceError::Rejected {
                    operation: method.to_string(),
                    status: i64::from(status.as_u16()),
                    message: text,
                })
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(error) = response.error {
            return Err(ServiceError::Rejected {
                operation: method.to_string(),
                status: error.code,
                message: error.message,
            });
        }
        let result = response.result.as_deref().map_or("null", RawValue::get);
        Ok(serde_json::from_str(result)?)
    }

    /// Unspent outputs of `address` with at least `min_confirmations`.
    pub async fn list_unspent_async(
        &self,
        address: &str,
        min_confirmations: u64,
    ) -> Result<Vec<UnspentOutput>, ServiceError> {
        let entries: Vec<NodeUnspent> = self
            .call(
                "listunspent",
                json!([min_confirmations, MAX_CONFIRMATIONS, [address]]),
            )
            .await?;
        entries.iter().map(to_unspent).collect()
    }

    /// Submit a signed transaction and return its txid.
    pub async fn send_raw_transaction_async(&self, tx: &Transaction) -> Result<String, ServiceError> {
        let result: Option<String> = self
            .call("sendrawtransaction", json!([tx.to_hex()]))
            .await?;
        result.ok_or_else(|| ServiceError::malformed("sendrawtransaction", "result is not a txid"))
    }
}

fn to_unspent(entry: &NodeUnspent) -> Result<UnspentOutput, ServiceError> {
    let txid = Hash::from_hex(&entry.txid)
        .map_err(|e| ServiceError::malformed("listunspent", format!("txid: {}", e)))?;
    let script = Script::from_hex(&entry.script_pub_key)
        .map_err(|e| ServiceError::malformed("listunspent", format!("scriptPubKey: {}", e)))?;
    Ok(UnspentOutput::new(
        OutPoint::new(txid, entry.vout),
        script,
        to_satoshis(&entry.amount)?,
    ))
}

/// Convert a coin amount, as written by the node, to satoshis.
fn to_satoshis(amount: &RawValue) -> Result<u64, ServiceError> {
    amount
        .get()
        .parse::<Amount>()
        .map(Amount::to_sat)
        .map_err(|e| ServiceError::malformed("listunspent", format!("amount: {}", e)))
}

impl UnspentSource for NodeRpcClient {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError> {
        call_sync("listunspent", self.list_unspent_async(address, 0))
    }
}

impl Broadcaster for NodeRpcClient {
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError> {
        call_sync("sendrawtransaction", self.send_raw_transaction_async(tx))
    }
}
