//! Client configuration and wire types.

use serde::{Deserialize, Serialize};

/// Configuration for a [`MerchantClient`](crate::MerchantClient).
#[derive(Debug, Clone)]
pub struct MerchantConfig {
    /// Base URL of the wallet service (e.g. `http://localhost:3000`).
    pub base_url: String,
    /// Wallet identifier.
    pub wallet_guid: String,
    /// Main wallet password, sent with every call.
    pub password: String,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            wallet_guid: String::new(),
            password: String::new(),
        }
    }
}

/// Configuration for an [`ExplorerClient`](crate::ExplorerClient).
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Base URL of the explorer (e.g. `https://blockchain.info`).
    pub base_url: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blockchain.info".to_string(),
        }
    }
}

/// Configuration for an [`InsightClient`](crate::InsightClient).
#[derive(Debug, Clone)]
pub struct InsightConfig {
    /// Base URL of the Insight API (e.g. `https://insight.bitpay.com/api`).
    pub base_url: String,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://insight.bitpay.com/api".to_string(),
        }
    }
}

/// Configuration for a [`NodeRpcClient`](crate::NodeRpcClient).
#[derive(Debug, Clone)]
pub struct NodeRpcConfig {
    /// JSON-RPC endpoint of the node.
    pub url: String,
    /// RPC user name.
    pub user: String,
    /// RPC password.
    pub password: String,
}

impl Default for NodeRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8332".to_string(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Response of the explorer's `/unspent` query.
#[derive(Debug, Clone, Deserialize)]
pub struct UnspentResponse {
    /// The unspent outputs of the queried address.
    #[serde(default)]
    pub unspent_outputs: Vec<ExplorerUnspent>,
}

/// One unspent output as reported by the explorer.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerUnspent {
    /// Funding transaction hash in internal byte order.
    pub tx_hash: String,
    /// Output index.
    pub tx_output_n: u32,
    /// Locking script hex.
    pub script: String,
    /// Value in satoshis.
    pub value: u64,
}

/// Insight's `/tx/send` request body.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    /// Signed transaction hex.
    pub rawtx: &'a str,
}

/// Insight's `/tx/send` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    /// Id of the accepted transaction.
    pub txid: String,
}

/// A JSON-RPC 1.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    /// Always `"1.0"`.
    pub jsonrpc: &'static str,
    /// Request id echoed by the node.
    pub id: &'static str,
    /// RPC method name.
    pub method: &'a str,
    /// Positional parameters.
    pub params: serde_json::Value,
}

/// A JSON-RPC 1.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// The result as sent, absent or `null` on error.
    #[serde(default)]
    pub result: Option<Box<serde_json::value::RawValue>>,
    /// The error, `null` on success.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The error member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    /// Node error code.
    pub code: i64,
    /// Node error message.
    pub message: String,
}

/// One entry of the node's `listunspent` result.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeUnspent {
    /// Funding transaction id in display order.
    pub txid: String,
    /// Output index.
    pub vout: u32,
    /// Locking script hex.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    /// Value in coins, kept as written so it converts without rounding.
    pub amount: Box<serde_json::value::RawValue>,
    /// Confirmation count.
    #[serde(default)]
    pub confirmations: u64,
}
