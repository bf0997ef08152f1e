//! Ledger backends assembled from the service clients.

use blockcert_issuer::{
    BackendKind, Broadcaster, FundingService, IssuerError, LedgerBackend, UnspentOutput,
    UnspentSource,
};
use blockcert_transaction::Transaction;

use crate::explorer::ExplorerClient;
use crate::insight::InsightClient;
use crate::merchant::MerchantClient;
use crate::node::NodeRpcClient;
use crate::runtime::call_sync;
use crate::types::{ExplorerConfig, InsightConfig, MerchantConfig, NodeRpcConfig};

/// Hosted services: the wallet funds and reports balances, the explorer
/// lists unspent outputs and Insight broadcasts.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    merchant: MerchantClient,
    explorer: ExplorerClient,
    insight: InsightClient,
}

impl RemoteBackend {
    /// Create a backend from the three client configurations.
    pub fn new(merchant: MerchantConfig, explorer: ExplorerConfig, insight: InsightConfig) -> Self {
        Self {
            merchant: MerchantClient::new(merchant),
            explorer: ExplorerClient::new(explorer),
            insight: InsightClient::new(insight),
        }
    }
}

impl UnspentSource for RemoteBackend {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError> {
        self.explorer.list_unspent(address)
    }
}

impl Broadcaster for RemoteBackend {
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError> {
        self.insight.submit(tx)
    }
}

impl LedgerBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn confirmed_balance(&self, address: &str) -> Result<u64, IssuerError> {
        Ok(self.merchant.balance(address, 1)?.unwrap_or(0))
    }

    fn funding(&self) -> Option<&dyn FundingService> {
        Some(&self.merchant)
    }
}

/// A local full node reached over JSON-RPC.
#[derive(Debug, Clone)]
pub struct LocalNodeBackend {
    node: NodeRpcClient,
}

impl LocalNodeBackend {
    /// Create a backend talking to the node described by `config`.
    pub fn new(config: NodeRpcConfig) -> Self {
        Self {
            node: NodeRpcClient::new(config),
        }
    }
}

impl UnspentSource for LocalNodeBackend {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError> {
        self.node.list_unspent(address)
    }
}

impl Broadcaster for LocalNodeBackend {
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError> {
        self.node.submit(tx)
    }
}

impl LedgerBackend for LocalNodeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalNode
    }

    /// Sum of the outputs with at least one confirmation.
    fn confirmed_balance(&self, address: &str) -> Result<u64, IssuerError> {
        let outputs = call_sync("listunspent", self.node.list_unspent_async(address, 1))?;
        Ok(outputs
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.value)))
    }

    fn funding(&self) -> Option<&dyn FundingService> {
        None
    }
}
