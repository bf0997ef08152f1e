//! Collaborator interfaces.
//!
//! The pipeline reaches the ledger only through these traits. They are
//! synchronous; network-backed implementations bridge onto an async
//! runtime themselves. Every failure is reported as
//! [`IssuerError::Collaborator`] and is fatal for the batch.

use std::fmt;

use blockcert_transaction::Transaction;

use crate::utxo::UnspentOutput;
use crate::IssuerError;

/// Hosted wallet used to move value from storage to the issuing address.
pub trait FundingService: Send + Sync {
    /// Open a session with the service's API key.
    fn login(&self, api_key: &str) -> Result<(), IssuerError>;

    /// Balance of `address` counting outputs with at least `confirmations`
    /// confirmations. `None` when the service reports no balance at all.
    fn balance(&self, address: &str, confirmations: u32) -> Result<Option<u64>, IssuerError>;

    /// Create a wallet address with the given label and return it.
    fn new_address(&self, label: &str) -> Result<String, IssuerError>;

    /// Pay every `(address, satoshis)` pair in one transaction from `from`.
    ///
    /// # Returns
    /// The service's reference for the transfer (usually a txid).
    fn send_many(
        &self,
        from: &str,
        recipients: &[(String, u64)],
        fee: u64,
    ) -> Result<String, IssuerError>;

    /// Pay `amount` satoshis from `from` to `to`.
    fn pay(&self, from: &str, to: &str, amount: u64, fee: u64) -> Result<String, IssuerError>;

    /// Archive (deactivate) a wallet address.
    fn archive(&self, address: &str) -> Result<(), IssuerError>;
}

/// Source of the unspent outputs locked to an address.
pub trait UnspentSource: Send + Sync {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError>;
}

/// Submits signed transactions to the network.
pub trait Broadcaster: Send + Sync {
    /// Broadcast `tx` and return the transaction id reported by the network.
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError>;
}

/// Which kind of ledger access a backend provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted wallet, explorer and broadcast APIs. Funding is available.
    Remote,
    /// A local full node over JSON-RPC. Funding is not available.
    LocalNode,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::LocalNode => write!(f, "local-node"),
        }
    }
}

/// Everything the batch runner needs from the ledger.
pub trait LedgerBackend: UnspentSource + Broadcaster {
    fn kind(&self) -> BackendKind;

    /// Confirmed balance of `address` in satoshis.
    fn confirmed_balance(&self, address: &str) -> Result<u64, IssuerError>;

    /// The funding service, when this backend has one.
    fn funding(&self) -> Option<&dyn FundingService>;
}
