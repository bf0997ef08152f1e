//! Submitting signed certificate transactions.

use serde::{Deserialize, Serialize};

use blockcert_transaction::Transaction;

use crate::backend::Broadcaster;
use crate::IssuerError;

/// The identifier the network returned for a certificate's transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub uid: String,
    pub txid: String,
}

/// Submit `tx` for certificate `uid`.
///
/// A rejected submission is returned as-is and is not retried. The returned
/// identifier is recorded even if it differs from the locally computed txid,
/// which is only logged.
pub fn broadcast<B: Broadcaster + ?Sized>(
    broadcaster: &B,
    uid: &str,
    tx: &Transaction,
) -> Result<BroadcastRecord, IssuerError> {
    let local = tx.tx_id().to_string();
    let txid = broadcaster.submit(tx)?;
    if !txid.eq_ignore_ascii_case(&local) {
        tracing::warn!(uid, txid = %txid, local = %local, "network txid differs from local txid");
    }
    tracing::info!(uid, txid = %txid, "broadcast certificate transaction");
    Ok(BroadcastRecord {
        uid: uid.to_string(),
        txid,
    })
}
