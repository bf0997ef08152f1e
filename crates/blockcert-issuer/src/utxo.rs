//! Unspent outputs and per-batch input selection.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use blockcert_script::Script;
use blockcert_transaction::{OutPoint, TransactionOutput};

use crate::IssuerError;

/// An output locked to the issuing address that can fund one certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub outpoint: OutPoint,
    /// Locking script of the output.
    pub script: Script,
    /// Value in satoshis.
    pub value: u64,
}

impl UnspentOutput {
    pub fn new(outpoint: OutPoint, script: Script, value: u64) -> Self {
        UnspentOutput {
            outpoint,
            script,
            value,
        }
    }

    /// The output as it appears in its source transaction.
    pub fn to_output(&self) -> TransactionOutput {
        TransactionOutput::new(self.value, self.script.clone())
    }
}

/// Largest value first, then by outpoint.
fn selection_order(a: &UnspentOutput, b: &UnspentOutput) -> Ordering {
    b.value
        .cmp(&a.value)
        .then_with(|| a.outpoint.cmp(&b.outpoint))
}

/// Work queue of spendable outputs for one batch.
///
/// Outputs are handed out in a stable order and each outpoint at most once:
/// taken outpoints are remembered, and refreshing the queue from a new
/// unspent query never brings them back.
#[derive(Debug, Default)]
pub struct UtxoPool {
    queue: VecDeque<UnspentOutput>,
    spent: HashSet<OutPoint>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with `outputs`, minus anything already taken.
    pub fn refresh(&mut self, outputs: Vec<UnspentOutput>) {
        let mut seen = HashSet::new();
        let mut fresh: Vec<UnspentOutput> = outputs
            .into_iter()
            .filter(|u| !self.spent.contains(&u.outpoint) && seen.insert(u.outpoint))
            .collect();
        fresh.sort_by(selection_order);
        self.queue = fresh.into();
    }

    /// Take the next output, marking it spent.
    pub fn take(&mut self) -> Result<UnspentOutput, IssuerError> {
        let next = self.queue.pop_front().ok_or(IssuerError::NoAvailableInput)?;
        self.spent.insert(next.outpoint);
        Ok(next)
    }

    /// Number of outputs still available.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total value still available.
    pub fn available_value(&self) -> u64 {
        self.queue.iter().map(|u| u.value).fold(0, u64::saturating_add)
    }
}
