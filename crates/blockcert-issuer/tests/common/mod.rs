#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use blockcert_issuer::airgap::ConnectivityProbe;
use blockcert_issuer::{
    BackendKind, Broadcaster, FundingService, IssuerConfig, IssuerError, KeySource,
    LedgerBackend, MemoryStore, UnspentOutput, UnspentSource,
};
use blockcert_primitives::chainhash::Hash;
use blockcert_primitives::ec::PrivateKey;
use blockcert_script::Address;
use blockcert_transaction::{OutPoint, Transaction};

pub fn key(seed: u8) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[31] = seed;
    PrivateKey::from_bytes(&bytes).unwrap()
}

pub fn issuer_key() -> PrivateKey {
    key(1)
}

pub fn address_of(seed: u8) -> String {
    key(seed).address()
}

pub fn config() -> IssuerConfig {
    IssuerConfig {
        issuing_address: address_of(1),
        revocation_address: address_of(2),
        storage_address: address_of(3),
        ..IssuerConfig::default()
    }
}

pub fn certificate_json(recipient_seed: u8, claim: &str) -> Vec<u8> {
    format!(
        r#"{{
            "@context": "https://w3id.org/openbadges/v1",
            "recipient": {{"givenName": "Ada", "familyName": "Lovelace", "pubkey": "{}"}},
            "assertion": {{"uid": "{}", "issuedOn": "2016-05-01"}},
            "badge": {{"name": "Certificate of Accomplishment"}}
        }}"#,
        address_of(recipient_seed),
        claim
    )
    .into_bytes()
}

/// A store holding `count` certificates with uids `cert-0`, `cert-1`, ...
pub fn store_with(count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..count {
        store
            .insert_unsigned(
                &format!("cert-{}", i),
                &certificate_json(10 + i as u8, &format!("claim-{}", i)),
            )
            .unwrap();
    }
    store
}

/// Unspent outputs of the issuing address with the given values.
pub fn issuing_outputs(values: &[u64]) -> Vec<UnspentOutput> {
    let script = Address::from_string(&address_of(1))
        .unwrap()
        .locking_script();
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            UnspentOutput::new(
                OutPoint::new(Hash::new([i as u8 + 1; 32]), i as u32),
                script.clone(),
                *value,
            )
        })
        .collect()
}

/// Ledger double that records every call in order.
pub struct MockLedger {
    kind: BackendKind,
    unspent: Mutex<Vec<UnspentOutput>>,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Transaction>>,
    /// Zero-based submission that is rejected.
    reject_submission: Option<usize>,
    /// Balance reported for every address and confirmation count.
    balance: Option<u64>,
    fail_operation: Option<&'static str>,
}

impl MockLedger {
    pub fn remote(unspent: Vec<UnspentOutput>) -> Self {
        MockLedger {
            kind: BackendKind::Remote,
            unspent: Mutex::new(unspent),
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            reject_submission: None,
            balance: Some(100_000),
            fail_operation: None,
        }
    }

    pub fn local(unspent: Vec<UnspentOutput>) -> Self {
        MockLedger {
            kind: BackendKind::LocalNode,
            ..Self::remote(unspent)
        }
    }

    pub fn rejecting_submission(mut self, index: usize) -> Self {
        self.reject_submission = Some(index);
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.fail_operation = Some(operation);
        self
    }

    pub fn with_balance(mut self, balance: Option<u64>) -> Self {
        self.balance = balance;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: String) -> Result<(), IssuerError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_operation == Some(operation) {
            return Err(IssuerError::collaborator(operation, "service unavailable"));
        }
        Ok(())
    }
}

impl FundingService for MockLedger {
    fn login(&self, api_key: &str) -> Result<(), IssuerError> {
        self.record("login", format!("login {}", api_key))
    }

    fn balance(&self, address: &str, confirmations: u32) -> Result<Option<u64>, IssuerError> {
        self.record("balance", format!("balance {} {}", address, confirmations))?;
        Ok(self.balance)
    }

    fn new_address(&self, label: &str) -> Result<String, IssuerError> {
        self.record("new_address", format!("new_address {}", label))?;
        Ok(format!("addr-{}", label))
    }

    fn send_many(
        &self,
        from: &str,
        recipients: &[(String, u64)],
        fee: u64,
    ) -> Result<String, IssuerError> {
        let list: Vec<String> = recipients
            .iter()
            .map(|(address, amount)| format!("{}={}", address, amount))
            .collect();
        self.record(
            "send_many",
            format!("send_many {} [{}] {}", from, list.join(","), fee),
        )?;
        Ok("split-tx".to_string())
    }

    fn pay(&self, from: &str, to: &str, amount: u64, fee: u64) -> Result<String, IssuerError> {
        self.record("pay", format!("pay {} {} {} {}", from, to, amount, fee))?;
        Ok(format!("pay-{}", from))
    }

    fn archive(&self, address: &str) -> Result<(), IssuerError> {
        self.record("archive", format!("archive {}", address))
    }
}

impl UnspentSource for MockLedger {
    fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, IssuerError> {
        self.record("list_unspent", format!("list_unspent {}", address))?;
        Ok(self.unspent.lock().unwrap().clone())
    }
}

impl Broadcaster for MockLedger {
    fn submit(&self, tx: &Transaction) -> Result<String, IssuerError> {
        let txid = tx.tx_id().to_string();
        self.record("submit", format!("submit {}", txid))?;
        let mut submitted = self.submitted.lock().unwrap();
        if self.reject_submission == Some(submitted.len()) {
            return Err(IssuerError::collaborator("tx/send", "bad-txns-inputs-spent"));
        }
        submitted.push(tx.clone());
        Ok(txid)
    }
}

impl LedgerBackend for MockLedger {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn confirmed_balance(&self, address: &str) -> Result<u64, IssuerError> {
        self.record("confirmed_balance", format!("confirmed_balance {}", address))?;
        Ok(self.unspent.lock().unwrap().iter().map(|u| u.value).sum())
    }

    fn funding(&self) -> Option<&dyn FundingService> {
        match self.kind {
            BackendKind::Remote => Some(self),
            BackendKind::LocalNode => None,
        }
    }
}

/// Answers connectivity checks from a script; the last answer repeats.
pub struct ScriptedProbe {
    answers: Mutex<VecDeque<bool>>,
    given: Mutex<Vec<bool>>,
}

impl ScriptedProbe {
    pub fn new(answers: &[bool]) -> Self {
        ScriptedProbe {
            answers: Mutex::new(answers.iter().copied().collect()),
            given: Mutex::new(Vec::new()),
        }
    }

    pub fn online() -> Self {
        Self::new(&[true])
    }

    /// Every answer given so far, in order.
    pub fn given(&self) -> Vec<bool> {
        self.given.lock().unwrap().clone()
    }
}

impl ConnectivityProbe for ScriptedProbe {
    fn is_online(&self) -> bool {
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front().unwrap_or(true)
        } else {
            answers.front().copied().unwrap_or(true)
        };
        self.given.lock().unwrap().push(answer);
        answer
    }
}

/// Key source that notes the probe's latest answer each time the key is
/// loaded.
pub struct WatchedKeys<'p> {
    key: PrivateKey,
    probe: &'p ScriptedProbe,
    loads: Arc<Mutex<Vec<Option<bool>>>>,
}

impl<'p> WatchedKeys<'p> {
    pub fn new(key: PrivateKey, probe: &'p ScriptedProbe) -> (Self, Arc<Mutex<Vec<Option<bool>>>>) {
        let loads = Arc::new(Mutex::new(Vec::new()));
        let keys = WatchedKeys {
            key,
            probe,
            loads: loads.clone(),
        };
        (keys, loads)
    }
}

impl KeySource for WatchedKeys<'_> {
    fn load(&self, issuing: &Address) -> Result<PrivateKey, IssuerError> {
        self.loads
            .lock()
            .unwrap()
            .push(self.probe.given().last().copied());
        self.key.load(issuing)
    }
}
