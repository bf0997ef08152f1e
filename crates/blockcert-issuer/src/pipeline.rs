//! Batch orchestration.
//!
//! [`BatchRunner`] drives every certificate in the store through commit,
//! build, sign, verify and broadcast, one at a time and in uid order. The
//! first error halts the batch; certificates already broadcast stay
//! broadcast.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use blockcert_script::Address;
use blockcert_transaction::Transaction;

use crate::airgap::{ConnectivityProbe, ConnectivityWaiter};
use crate::backend::LedgerBackend;
use crate::broadcast::{broadcast, BroadcastRecord};
use crate::builder::TransactionBuilder;
use crate::certificate::Certificate;
use crate::committer::{CertificateCommitter, Commitment};
use crate::confirmation::{Clock, ConfirmationWaiter, SystemClock};
use crate::config::{IssuerConfig, KeySource};
use crate::funding::{ensure_issuing_balance, FundAllocator, FundingSummary};
use crate::signer::TransactionSigner;
use crate::state::CertificateState;
use crate::store::ArtifactStore;
use crate::utxo::UtxoPool;
use crate::verifier::TransactionVerifier;
use crate::{IssuerError, Stage};

/// Which phases of a run are enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stages {
    /// Fund the issuing address from storage.
    pub transfer: bool,
    /// Commit, build, sign and verify transactions.
    pub create: bool,
    /// Broadcast signed transactions.
    pub broadcast: bool,
    /// Wait for the network to go down before the issuing key is loaded,
    /// and to come back up before funding and broadcasting.
    pub airgap_check: bool,
}

impl Default for Stages {
    fn default() -> Self {
        Stages {
            transfer: true,
            create: true,
            broadcast: true,
            airgap_check: true,
        }
    }
}

/// Outcome of a run so far. Still readable after a failed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Archive folder name used by this run.
    pub timestamp: String,
    pub states: BTreeMap<String, CertificateState>,
    pub broadcasts: Vec<BroadcastRecord>,
    pub funding: Option<FundingSummary>,
}

impl BatchReport {
    pub fn state(&self, uid: &str) -> Option<CertificateState> {
        self.states.get(uid).copied()
    }

    /// Number of certificates currently in `state`.
    pub fn count(&self, state: CertificateState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }
}

/// Runs one issuance batch against a ledger backend and an artifact store.
pub struct BatchRunner<'a> {
    backend: &'a dyn LedgerBackend,
    store: &'a dyn ArtifactStore,
    probe: &'a dyn ConnectivityProbe,
    config: IssuerConfig,
    keys: Box<dyn KeySource + 'a>,
    issuing: Address,
    revocation: Address,
    api_key: String,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    report: BatchReport,
}

impl<'a> BatchRunner<'a> {
    /// Create a runner.
    ///
    /// # Arguments
    /// * `config` - Validated here; the issuing and revocation addresses must
    ///   parse on the configured network.
    /// * `keys` - Source of the issuing key. The key is only loaded by the
    ///   create stage, after the air-gap check, and must control the issuing
    ///   address.
    /// * `backend` - Ledger access.
    /// * `store` - Input certificates and produced artifacts.
    /// * `probe` - Connectivity probe for the air-gap check.
    pub fn new(
        config: IssuerConfig,
        keys: impl KeySource + 'a,
        backend: &'a dyn LedgerBackend,
        store: &'a dyn ArtifactStore,
        probe: &'a dyn ConnectivityProbe,
    ) -> Result<Self, IssuerError> {
        config.validate()?;
        let issuing = config.issuing()?;
        let revocation = config.revocation()?;
        Ok(BatchRunner {
            backend,
            store,
            probe,
            config,
            keys: Box::new(keys),
            issuing,
            revocation,
            api_key: String::new(),
            clock: Arc::new(SystemClock::new()),
            cancel: CancellationToken::new(),
            report: BatchReport::default(),
        })
    }

    /// API key passed to the funding service's login.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The report of the current or last run.
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    /// Run the enabled stages.
    ///
    /// Working folders are only cleared when `create` is on, so a
    /// broadcast-only run can send what an earlier run signed. A
    /// broadcast-only run re-verifies each stored transaction before
    /// sending it.
    ///
    /// # Returns
    /// The final report, or the first error. The report stays available
    /// through [`BatchRunner::report`] either way.
    pub fn run(&mut self, stages: Stages) -> Result<BatchReport, IssuerError> {
        self.report = BatchReport {
            timestamp: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
            ..BatchReport::default()
        };
        tracing::info!(
            backend = %self.backend.kind(),
            transfer = stages.transfer,
            create = stages.create,
            broadcast = stages.broadcast,
            airgap_check = stages.airgap_check,
            "starting batch"
        );

        let certificates = if stages.transfer || stages.create {
            self.store.unsigned_certificates()?
        } else {
            Vec::new()
        };
        for cert in &certificates {
            self.report
                .states
                .insert(cert.uid().to_string(), CertificateState::Unsigned);
        }

        if stages.create {
            self.store.clear_working()?;
        }

        if stages.transfer {
            self.fund(certificates.len(), stages.airgap_check)?;
        } else if stages.create {
            ensure_issuing_balance(
                self.backend,
                &self.issuing.address_string,
                &self.config.fee_schedule(),
                certificates.len(),
            )?;
        }

        let created = if stages.create {
            Some(self.create(certificates, stages.airgap_check)?)
        } else {
            None
        };

        if stages.broadcast {
            let pending = match created {
                Some(created) => created,
                None => self.load_signed()?,
            };
            self.broadcast_all(pending, stages.airgap_check)?;
        }

        tracing::info!(
            certificates = self.report.states.len(),
            broadcast = self.report.broadcasts.len(),
            "batch finished"
        );
        Ok(self.report.clone())
    }

    fn fund(&mut self, count: usize, airgap_check: bool) -> Result<(), IssuerError> {
        if airgap_check {
            self.await_connectivity(true)?;
        }
        let backend = self.backend;
        let funding = backend.funding().ok_or_else(|| {
            IssuerError::Config(format!(
                "{} backend cannot fund the issuing address",
                backend.kind()
            ))
        })?;
        let storage = self.config.storage()?;
        let waiter = ConfirmationWaiter::new(self.clock.clone(), self.cancel.clone())
            .with_poll_interval(self.config.poll_interval())
            .with_timeout(self.config.confirmation_timeout());
        let summary = FundAllocator::new(
            funding,
            &waiter,
            self.config.fee_schedule(),
            &storage.address_string,
            &self.issuing.address_string,
        )
        .allocate(&self.api_key, count)?;
        tracing::info!(
            forwarded = summary.forwarded,
            fees = summary.fees,
            "issuing address funded"
        );
        self.report.funding = Some(summary);
        Ok(())
    }

    fn create(
        &mut self,
        certificates: Vec<Certificate>,
        airgap_check: bool,
    ) -> Result<Vec<(String, Transaction)>, IssuerError> {
        if airgap_check {
            self.await_connectivity(true)?;
        }
        let mut pool = UtxoPool::new();
        pool.refresh(self.backend.list_unspent(&self.issuing.address_string)?);
        tracing::info!(
            outputs = pool.len(),
            value = pool.available_value(),
            "loaded unspent outputs of issuing address"
        );
        if airgap_check {
            self.await_connectivity(false)?;
        }

        let key = self.keys.load(&self.issuing)?;
        tracing::info!(address = %self.issuing.address_string, "issuing key loaded");
        let committer = CertificateCommitter::new(&key);
        let mut committed = Vec::with_capacity(certificates.len());
        for mut cert in certificates {
            self.check_cancelled()?;
            let uid = cert.uid().to_string();
            let result = committer.commit(&mut cert).and_then(|commitment| {
                self.store
                    .put_signed_certificate(&uid, &commitment.signed_bytes)?;
                self.store.put_digest(&uid, &commitment.digest)?;
                Ok(commitment)
            });
            let commitment = self.guard(&uid, Stage::Commit, result)?;
            self.advance(&uid, CertificateState::Committed)?;
            committed.push((cert, commitment));
        }
        self.store
            .archive_signed_certificates(&self.report.timestamp)?;

        let builder = TransactionBuilder::new(
            self.config.fee_schedule(),
            self.revocation.locking_script(),
            self.issuing.locking_script(),
        );
        let signer = TransactionSigner::new(key.clone(), self.config.sighash);
        let verifier = TransactionVerifier::new(self.issuing.address_string.clone());

        let mut signed = Vec::with_capacity(committed.len());
        for (cert, commitment) in committed {
            self.check_cancelled()?;
            let uid = cert.uid().to_string();

            let result = self.build(&mut pool, &builder, &cert, &commitment);
            let draft = self.guard(&uid, Stage::Build, result)?;
            self.advance(&uid, CertificateState::DraftBuilt)?;

            let result = signer
                .sign(&draft)
                .and_then(|tx| self.store.put_signed_tx(&uid, &tx.to_hex()));
            self.guard(&uid, Stage::Sign, result)?;
            self.advance(&uid, CertificateState::Signed)?;

            let result = self.verify_stored(&verifier, &cert);
            let tx = self.guard(&uid, Stage::Verify, result)?;
            self.advance(&uid, CertificateState::Verified)?;

            signed.push((uid, tx));
        }
        tracing::info!(count = signed.len(), "signed and verified certificate transactions");
        Ok(signed)
    }

    fn build(
        &self,
        pool: &mut UtxoPool,
        builder: &TransactionBuilder,
        cert: &Certificate,
        commitment: &Commitment,
    ) -> Result<Transaction, IssuerError> {
        let recipient = Address::from_string(cert.recipient_address())?;
        if recipient.network != self.config.network {
            return Err(IssuerError::InvalidCertificate(format!(
                "recipient {} is not a {} address",
                recipient.address_string, self.config.network
            )));
        }
        let input = pool.take()?;
        tracing::debug!(
            uid = cert.uid(),
            outpoint = %input.outpoint,
            value = input.value,
            "selected input"
        );
        let draft = builder.build(&input, &recipient.locking_script(), &commitment.digest)?;
        self.store.put_unsigned_tx(cert.uid(), &draft.to_hex())?;
        Ok(draft)
    }

    /// Verify against the persisted signed certificate and transaction.
    fn verify_stored(
        &self,
        verifier: &TransactionVerifier,
        cert: &Certificate,
    ) -> Result<Transaction, IssuerError> {
        let signed_bytes = self.store.signed_certificate(cert.uid())?;
        let tx = Transaction::from_hex(self.store.signed_tx(cert.uid())?.trim())?;
        verifier.verify(cert, &signed_bytes, &tx)?;
        Ok(tx)
    }

    /// Signed transactions left by an earlier run, re-verified.
    fn load_signed(&mut self) -> Result<Vec<(String, Transaction)>, IssuerError> {
        let verifier = TransactionVerifier::new(self.issuing.address_string.clone());
        let mut pending = Vec::new();
        for uid in self.store.signed_tx_uids()? {
            self.report
                .states
                .insert(uid.clone(), CertificateState::Signed);
            let result = self
                .store
                .signed_certificate(&uid)
                .and_then(|bytes| Certificate::from_json(&uid, &bytes))
                .and_then(|cert| self.verify_stored(&verifier, &cert));
            let tx = self.guard(&uid, Stage::Verify, result)?;
            self.advance(&uid, CertificateState::Verified)?;
            pending.push((uid, tx));
        }
        tracing::info!(count = pending.len(), "loaded signed transactions");
        Ok(pending)
    }

    fn broadcast_all(
        &mut self,
        pending: Vec<(String, Transaction)>,
        airgap_check: bool,
    ) -> Result<(), IssuerError> {
        if airgap_check {
            self.await_connectivity(true)?;
        }
        for (uid, tx) in pending {
            self.check_cancelled()?;
            let result = broadcast(self.backend, &uid, &tx).and_then(|record| {
                self.store.put_sent(&uid, &record.txid)?;
                Ok(record)
            });
            let record = self.guard(&uid, Stage::Broadcast, result)?;
            self.advance(&uid, CertificateState::Broadcast)?;
            self.report.broadcasts.push(record);
        }
        self.store.archive_sent(&self.report.timestamp)?;
        Ok(())
    }

    fn await_connectivity(&self, online: bool) -> Result<(), IssuerError> {
        ConnectivityWaiter::new(self.clock.clone(), self.cancel.clone())
            .with_poll_interval(self.config.poll_interval())
            .with_timeout(self.config.confirmation_timeout())
            .wait_for(self.probe, online)?;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), IssuerError> {
        if self.cancel.is_cancelled() {
            tracing::warn!("batch cancelled");
            return Err(IssuerError::Cancelled);
        }
        Ok(())
    }

    fn advance(&mut self, uid: &str, to: CertificateState) -> Result<(), IssuerError> {
        let from = self.state_of(uid);
        if !from.can_advance_to(to) {
            return Err(IssuerError::InvalidState {
                uid: uid.to_string(),
                from,
                to,
            });
        }
        tracing::debug!(uid, %from, %to, "certificate state");
        self.report.states.insert(uid.to_string(), to);
        Ok(())
    }

    fn state_of(&self, uid: &str) -> CertificateState {
        self.report
            .state(uid)
            .unwrap_or(CertificateState::Unsigned)
    }

    /// Mark `uid` failed and attribute the error if `result` is an error.
    fn guard<T>(
        &mut self,
        uid: &str,
        stage: Stage,
        result: Result<T, IssuerError>,
    ) -> Result<T, IssuerError> {
        result.map_err(|err| {
            tracing::error!(uid, %stage, error = %err, "certificate failed");
            if !self.state_of(uid).is_terminal() {
                self.report
                    .states
                    .insert(uid.to_string(), CertificateState::Failed);
            }
            err.at(uid, stage)
        })
    }
}
