//! Certificate issuance pipeline.
//!
//! Anchors a batch of certificates in the ledger: each certificate is signed
//! with the issuer's key, hashed, and committed to by the `OP_RETURN` output
//! of a P2PKH transaction that also pays dust to the recipient and to the
//! revocation address.
//!
//! External services (wallet API, unspent-output query, broadcast, on-disk
//! layout, connectivity checks) are reached through the traits in
//! [`backend`], [`store`] and [`airgap`], so the pipeline itself is
//! synchronous and can be driven entirely by in-memory doubles.

pub mod airgap;
pub mod amount;
pub mod backend;
pub mod broadcast;
pub mod builder;
pub mod certificate;
pub mod committer;
pub mod confirmation;
pub mod config;
pub mod funding;
pub mod pipeline;
pub mod signer;
pub mod state;
pub mod store;
pub mod utxo;
pub mod verifier;

mod error;

pub use amount::{Amount, AmountError, FeeSchedule, COIN};
pub use backend::{BackendKind, Broadcaster, FundingService, LedgerBackend, UnspentSource};
pub use broadcast::BroadcastRecord;
pub use certificate::Certificate;
pub use config::{IssuerConfig, KeySource, Secrets};
pub use error::{IssuerError, Stage, VerificationCheck};
pub use funding::{FundAllocator, FundingSummary};
pub use pipeline::{BatchReport, BatchRunner, Stages};
pub use state::CertificateState;
pub use store::{ArtifactStore, FolderStore, MemoryStore};
pub use utxo::{UnspentOutput, UtxoPool};
