#![deny(missing_docs)]

//! # blockcert-services
//!
//! Async HTTP clients for the services a certificate batch talks to, and the
//! two [`LedgerBackend`](blockcert_issuer::LedgerBackend) implementations
//! built from them:
//!
//! * [`RemoteBackend`]: hosted wallet (merchant API) for funding and
//!   balances, an explorer for unspent outputs and Insight for broadcasting.
//! * [`LocalNodeBackend`]: a local full node over JSON-RPC. It cannot fund
//!   the issuing address.
//!
//! Every client exposes `*_async` methods and also implements the
//! synchronous issuer traits by blocking on the current tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use blockcert_services::{InsightClient, InsightConfig};
//!
//! let client = InsightClient::new(InsightConfig {
//!     base_url: "https://insight.bitpay.com/api".to_string(),
//! });
//! ```

pub mod backend;
pub mod error;
pub mod explorer;
pub mod insight;
pub mod merchant;
pub mod node;
pub mod types;

mod runtime;


pub use backend::{LocalNodeBackend, RemoteBackend};
pub use error::ServiceError;
pub use explorer::ExplorerClient;
pub use insight::InsightClient;
pub use merchant::MerchantClient;
pub use node::NodeRpcClient;
pub use types::{ExplorerConfig, InsightConfig, MerchantConfig, NodeRpcConfig};
