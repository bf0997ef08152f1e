/// Cryptographic primitives for anchoring certificates in a UTXO ledger.
///
/// This crate provides the building blocks shared by the other workspace crates:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction identification
/// - secp256k1 keys in WIF form, DER and compact recoverable signatures
/// - Variable-length integer encoding and a binary reader/writer
/// - Base58Check encoding
/// - Network parameters (mainnet/testnet version bytes)

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod base58;
pub mod ec;
pub mod network;

mod error;
pub use error::PrimitivesError;
pub use network::Network;
