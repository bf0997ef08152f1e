/// Script handling for certificate anchoring transactions.
///
/// Provides the `Script` type, the opcodes the issuer emits, chunk decoding,
/// P2PKH and `OP_RETURN` data script construction and classification, and
/// Base58Check P2PKH addresses.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod address;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::Address;
pub use chunk::ScriptChunk;
pub use blockcert_primitives::Network;
