/// Transaction building, signing, and serialization.
///
/// Provides the Transaction type with inputs and outputs, the standard wire
/// encoding, legacy and FORKID signature hashing, and a P2PKH signing
/// template that can also check an already-signed input.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::{OutPoint, TransactionInput};
pub use output::TransactionOutput;
pub use sighash::SighashScheme;
