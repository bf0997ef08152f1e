/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an input index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Signing failed: missing source output, key/script mismatch, bad script.
    #[error("signing error: {0}")]
    SigningError(String),
    /// Binary or hex decoding failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    #[error("script error: {0}")]
    Script(#[from] blockcert_script::ScriptError),
    #[error("primitives error: {0}")]
    Primitives(#[from] blockcert_primitives::PrimitivesError),
}
