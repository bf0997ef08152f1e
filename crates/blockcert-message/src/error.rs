/// Error types for message operations.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The signature text is not valid base64.
    #[error("signature is not valid base64: {0}")]
    InvalidEncoding(String),
    /// Key, signature or address handling failed.
    #[error("{0}")]
    Primitives(#[from] blockcert_primitives::PrimitivesError),
}
