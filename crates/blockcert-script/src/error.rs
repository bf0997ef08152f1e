/// Error types for script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Hex decoding error.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid address string.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Script is not a P2PKH script.
    #[error("not a P2PKH script")]
    NotP2PKH,

    /// Not enough bytes in the script to complete a push.
    #[error("push of {wanted} bytes overruns script at offset {offset}")]
    DataTooSmall { offset: usize, wanted: usize },

    /// Push data exceeds the largest encodable size.
    #[error("data too big")]
    DataTooBig,

    /// A push opcode passed to `append_opcodes`.
    #[error("use append_push_data for push opcode 0x{0:02x}")]
    InvalidOpcodeType(u8),
}
