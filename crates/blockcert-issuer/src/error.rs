use std::fmt;
use std::time::Duration;

use crate::amount::AmountError;
use crate::state::CertificateState;

/// Which of the two verification checks rejected a certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationCheck {
    /// The certificate signature does not verify against the issuer address.
    Signature,
    /// The transaction's data output does not carry the certificate digest.
    Commitment,
}

impl fmt::Display for VerificationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationCheck::Signature => write!(f, "signature"),
            VerificationCheck::Commitment => write!(f, "commitment"),
        }
    }
}

/// Pipeline stage a certificate failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Commit,
    Build,
    Sign,
    Verify,
    Broadcast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Commit => "commit",
            Stage::Build => "build",
            Stage::Sign => "sign",
            Stage::Verify => "verify",
            Stage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Errors raised while issuing a batch. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    /// A wallet, explorer, node or broadcast service reported failure.
    #[error("{operation} failed: {message}")]
    Collaborator { operation: String, message: String },

    #[error("insufficient funds: {required} sat required, {available} sat available")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("no unspent output left to fund the next certificate")]
    NoAvailableInput,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("certificate {uid} failed the {check} check")]
    Verification { uid: String, check: VerificationCheck },

    #[error("{address} still unconfirmed after {elapsed:?}")]
    ConfirmationTimeout { address: String, elapsed: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("air gap check failed: expected to be {}", connectivity(.expected_online))]
    AirGap { expected_online: bool },

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("certificate {uid} cannot move from {from} to {to}")]
    InvalidState {
        uid: String,
        from: CertificateState,
        to: CertificateState,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("artifact store: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transaction(#[from] blockcert_transaction::TransactionError),

    #[error(transparent)]
    Script(#[from] blockcert_script::ScriptError),

    #[error(transparent)]
    Primitives(#[from] blockcert_primitives::PrimitivesError),

    #[error(transparent)]
    Message(#[from] blockcert_message::MessageError),

    /// Any of the above, attributed to one certificate and stage.
    #[error("certificate {uid} ({stage}): {source}")]
    Certificate {
        uid: String,
        stage: Stage,
        #[source]
        source: Box<IssuerError>,
    },
}

fn connectivity(online: &bool) -> &'static str {
    if *online {
        "online"
    } else {
        "offline"
    }
}

impl IssuerError {
    /// Shorthand for a failed collaborator call.
    pub fn collaborator(operation: impl Into<String>, message: impl Into<String>) -> Self {
        IssuerError::Collaborator {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Attach the certificate and stage that produced this error.
    pub fn at(self, uid: &str, stage: Stage) -> Self {
        match self {
            already @ IssuerError::Certificate { .. } => already,
            other => IssuerError::Certificate {
                uid: uid.to_string(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through certificate attribution.
    pub fn root(&self) -> &IssuerError {
        match self {
            IssuerError::Certificate { source, .. } => source.root(),
            other => other,
        }
    }
}
