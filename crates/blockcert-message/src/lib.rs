#![deny(missing_docs)]

//! Bitcoin Signed Message signing and verification.
//!
//! Signatures are 65-byte compact recoverable ECDSA signatures over the
//! double SHA-256 of the magic-prefixed message, carried as base64. A
//! signature is checked by recovering the signer's key and comparing the
//! resulting P2PKH address with the claimed one.

mod error;
pub mod signed;

pub use error::MessageError;
pub use signed::{magic_hash, recover, sign, verify};
