/// Elliptic curve cryptography on secp256k1.
///
/// Provides private keys with WIF import/export, public keys with
/// P2PKH address derivation, and ECDSA signatures in DER and compact form.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::{CompactSignature, Signature};
