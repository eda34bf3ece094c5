//! Cryptographic primitives for the LCD client
//!
//! Key types use static enum dispatch over the RustCrypto implementations
//! of secp256k1 and ed25519.

pub mod keys;
pub mod signature;

pub use keys::{KeyError, PrivateKey, PublicKey};
pub use signature::{sign_message, verify_signature, SignatureError};
