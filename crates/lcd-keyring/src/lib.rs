//! Signing keys for the LCD client
//!
//! Every key variant implements [`SigningKey`], so transaction building
//! never needs to know where the key material lives:
//!
//! - [`RawKey`]: private key held in process memory
//! - [`MnemonicKey`]: BIP-39 mnemonic with BIP-32/44 derivation
//! - [`OsKey`]: secret kept in the operating system credential store
//! - [`RemoteKey`]: signing delegated to an HTTP signing proxy

use async_trait::async_trait;
use lcd_crypto::PublicKey;
use lcd_types::AccAddress;
use thiserror::Error;

pub mod hd;
pub mod os;
pub mod raw;
pub mod remote;

pub use hd::{DerivationPath, MnemonicKey, MnemonicOptions};
pub use os::OsKey;
pub use raw::RawKey;
pub use remote::RemoteKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    /// The key material cannot be reached right now (store locked or gone,
    /// signer offline). Retrying later may succeed.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("backend error: {0}")]
    BackendError(String),
}

impl From<lcd_crypto::KeyError> for KeyringError {
    fn from(err: lcd_crypto::KeyError) -> Self {
        KeyringError::InvalidKey(err.to_string())
    }
}

/// A credential able to sign transaction payloads
#[async_trait]
pub trait SigningKey: Send + Sync {
    fn public_key(&self) -> PublicKey;

    /// Account address derived from the public key
    fn address(&self) -> AccAddress {
        self.public_key().to_address()
    }

    /// Sign `payload` (the canonical sign doc bytes)
    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyringError>;
}
