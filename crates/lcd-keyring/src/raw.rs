//! Private key held in process memory

use crate::{KeyringError, SigningKey};
use async_trait::async_trait;
use lcd_crypto::{sign_message, PrivateKey, PublicKey};

/// In-memory key. Suitable for tests, scripts and keys loaded from a
/// secret manager by the caller.
#[derive(Clone, Debug)]
pub struct RawKey {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl RawKey {
    pub fn new(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Load a hex-encoded secp256k1 secret
    pub fn from_hex(secret_hex: &str) -> Result<Self, KeyringError> {
        Ok(Self::new(PrivateKey::from_hex(secret_hex)?))
    }

    /// Fresh random secp256k1 key
    pub fn generate() -> Self {
        Self::new(PrivateKey::generate_secp256k1())
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

#[async_trait]
impl SigningKey for RawKey {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyringError> {
        sign_message(&self.private_key, payload)
            .map_err(|e| KeyringError::SigningFailed(e.to_string()))
    }
}
