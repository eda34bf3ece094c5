//! Keys kept in the operating system credential store
//!
//! The secret never stays in process memory between signatures: every
//! `sign` call reads the entry again, so a deleted or locked entry shows up
//! as `KeyUnavailable` on the next signature.

use crate::{KeyringError, SigningKey};
use async_trait::async_trait;
use lcd_crypto::{sign_message, PrivateKey, PublicKey};
use lcd_log::debug;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Default service name entries are filed under
pub const DEFAULT_SERVICE: &str = "lcd-client";

/// Stored form of one entry
#[derive(Serialize, Deserialize)]
struct StoredSecret {
    algo: String,
    secret: String,
}

impl StoredSecret {
    fn encode(key: &PrivateKey) -> Result<Zeroizing<String>, KeyringError> {
        let stored = StoredSecret {
            algo: key.algorithm().to_string(),
            secret: hex::encode(key.to_bytes().as_slice()),
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| KeyringError::BackendError(format!("failed to encode key: {e}")))?;
        Ok(Zeroizing::new(json))
    }

    fn decode(json: &str) -> Result<PrivateKey, KeyringError> {
        let stored: StoredSecret = serde_json::from_str(json)
            .map_err(|e| KeyringError::InvalidKey(format!("corrupt store entry: {e}")))?;
        let stored_secret = Zeroizing::new(stored.secret);
        let bytes = Zeroizing::new(
            hex::decode(stored_secret.as_str())
                .map_err(|e| KeyringError::InvalidKey(e.to_string()))?,
        );
        let key = match stored.algo.as_str() {
            "secp256k1" => PrivateKey::from_secp256k1_bytes(&bytes)?,
            "ed25519" => PrivateKey::from_ed25519_bytes(&bytes)?,
            other => {
                return Err(KeyringError::InvalidKey(format!(
                    "unknown algorithm {other}"
                )))
            }
        };
        Ok(key)
    }
}

/// A key addressed by `(service, name)` in the platform credential store
#[derive(Debug, Clone)]
pub struct OsKey {
    service: String,
    name: String,
    public_key: PublicKey,
}

fn entry(service: &str, name: &str) -> Result<keyring::Entry, KeyringError> {
    keyring::Entry::new(service, name)
        .map_err(|e| KeyringError::BackendError(format!("failed to open store entry: {e}")))
}

fn unavailable(name: &str, err: keyring::Error) -> KeyringError {
    match err {
        keyring::Error::NoEntry => KeyringError::KeyUnavailable(format!("no entry for {name}")),
        keyring::Error::NoStorageAccess(e) => {
            KeyringError::KeyUnavailable(format!("credential store unreachable: {e}"))
        }
        keyring::Error::PlatformFailure(e) => {
            KeyringError::KeyUnavailable(format!("credential store failure: {e}"))
        }
        other => KeyringError::BackendError(other.to_string()),
    }
}

async fn blocking<T, F>(task: F) -> Result<T, KeyringError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, KeyringError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| KeyringError::BackendError(format!("credential store task failed: {e}")))?
}

fn load(service: &str, name: &str) -> Result<PrivateKey, KeyringError> {
    let json = Zeroizing::new(
        entry(service, name)?
            .get_password()
            .map_err(|e| unavailable(name, e))?,
    );
    StoredSecret::decode(&json)
}

impl OsKey {
    /// Write `key` under `(service, name)`, replacing any existing entry
    pub async fn store(
        service: impl Into<String>,
        name: impl Into<String>,
        key: &PrivateKey,
    ) -> Result<Self, KeyringError> {
        let service = service.into();
        let name = name.into();
        let public_key = key.public_key();
        let json = StoredSecret::encode(key)?;

        let (svc, nm) = (service.clone(), name.clone());
        blocking(move || {
            entry(&svc, &nm)?
                .set_password(&json)
                .map_err(|e| unavailable(&nm, e))
        })
        .await?;

        debug!(service = %service, name = %name, "stored key in credential store");
        Ok(Self {
            service,
            name,
            public_key,
        })
    }

    /// Open an existing entry. The secret is read once to learn the public
    /// key and then dropped.
    pub async fn open(
        service: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, KeyringError> {
        let service = service.into();
        let name = name.into();

        let (svc, nm) = (service.clone(), name.clone());
        let public_key = blocking(move || load(&svc, &nm).map(|k| k.public_key())).await?;

        Ok(Self {
            service,
            name,
            public_key,
        })
    }

    /// Remove the entry from the store
    pub async fn delete(&self) -> Result<(), KeyringError> {
        let (svc, nm) = (self.service.clone(), self.name.clone());
        blocking(move || {
            entry(&svc, &nm)?
                .delete_credential()
                .map_err(|e| unavailable(&nm, e))
        })
        .await
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl SigningKey for OsKey {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyringError> {
        let (svc, nm) = (self.service.clone(), self.name.clone());
        let key = blocking(move || load(&svc, &nm)).await?;

        if key.public_key() != self.public_key {
            return Err(KeyringError::KeyUnavailable(format!(
                "entry {} was replaced by a different key",
                self.name
            )));
        }
        sign_message(&key, payload).map_err(|e| KeyringError::SigningFailed(e.to_string()))
    }
}
