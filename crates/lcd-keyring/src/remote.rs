//! Signing through a remote signing proxy
//!
//! The proxy exposes two endpoints:
//!
//! - `GET  {base}/pubkey` returning `{"public_key": {"@type": .., "key": ..}}`
//! - `POST {base}/sign` with `{"sign_doc": "<base64>"}`, returning
//!   `{"signature": "<base64>"}`

use crate::{KeyringError, SigningKey};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use lcd_crypto::PublicKey;
use lcd_log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct PubKeyResponse {
    public_key: PublicKey,
}

#[derive(Serialize)]
struct SignRequest {
    sign_doc: String,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

/// Key held by an external signer reachable over HTTP
#[derive(Debug, Clone)]
pub struct RemoteKey {
    base_url: Url,
    http: reqwest::Client,
    public_key: PublicKey,
}

fn transport_error(err: reqwest::Error) -> KeyringError {
    if err.is_connect() || err.is_timeout() {
        KeyringError::KeyUnavailable(format!("signing proxy unreachable: {err}"))
    } else {
        KeyringError::BackendError(err.to_string())
    }
}

fn join(base: &Url, path: &str) -> Result<Url, KeyringError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| KeyringError::BackendError(format!("invalid proxy url: {e}")))
}

impl RemoteKey {
    /// Connect to the proxy and fetch the public key it signs for
    pub async fn connect(base_url: &str) -> Result<Self, KeyringError> {
        Self::connect_with_timeout(base_url, DEFAULT_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, KeyringError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| KeyringError::BackendError(format!("invalid proxy url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyringError::BackendError(e.to_string()))?;

        let response = http
            .get(join(&base_url, "pubkey")?)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(KeyringError::KeyUnavailable(format!(
                "signing proxy returned {}",
                response.status()
            )));
        }
        let body: PubKeyResponse = response
            .json()
            .await
            .map_err(|e| KeyringError::InvalidKey(format!("bad pubkey response: {e}")))?;

        debug!(proxy = %base_url, address = %body.public_key.to_address(), "connected to signing proxy");
        Ok(Self {
            base_url,
            http,
            public_key: body.public_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl SigningKey for RemoteKey {
    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyringError> {
        let request = SignRequest {
            sign_doc: general_purpose::STANDARD.encode(payload),
        };
        let response = self
            .http
            .post(join(&self.base_url, "sign")?)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(KeyringError::KeyUnavailable(format!(
                "signing proxy returned {status}"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KeyringError::SigningFailed(format!(
                "signing proxy refused ({status}): {text}"
            )));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| KeyringError::SigningFailed(format!("bad sign response: {e}")))?;
        general_purpose::STANDARD
            .decode(body.signature)
            .map_err(|e| KeyringError::SigningFailed(format!("bad signature encoding: {e}")))
    }
}
