//! Simulation, broadcast and transaction lookup

use super::{de_u64, decode, ModuleApi, QueryApi};
use crate::config::BroadcastMode;
use crate::dispatcher::Dispatcher;
use crate::error::codes;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Gas figures reported by a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SimulateResult {
    #[serde(deserialize_with = "de_u64")]
    pub gas_used: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub gas_wanted: u64,
}

/// `tx_response` object returned by broadcast and tx lookups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TxResponse {
    pub txhash: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub height: u64,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default, deserialize_with = "de_u64")]
    pub gas_wanted: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub gas_used: u64,
}

/// Outcome of a broadcast accepted by the node. A non-zero `code` means the
/// node rejected the transaction during its checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
    pub codespace: String,
    pub height: u64,
}

impl BroadcastResult {
    pub fn is_success(&self) -> bool {
        self.code == codes::OK
    }
}

impl From<TxResponse> for BroadcastResult {
    fn from(resp: TxResponse) -> Self {
        Self {
            tx_hash: resp.txhash,
            code: resp.code,
            raw_log: resp.raw_log,
            codespace: resp.codespace,
            height: resp.height,
        }
    }
}

#[derive(Deserialize)]
struct SimulateResponse {
    gas_info: SimulateResult,
}

#[derive(Deserialize)]
struct TxResponseEnvelope {
    tx_response: TxResponse,
}

#[derive(Clone, Debug)]
pub struct TxApi {
    inner: ModuleApi,
}

impl TxApi {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: ModuleApi::new("tx", "/cosmos/tx/v1beta1", dispatcher),
        }
    }

    fn path(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.inner.base_path())
    }

    /// Dry-run `tx_bytes` and report the gas it consumed
    pub async fn simulate(&self, tx_bytes: &[u8]) -> Result<SimulateResult> {
        let body = json!({ "tx_bytes": general_purpose::STANDARD.encode(tx_bytes) });
        let response = self.dispatcher().post(&self.path("simulate"), &body).await?;
        let parsed: SimulateResponse = decode(response, "simulate response")?;
        Ok(parsed.gas_info)
    }

    /// Submit `tx_bytes`. A wrong-sequence rejection becomes
    /// [`Error::SequenceConflict`]; any other node code is returned as is.
    pub async fn broadcast(&self, tx_bytes: &[u8], mode: BroadcastMode) -> Result<BroadcastResult> {
        let body = json!({
            "tx_bytes": general_purpose::STANDARD.encode(tx_bytes),
            "mode": mode.as_str(),
        });
        let response = self.dispatcher().post(&self.path("txs"), &body).await?;
        let envelope: TxResponseEnvelope = decode(response, "broadcast response")?;
        let result = BroadcastResult::from(envelope.tx_response);

        if result.code == codes::WRONG_SEQUENCE && result.codespace == codes::SDK_CODESPACE {
            return Err(Error::sequence_conflict(&result.raw_log));
        }
        Ok(result)
    }

    /// Look up an included transaction by its hex hash
    pub async fn tx_info(&self, tx_hash: &str) -> Result<TxResponse> {
        let response = self.get(&format!("txs/{tx_hash}"), &[]).await?;
        let envelope: TxResponseEnvelope = decode(response, "tx response")?;
        Ok(envelope.tx_response)
    }
}

#[async_trait]
impl QueryApi for TxApi {
    fn module(&self) -> &str {
        self.inner.module()
    }

    fn base_path(&self) -> &str {
        self.inner.base_path()
    }

    fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        self.inner.dispatcher()
    }
}
