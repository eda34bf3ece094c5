//! In-memory node used by the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use lcd_client::dispatcher::QueryParams;
use lcd_client::{AccAddress, Dispatcher, Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const CHAIN_ID: &str = "initiation-2";

/// Answers auth, node info, simulate and broadcast requests and counts
/// every call it receives
pub struct MockNode {
    calls: AtomicUsize,
    accounts: Mutex<HashMap<String, (u64, u64)>>,
    gas_used: u64,
    broadcast_code: u32,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MockNode {
    pub fn new(gas_used: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            accounts: Mutex::new(HashMap::new()),
            gas_used,
            broadcast_code: 0,
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_broadcast_code(mut self, code: u32) -> Self {
        self.broadcast_code = code;
        self
    }

    pub fn with_account(self, address: &AccAddress, account_number: u64, sequence: u64) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(address.to_string(), (account_number, sequence));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().unwrap().clone()
    }

    fn not_found(path: &str) -> Error {
        Error::Transport {
            status: Some(404),
            message: format!("code 5: {path} not found"),
        }
    }

    fn account(&self, address: &str) -> Option<Value> {
        let accounts = self.accounts.lock().unwrap();
        let (account_number, sequence) = accounts.get(address)?;
        Some(json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": address,
                "pub_key": null,
                "account_number": account_number.to_string(),
                "sequence": sequence.to_string()
            }
        }))
    }
}

#[async_trait]
impl Dispatcher for MockNode {
    async fn get(&self, path: &str, _query: &QueryParams) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave
        tokio::task::yield_now().await;

        if let Some(address) = path.strip_prefix("/cosmos/auth/v1beta1/accounts/") {
            return self.account(address).ok_or_else(|| Self::not_found(path));
        }
        match path {
            "/cosmos/base/tendermint/v1beta1/node_info" => {
                Ok(json!({ "default_node_info": { "network": CHAIN_ID } }))
            }
            _ => Err(Self::not_found(path)),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let tx_bytes = body["tx_bytes"]
            .as_str()
            .and_then(|b64| general_purpose::STANDARD.decode(b64).ok())
            .ok_or_else(|| Error::Transport {
                status: Some(400),
                message: "code 3: missing tx_bytes".to_string(),
            })?;

        match path {
            "/cosmos/tx/v1beta1/simulate" => Ok(json!({
                "gas_info": { "gas_wanted": "0", "gas_used": self.gas_used.to_string() }
            })),
            "/cosmos/tx/v1beta1/txs" => {
                let hash = lcd_types::tx_hash(&tx_bytes);
                self.broadcasts.lock().unwrap().push(tx_bytes);
                let raw_log = if self.broadcast_code == 32 {
                    "account sequence mismatch, expected 1, got 0: incorrect account sequence"
                } else {
                    ""
                };
                Ok(json!({
                    "tx_response": {
                        "txhash": hash,
                        "height": "0",
                        "code": self.broadcast_code,
                        "codespace": if self.broadcast_code == 0 { "" } else { "sdk" },
                        "raw_log": raw_log
                    }
                }))
            }
            _ => Err(Self::not_found(path)),
        }
    }
}
