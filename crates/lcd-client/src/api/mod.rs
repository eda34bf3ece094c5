//! Per-module query accessors
//!
//! Every module of the chain is reachable through the same [`QueryApi`]
//! contract: a module name, its REST base path and a `get` relative to it.
//! The modules the transaction pipeline relies on get typed wrappers.

use crate::dispatcher::{Dispatcher, QueryParams};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod auth;
pub mod bank;
pub mod tendermint;
pub mod tx;

pub use auth::{AccountInfo, AuthApi};
pub use bank::BankApi;
pub use tendermint::{NodeInfo, TendermintApi};
pub use tx::{BroadcastResult, SimulateResult, TxApi, TxResponse};

/// Module names and REST base paths served by the gateway
pub const MODULES: &[(&str, &str)] = &[
    ("auth", "/cosmos/auth/v1beta1"),
    ("authz", "/cosmos/authz/v1beta1"),
    ("bank", "/cosmos/bank/v1beta1"),
    ("builder", "/opinit/opchild/v1"),
    ("distribution", "/initia/distribution/v1"),
    ("feegrant", "/cosmos/feegrant/v1beta1"),
    ("gov", "/initia/gov/v1"),
    ("group", "/cosmos/group/v1"),
    ("ibc", "/ibc/core/client/v1"),
    ("ibc_nft", "/ibc/apps/nft_transfer/v1"),
    ("ibc_sft", "/ibc/apps/sft_transfer/v1"),
    ("ibc_transfer", "/ibc/apps/transfer/v1"),
    ("inter_tx", "/ibc/apps/interchain_accounts/controller/v1"),
    ("move", "/initia/move/v1"),
    ("mstaking", "/initia/mstaking/v1"),
    ("reward", "/initia/reward/v1"),
    ("slashing", "/cosmos/slashing/v1beta1"),
    ("tendermint", "/cosmos/base/tendermint/v1beta1"),
    ("tx", "/cosmos/tx/v1beta1"),
    ("upgrade", "/cosmos/upgrade/v1beta1"),
];

/// Shared contract of every module accessor
#[async_trait]
pub trait QueryApi: Send + Sync {
    fn module(&self) -> &str;

    fn base_path(&self) -> &str;

    fn dispatcher(&self) -> &Arc<dyn Dispatcher>;

    /// GET `{base_path}/{endpoint}`
    async fn get(&self, endpoint: &str, query: &QueryParams) -> Result<Value> {
        let path = format!(
            "{}/{}",
            self.base_path().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        self.dispatcher().get(&path, query).await
    }

    /// The module's parameters (the `params` field of `{base_path}/params`)
    async fn params(&self) -> Result<Value> {
        let mut response = self.get("params", &[]).await?;
        match response.get_mut("params") {
            Some(params) => Ok(params.take()),
            None => Ok(response),
        }
    }
}

/// Accessor with no typed endpoints beyond the shared contract
#[derive(Clone)]
pub struct ModuleApi {
    module: &'static str,
    base_path: &'static str,
    dispatcher: Arc<dyn Dispatcher>,
}

impl ModuleApi {
    pub fn new(
        module: &'static str,
        base_path: &'static str,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            module,
            base_path,
            dispatcher,
        }
    }

    /// Accessor for a module listed in [`MODULES`]
    pub fn known(module: &str, dispatcher: Arc<dyn Dispatcher>) -> Option<Self> {
        MODULES
            .iter()
            .find(|(name, _)| *name == module)
            .map(|(name, base)| Self::new(*name, *base, dispatcher))
    }
}

impl std::fmt::Debug for ModuleApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleApi")
            .field("module", &self.module)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueryApi for ModuleApi {
    fn module(&self) -> &str {
        self.module
    }

    fn base_path(&self) -> &str {
        self.base_path
    }

    fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }
}

/// Read-only table of accessors keyed by module name
#[derive(Clone)]
pub struct ModuleTable(BTreeMap<&'static str, Arc<dyn QueryApi>>);

impl ModuleTable {
    /// Generic accessors for every module in [`MODULES`], with the typed
    /// accessors given here taking their slot
    pub fn new(
        dispatcher: &Arc<dyn Dispatcher>,
        typed: Vec<(&'static str, Arc<dyn QueryApi>)>,
    ) -> Self {
        let mut table: BTreeMap<&'static str, Arc<dyn QueryApi>> = MODULES
            .iter()
            .map(|(name, base)| {
                let api: Arc<dyn QueryApi> =
                    Arc::new(ModuleApi::new(*name, *base, dispatcher.clone()));
                (*name, api)
            })
            .collect();
        table.extend(typed);
        Self(table)
    }

    pub fn get(&self, module: &str) -> Option<&Arc<dyn QueryApi>> {
        self.0.get(module)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Numbers arrive as JSON strings (`"12"`) from the gateway, occasionally as
/// plain numbers
pub(crate) fn de_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) if s.is_empty() => Ok(0),
        Number::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Decode `value` into `T`, reporting `what` on failure
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode(format!("{what}: {e}")))
}
