//! Client for a blockchain node's LCD REST gateway.
//!
//! [`LcdClient`] owns one [`Dispatcher`] and hands it to every module
//! accessor, the [`FeeEstimator`] and the [`TxBuilder`]. A transaction goes
//! through three explicit steps:
//!
//! 1. [`LcdClient::estimate`] determines gas and fee, simulating on the node
//!    unless the caller fixed them.
//! 2. [`LcdClient::build`] signs the transaction with one or more keys.
//! 3. [`LcdClient::submit`] broadcasts the signed bytes.
//!
//! [`Wallet`] binds a client to one key and runs the whole pipeline.

pub mod api;
pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod estimator;
pub mod wallet;

pub use api::{
    AccountInfo, AuthApi, BankApi, BroadcastResult, ModuleApi, ModuleTable, NodeInfo, QueryApi,
    TendermintApi, TxApi, TxResponse,
};
pub use builder::{SignedTx, SignerAccount, SignerEntry, SigningOptions, TxBuilder};
pub use config::{
    resolve_config, BroadcastMode, ClientConfig, GasPriceTable, ResolvedConfig, TransportConfig,
};
pub use dispatcher::{Dispatcher, HttpDispatcher};
pub use error::{Error, Result};
pub use estimator::{FeeEstimator, FeeOverrides, SignerData};
pub use wallet::{CreateTxOptions, Wallet};

pub use lcd_keyring::{MnemonicKey, OsKey, RawKey, RemoteKey, SigningKey};
pub use lcd_math::{Coin, Coins, Dec};
pub use lcd_types::{AccAddress, Fee, Msg, UnsignedTx};

use lcd_log::{info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Entry point to one node. Cheap to share behind an `Arc`; every method
/// takes `&self`.
pub struct LcdClient {
    url: Option<String>,
    config: Arc<ResolvedConfig>,
    dispatcher: Arc<dyn Dispatcher>,
    modules: ModuleTable,
    auth: AuthApi,
    bank: BankApi,
    tx: TxApi,
    tendermint: TendermintApi,
    estimator: FeeEstimator,
    signing: SigningOptions,
    chain_id: OnceCell<String>,
}

impl LcdClient {
    /// Client talking HTTP to `url`, with gas prices from the built-in table
    pub fn new(url: &str, config: Option<ClientConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let resolved = resolve_config(&GasPriceTable::default(), &config)?;
        let dispatcher: Arc<dyn Dispatcher> =
            Arc::new(HttpDispatcher::new(url, &resolved.transport)?);
        info!(url, chain_id = ?resolved.chain_id, "created LCD client");
        Ok(Self::from_parts(Some(url.to_string()), dispatcher, resolved))
    }

    /// Client over a caller-supplied transport
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>, config: Option<ClientConfig>) -> Result<Self> {
        Self::with_gas_price_table(dispatcher, &GasPriceTable::default(), config)
    }

    /// Client over a caller-supplied transport and gas price table
    pub fn with_gas_price_table(
        dispatcher: Arc<dyn Dispatcher>,
        table: &GasPriceTable,
        config: Option<ClientConfig>,
    ) -> Result<Self> {
        let resolved = resolve_config(table, &config.unwrap_or_default())?;
        Ok(Self::from_parts(None, dispatcher, resolved))
    }

    fn from_parts(url: Option<String>, dispatcher: Arc<dyn Dispatcher>, resolved: ResolvedConfig) -> Self {
        let config = Arc::new(resolved);
        let auth = AuthApi::new(dispatcher.clone());
        let bank = BankApi::new(dispatcher.clone());
        let tx = TxApi::new(dispatcher.clone());
        let tendermint = TendermintApi::new(dispatcher.clone());

        let modules = ModuleTable::new(
            &dispatcher,
            vec![
                ("auth", Arc::new(auth.clone()) as Arc<dyn QueryApi>),
                ("bank", Arc::new(bank.clone()) as Arc<dyn QueryApi>),
                ("tx", Arc::new(tx.clone()) as Arc<dyn QueryApi>),
                ("tendermint", Arc::new(tendermint.clone()) as Arc<dyn QueryApi>),
            ],
        );

        Self {
            url,
            estimator: FeeEstimator::new(tx.clone(), config.clone()),
            chain_id: OnceCell::new_with(config.chain_id.clone()),
            config,
            dispatcher,
            modules,
            auth,
            bank,
            tx,
            tendermint,
            signing: SigningOptions::default(),
        }
    }

    pub fn with_signing_options(mut self, options: SigningOptions) -> Self {
        self.signing = options;
        self
    }

    /// Endpoint URL, when the client was created from one
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    /// Accessor for a module by name, e.g. `"mstaking"`
    pub fn module(&self, name: &str) -> Option<&Arc<dyn QueryApi>> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn bank(&self) -> &BankApi {
        &self.bank
    }

    pub fn tx(&self) -> &TxApi {
        &self.tx
    }

    pub fn tendermint(&self) -> &TendermintApi {
        &self.tendermint
    }

    pub fn estimator(&self) -> &FeeEstimator {
        &self.estimator
    }

    /// Configured chain id, else the network the node reports. The node is
    /// asked at most once per client.
    pub async fn chain_id(&self) -> Result<String> {
        let chain_id = self
            .chain_id
            .get_or_try_init(|| async {
                let network = self.tendermint.node_info().await?.network;
                if network.is_empty() {
                    return Err(Error::Configuration(
                        "node reported an empty network name".to_string(),
                    ));
                }
                Ok(network)
            })
            .await?;
        Ok(chain_id.clone())
    }

    /// Gas and fee for `tx`; see [`FeeEstimator::estimate`]
    pub async fn estimate(
        &self,
        tx: &UnsignedTx,
        signers: &[SignerData],
        overrides: &FeeOverrides,
    ) -> Result<Fee> {
        self.estimator.estimate(tx, signers, overrides).await
    }

    /// Builder bound to this client's chain id and signing options
    pub async fn tx_builder(&self) -> Result<TxBuilder> {
        Ok(TxBuilder::new(
            self.auth.clone(),
            self.chain_id().await?,
            self.signing.clone(),
        ))
    }

    /// Sign `tx`; see [`TxBuilder::build`]
    pub async fn build(&self, tx: &UnsignedTx, fee: &Fee, signers: &[SignerEntry]) -> Result<SignedTx> {
        self.tx_builder().await?.build(tx, fee, signers).await
    }

    /// Broadcast with the configured mode
    pub async fn submit(&self, signed: &SignedTx) -> Result<BroadcastResult> {
        self.submit_with_mode(signed, self.config.transport.broadcast_mode)
            .await
    }

    #[tracing::instrument(skip_all, fields(tx_hash = %signed.tx_hash, mode = mode.as_str()))]
    pub async fn submit_with_mode(&self, signed: &SignedTx, mode: BroadcastMode) -> Result<BroadcastResult> {
        let result = self.tx.broadcast(&signed.tx_bytes, mode).await?;
        if result.is_success() {
            info!(tx_hash = %result.tx_hash, "transaction accepted");
        } else {
            warn!(
                code = result.code,
                codespace = %result.codespace,
                raw_log = %result.raw_log,
                "transaction rejected"
            );
        }
        Ok(result)
    }

    /// Wallet bound to this client and `key`
    pub fn wallet(self: &Arc<Self>, key: Arc<dyn SigningKey>) -> Wallet {
        Wallet::new(self.clone(), key)
    }
}

impl fmt::Debug for LcdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LcdClient")
            .field("url", &self.url)
            .field("config", &self.config)
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StaticDispatcher;
    use serde_json::json;

    fn node_info() -> StaticDispatcher {
        StaticDispatcher::default().with(
            "/cosmos/base/tendermint/v1beta1/node_info",
            json!({ "default_node_info": { "network": "initiation-2" } }),
        )
    }

    #[test]
    fn test_new_resolves_defaults() {
        let client = LcdClient::new("https://lcd.example.org", None).unwrap();
        assert_eq!(client.url(), Some("https://lcd.example.org"));
        assert_eq!(client.config().gas_adjustment.to_string(), "1.75");
        assert_eq!(client.config().gas_prices.to_string(), "0.15uinit");
        assert_eq!(client.config().transport.broadcast_mode, BroadcastMode::Sync);

        assert!(LcdClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_module_table() {
        let client = LcdClient::with_dispatcher(StaticDispatcher::default().into_arc(), None).unwrap();
        assert_eq!(client.modules().len(), api::MODULES.len());
        assert_eq!(client.module("move").unwrap().base_path(), "/initia/move/v1");
        assert_eq!(client.module("auth").unwrap().module(), "auth");
        assert!(client.module("evm").is_none());
    }

    #[test]
    fn test_caller_config_wins() {
        let config = ClientConfig::default()
            .with_gas_prices("0.5uusdc".parse().unwrap())
            .with_gas_adjustment("2".parse().unwrap());
        let client = LcdClient::with_dispatcher(StaticDispatcher::default().into_arc(), Some(config)).unwrap();
        assert_eq!(client.config().gas_prices.to_string(), "0.5uusdc");
        assert_eq!(client.config().gas_adjustment.to_string(), "2");

        let bad = ClientConfig::default().with_gas_adjustment("0".parse().unwrap());
        assert!(matches!(
            LcdClient::with_dispatcher(StaticDispatcher::default().into_arc(), Some(bad)),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_chain_id_from_node_once() {
        let dispatcher = Arc::new(node_info());
        let client = LcdClient::with_dispatcher(dispatcher.clone(), None).unwrap();
        assert_eq!(client.chain_id().await.unwrap(), "initiation-2");
        assert_eq!(client.chain_id().await.unwrap(), "initiation-2");
        assert_eq!(dispatcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_configured_chain_id_skips_node() {
        let dispatcher = Arc::new(StaticDispatcher::default());
        let client = LcdClient::with_dispatcher(
            dispatcher.clone(),
            Some(ClientConfig::default().with_chain_id("minimove-1")),
        )
        .unwrap();
        assert_eq!(client.chain_id().await.unwrap(), "minimove-1");
        assert!(dispatcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_chain_id_fails_once_node_is_down() {
        let client = LcdClient::with_dispatcher(StaticDispatcher::default().into_arc(), None).unwrap();
        assert!(matches!(
            client.chain_id().await,
            Err(Error::Transport { status: Some(404), .. })
        ));
    }
}
