//! Client configuration and its layered resolution

use crate::{Error, Result};
use lcd_math::{Coin, Coins, Dec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_GAS_ADJUSTMENT: &str = "1.75";

/// Key of the fallback entry in a [`GasPriceTable`]
pub const DEFAULT_TABLE_KEY: &str = "default";

/// How the node should wait before answering a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastMode {
    #[default]
    #[serde(rename = "BROADCAST_MODE_SYNC")]
    Sync,
    #[serde(rename = "BROADCAST_MODE_ASYNC")]
    Async,
}

impl BroadcastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastMode::Sync => "BROADCAST_MODE_SYNC",
            BroadcastMode::Async => "BROADCAST_MODE_ASYNC",
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    /// Extra attempts for read-only requests after a connection error or 5xx
    pub read_retries: u32,
    pub broadcast_mode: BroadcastMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            read_retries: 2,
            broadcast_mode: BroadcastMode::Sync,
        }
    }
}

/// Caller supplied settings. Every field is optional and overrides the
/// defaults during [`resolve_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_prices: Option<Coins>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_adjustment: Option<Dec>,
    /// Denomination fees are paid in when several gas prices are known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_denom: Option<String>,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_gas_prices(mut self, gas_prices: Coins) -> Self {
        self.gas_prices = Some(gas_prices);
        self
    }

    pub fn with_gas_adjustment(mut self, gas_adjustment: Dec) -> Self {
        self.gas_adjustment = Some(gas_adjustment);
        self
    }

    pub fn with_fee_denom(mut self, denom: impl Into<String>) -> Self {
        self.fee_denom = Some(denom.into());
        self
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Configuration(format!("invalid config {}: {e}", path.display())))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("failed to encode config: {e}")))?;
        fs::write(path, content).map_err(|e| {
            Error::Configuration(format!("failed to write {}: {e}", path.display()))
        })
    }
}

/// Gas prices known per chain id, with a `"default"` fallback entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPriceTable(BTreeMap<String, Coins>);

impl Default for GasPriceTable {
    /// `{"default": 0.15uinit}`
    fn default() -> Self {
        let mut table = Self::empty();
        let price = Coin {
            denom: "uinit".to_string(),
            amount: Dec::from_atomics(15, 2),
        };
        table.insert(DEFAULT_TABLE_KEY, Coins::from(price));
        table
    }
}

impl GasPriceTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, chain_id: impl Into<String>, prices: Coins) {
        self.0.insert(chain_id.into(), prices);
    }

    pub fn get(&self, chain_id: &str) -> Option<&Coins> {
        self.0.get(chain_id)
    }

    /// Entry for `chain_id`, else the default entry
    pub fn lookup(&self, chain_id: Option<&str>) -> Option<&Coins> {
        chain_id
            .and_then(|id| self.0.get(id))
            .or_else(|| self.0.get(DEFAULT_TABLE_KEY))
    }
}

/// Fully resolved settings, fixed for the lifetime of a client
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub chain_id: Option<String>,
    pub gas_prices: Coins,
    pub gas_adjustment: Dec,
    pub fee_denom: Option<String>,
    pub transport: TransportConfig,
}

/// Merge defaults, the gas price table and caller settings, field by field.
///
/// Gas prices come from the caller when given, otherwise from the table
/// entry for the chain id, otherwise from the table's default entry.
pub fn resolve_config(table: &GasPriceTable, config: &ClientConfig) -> Result<ResolvedConfig> {
    let gas_prices = match &config.gas_prices {
        Some(prices) => prices.clone(),
        None => table
            .lookup(config.chain_id.as_deref())
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no gas prices for chain {:?} and no {DEFAULT_TABLE_KEY:?} entry",
                    config.chain_id.as_deref().unwrap_or("<unset>")
                ))
            })?,
    };
    if gas_prices.is_any_negative() {
        return Err(Error::Configuration(format!(
            "gas prices must not be negative: {gas_prices}"
        )));
    }

    let gas_adjustment = match &config.gas_adjustment {
        Some(adjustment) => adjustment.clone(),
        None => Dec::from_str(DEFAULT_GAS_ADJUSTMENT)
            .map_err(|e| Error::Configuration(e.to_string()))?,
    };
    if !gas_adjustment.is_positive() {
        return Err(Error::Configuration(format!(
            "gas adjustment must be positive, got {gas_adjustment}"
        )));
    }

    Ok(ResolvedConfig {
        chain_id: config.chain_id.clone(),
        gas_prices,
        gas_adjustment,
        fee_denom: config.fee_denom.clone(),
        transport: config.transport.clone(),
    })
}
