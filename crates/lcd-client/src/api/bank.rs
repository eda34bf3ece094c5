//! Balances and supply

use super::{decode, ModuleApi, QueryApi};
use crate::dispatcher::Dispatcher;
use crate::{Error, Result};
use async_trait::async_trait;
use lcd_math::{Coin, Coins, Dec};
use lcd_types::AccAddress;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Coins,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: Option<Coin>,
}

#[derive(Deserialize)]
struct SupplyResponse {
    supply: Coins,
}

#[derive(Clone, Debug)]
pub struct BankApi {
    inner: ModuleApi,
}

impl BankApi {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: ModuleApi::new("bank", "/cosmos/bank/v1beta1", dispatcher),
        }
    }

    /// All non-zero balances of `address`
    pub async fn balances(&self, address: &AccAddress) -> Result<Coins> {
        let response = self.get(&format!("balances/{address}"), &[]).await?;
        let parsed: BalancesResponse = decode(response, "balances")?;
        Ok(parsed.balances)
    }

    /// Balance of one denomination, zero when the account holds none
    pub async fn balance(&self, address: &AccAddress, denom: &str) -> Result<Coin> {
        let query = [("denom".to_string(), denom.to_string())];
        let response = self
            .get(&format!("balances/{address}/by_denom"), &query)
            .await?;
        let parsed: BalanceResponse = decode(response, "balance")?;
        match parsed.balance {
            Some(coin) => Ok(coin),
            None => Coin::new(denom, Dec::zero()).map_err(|e| Error::Decode(e.to_string())),
        }
    }

    pub async fn total_supply(&self) -> Result<Coins> {
        let response = self.get("supply", &[]).await?;
        let parsed: SupplyResponse = decode(response, "supply")?;
        Ok(parsed.supply)
    }
}

#[async_trait]
impl QueryApi for BankApi {
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
