//! Account lookups

use super::{de_u64, decode, ModuleApi, QueryApi};
use crate::dispatcher::Dispatcher;
use crate::{Error, Result};
use async_trait::async_trait;
use lcd_crypto::PublicKey;
use lcd_types::AccAddress;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// On-chain account state needed for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: AccAddress,
    pub account_number: u64,
    pub sequence: u64,
    /// Unset until the account has signed its first transaction
    pub public_key: Option<PublicKey>,
}

#[derive(Deserialize)]
struct BaseAccount {
    address: AccAddress,
    #[serde(default)]
    pub_key: Option<PublicKey>,
    #[serde(deserialize_with = "de_u64")]
    account_number: u64,
    #[serde(deserialize_with = "de_u64")]
    sequence: u64,
}

/// Locate the base account inside vesting and module account wrappers
fn base_account(account: &Value) -> Option<&Value> {
    if account.get("account_number").is_some() {
        return Some(account);
    }
    ["base_account", "base_vesting_account"]
        .iter()
        .find_map(|field| account.get(field))
        .and_then(base_account)
}

#[derive(Clone, Debug)]
pub struct AuthApi {
    inner: ModuleApi,
}

impl AuthApi {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            inner: ModuleApi::new("auth", "/cosmos/auth/v1beta1", dispatcher),
        }
    }

    /// Account number, sequence and public key of `address`
    pub async fn account_info(&self, address: &AccAddress) -> Result<AccountInfo> {
        let response = self.get(&format!("accounts/{address}"), &[]).await?;
        let account = response
            .get("account")
            .and_then(base_account)
            .ok_or_else(|| Error::Decode(format!("no base account in response for {address}")))?;
        let base: BaseAccount = decode(account.clone(), "account")?;

        Ok(AccountInfo {
            address: base.address,
            account_number: base.account_number,
            sequence: base.sequence,
            public_key: base.pub_key,
        })
    }
}

#[async_trait]
impl QueryApi for AuthApi {
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
