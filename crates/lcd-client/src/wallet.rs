//! A client bound to one signing key
//!
//! Wallets do not reserve sequences. Two transactions created concurrently
//! for the same account will sign with the same sequence and one of them
//! will be rejected with [`Error::SequenceConflict`](crate::Error). Callers
//! sending in parallel from one account must serialize submissions or
//! pass explicit sequences.

use crate::api::{AccountInfo, BroadcastResult};
use crate::builder::{SignedTx, SignerAccount, SignerEntry};
use crate::estimator::{FeeOverrides, SignerData};
use crate::{LcdClient, Result};
use lcd_keyring::SigningKey;
use lcd_types::{AccAddress, Fee, Msg, UnsignedTx};
use std::fmt;
use std::sync::Arc;

/// What to put in a transaction and how to pay for it
#[derive(Debug, Clone, Default)]
pub struct CreateTxOptions {
    pub msgs: Vec<Msg>,
    pub memo: Option<String>,
    pub timeout_height: Option<u64>,
    pub fee: FeeOverrides,
    /// Skip the account lookup when both this and `sequence` are set
    pub account_number: Option<u64>,
    pub sequence: Option<u64>,
}

impl CreateTxOptions {
    pub fn new(msgs: Vec<Msg>) -> Self {
        Self {
            msgs,
            ..Default::default()
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_timeout_height(mut self, height: u64) -> Self {
        self.timeout_height = Some(height);
        self
    }

    pub fn with_fee(mut self, fee: FeeOverrides) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_account(mut self, account_number: u64, sequence: u64) -> Self {
        self.account_number = Some(account_number);
        self.sequence = Some(sequence);
        self
    }

    fn unsigned_tx(&self) -> UnsignedTx {
        UnsignedTx {
            messages: self.msgs.clone(),
            memo: self.memo.clone(),
            timeout_height: self.timeout_height,
        }
    }
}

#[derive(Clone)]
pub struct Wallet {
    client: Arc<LcdClient>,
    key: Arc<dyn SigningKey>,
}

impl Wallet {
    pub fn new(client: Arc<LcdClient>, key: Arc<dyn SigningKey>) -> Self {
        Self { client, key }
    }

    pub fn client(&self) -> &Arc<LcdClient> {
        &self.client
    }

    pub fn key(&self) -> &Arc<dyn SigningKey> {
        &self.key
    }

    pub fn address(&self) -> AccAddress {
        self.key.address()
    }

    pub async fn account_info(&self) -> Result<AccountInfo> {
        self.client.auth().account_info(&self.address()).await
    }

    /// Account number and sequence, looked up only for what `options` leaves
    /// unset
    async fn signer_account(&self, options: &CreateTxOptions) -> Result<SignerAccount> {
        match (options.account_number, options.sequence) {
            (Some(account_number), Some(sequence)) => Ok(SignerAccount {
                account_number,
                sequence,
            }),
            (account_number, sequence) => {
                let info = self.account_info().await?;
                Ok(SignerAccount {
                    account_number: account_number.unwrap_or(info.account_number),
                    sequence: sequence.unwrap_or(info.sequence),
                })
            }
        }
    }

    fn signer_data(&self, sequence: u64) -> SignerData {
        SignerData {
            public_key: self.key.public_key(),
            sequence,
        }
    }

    /// Unsigned transaction and its fee. The account is only consulted when
    /// the fee needs a simulation and no sequence was given.
    pub async fn create_tx(&self, options: &CreateTxOptions) -> Result<(UnsignedTx, Fee)> {
        let tx = options.unsigned_tx();
        let signers = match (options.fee.gas_limit, options.sequence) {
            (Some(_), _) => Vec::new(),
            (None, Some(sequence)) => vec![self.signer_data(sequence)],
            (None, None) => vec![self.signer_data(self.account_info().await?.sequence)],
        };
        let fee = self.client.estimate(&tx, &signers, &options.fee).await?;
        Ok((tx, fee))
    }

    #[tracing::instrument(skip_all, fields(address = %self.address()))]
    pub async fn create_and_sign_tx(&self, options: &CreateTxOptions) -> Result<SignedTx> {
        let account = self.signer_account(options).await?;
        let tx = options.unsigned_tx();
        let fee = self
            .client
            .estimate(&tx, &[self.signer_data(account.sequence)], &options.fee)
            .await?;
        let signer = SignerEntry::new(self.key.clone())
            .with_account(account.account_number, account.sequence);
        self.client.build(&tx, &fee, &[signer]).await
    }

    pub async fn create_sign_and_broadcast(&self, options: &CreateTxOptions) -> Result<BroadcastResult> {
        let signed = self.create_and_sign_tx(options).await?;
        self.client.submit(&signed).await
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
