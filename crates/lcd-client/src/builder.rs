//! Transaction assembly and signing
//!
//! All signers share one `TxBody` and one `AuthInfo`. Each signs its own
//! `SignDoc`, which differs from the others only in the account number.

use crate::api::{AccountInfo, AuthApi};
use crate::{Error, Result};
use lcd_crypto::{verify_signature, PublicKey};
use lcd_keyring::{KeyringError, SigningKey};
use lcd_log::debug;
use lcd_types::{auth_info_bytes, encode_tx_raw, tx_hash, Fee, SignDoc, SignerInfo, UnsignedTx};
use std::fmt;
use std::sync::Arc;

/// Account number and sequence used when signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerAccount {
    pub account_number: u64,
    pub sequence: u64,
}

impl From<&AccountInfo> for SignerAccount {
    fn from(info: &AccountInfo) -> Self {
        Self {
            account_number: info.account_number,
            sequence: info.sequence,
        }
    }
}

/// A key together with the account state to sign with. Without an explicit
/// account the builder looks it up on chain.
#[derive(Clone)]
pub struct SignerEntry {
    pub key: Arc<dyn SigningKey>,
    pub account: Option<SignerAccount>,
}

impl SignerEntry {
    pub fn new(key: Arc<dyn SigningKey>) -> Self {
        Self { key, account: None }
    }

    /// Sign offline with a known account number and sequence
    pub fn with_account(mut self, account_number: u64, sequence: u64) -> Self {
        self.account = Some(SignerAccount {
            account_number,
            sequence,
        });
        self
    }
}

impl fmt::Debug for SignerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerEntry")
            .field("address", &self.key.address())
            .field("account", &self.account)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SigningOptions {
    /// Check every signature against its public key before returning
    pub verify_signatures: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            verify_signatures: true,
        }
    }
}

/// A fully signed transaction, ready to submit
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub unsigned: UnsignedTx,
    pub fee: Fee,
    /// One entry per signer, in signer-list order
    pub signatures: Vec<(PublicKey, Vec<u8>)>,
    /// Sequence each signer signed with, in the same order
    pub sequences: Vec<u64>,
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    /// `TxRaw` encoding accepted by the broadcast endpoint
    pub tx_bytes: Vec<u8>,
    pub tx_hash: String,
}

#[derive(Clone, Debug)]
pub struct TxBuilder {
    auth: AuthApi,
    chain_id: String,
    options: SigningOptions,
}

impl TxBuilder {
    pub fn new(auth: AuthApi, chain_id: impl Into<String>, options: SigningOptions) -> Self {
        Self {
            auth,
            chain_id: chain_id.into(),
            options,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Sign `tx` with every entry of `signers`, in order.
    ///
    /// Fails as a whole: the first failing key aborts the build with its
    /// position in the signer list.
    #[tracing::instrument(skip_all, fields(chain_id = %self.chain_id, signers = signers.len()))]
    pub async fn build(&self, tx: &UnsignedTx, fee: &Fee, signers: &[SignerEntry]) -> Result<SignedTx> {
        if tx.messages.is_empty() {
            return Err(Error::InvalidTx("transaction has no messages".to_string()));
        }
        if signers.is_empty() {
            return Err(Error::InvalidTx("transaction has no signers".to_string()));
        }

        let mut public_keys = Vec::with_capacity(signers.len());
        let mut accounts = Vec::with_capacity(signers.len());
        for signer in signers {
            let account = match signer.account {
                Some(account) => account,
                None => {
                    let info = self.auth.account_info(&signer.key.address()).await?;
                    SignerAccount::from(&info)
                }
            };
            public_keys.push(signer.key.public_key());
            accounts.push(account);
        }

        let signer_infos: Vec<SignerInfo> = public_keys
            .iter()
            .zip(&accounts)
            .map(|(public_key, account)| SignerInfo {
                public_key: Some(public_key.to_any()),
                sequence: account.sequence,
            })
            .collect();
        let body_bytes = tx.body_bytes();
        let auth_info_bytes = auth_info_bytes(&signer_infos, fee)?;

        let mut signatures = Vec::with_capacity(signers.len());
        for (index, ((signer, public_key), account)) in
            signers.iter().zip(public_keys).zip(&accounts).enumerate()
        {
            let sign_bytes = SignDoc {
                body_bytes: body_bytes.clone(),
                auth_info_bytes: auth_info_bytes.clone(),
                chain_id: self.chain_id.clone(),
                account_number: account.account_number,
            }
            .to_bytes();

            let signature = signer
                .key
                .sign(&sign_bytes)
                .await
                .map_err(|source| Error::Signing {
                    signer: index,
                    source,
                })?;

            if self.options.verify_signatures {
                verify_signature(&public_key, &sign_bytes, &signature).map_err(|e| Error::Signing {
                    signer: index,
                    source: KeyringError::SigningFailed(format!("signature does not verify: {e}")),
                })?;
            }
            signatures.push((public_key, signature));
        }

        let tx_bytes = encode_tx_raw(
            body_bytes.clone(),
            auth_info_bytes.clone(),
            signatures.iter().map(|(_, sig)| sig.clone()).collect(),
        );
        let tx_hash = tx_hash(&tx_bytes);
        debug!(%tx_hash, "signed transaction");

        Ok(SignedTx {
            unsigned: tx.clone(),
            fee: fee.clone(),
            signatures,
            sequences: accounts.iter().map(|account| account.sequence).collect(),
            body_bytes,
            auth_info_bytes,
            tx_bytes,
            tx_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::StaticDispatcher;
    use async_trait::async_trait;
    use lcd_keyring::RawKey;
    use lcd_math::Coins;
    use lcd_types::Msg;
    use serde_json::json;

    struct BrokenKey(RawKey);

    #[async_trait]
    impl SigningKey for BrokenKey {
        fn public_key(&self) -> PublicKey {
            self.0.public_key()
        }

        async fn sign(&self, _payload: &[u8]) -> std::result::Result<Vec<u8>, KeyringError> {
            Err(KeyringError::KeyUnavailable("hardware wallet unplugged".to_string()))
        }
    }

    /// Signs with a different key than it reports
    struct LyingKey {
        reported: RawKey,
        actual: RawKey,
    }

    #[async_trait]
    impl SigningKey for LyingKey {
        fn public_key(&self) -> PublicKey {
            self.reported.public_key()
        }

        async fn sign(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, KeyringError> {
            self.actual.sign(payload).await
        }
    }

    fn tx() -> UnsignedTx {
        UnsignedTx::new(vec![Msg::new("/cosmos.bank.v1beta1.MsgSend", vec![1, 2])]).with_memo("hi")
    }

    fn fee() -> Fee {
        Fee::new(200_000, "30000uinit".parse::<Coins>().unwrap())
    }

    fn builder(dispatcher: StaticDispatcher) -> TxBuilder {
        TxBuilder::new(
            AuthApi::new(dispatcher.into_arc()),
            "initiation-2",
            SigningOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_offline_multi_signer() {
        let first = RawKey::generate();
        let second = RawKey::generate();
        let signers = vec![
            SignerEntry::new(Arc::new(first.clone())).with_account(10, 3),
            SignerEntry::new(Arc::new(second.clone())).with_account(11, 0),
        ];

        let signed = builder(StaticDispatcher::default())
            .build(&tx(), &fee(), &signers)
            .await
            .unwrap();

        assert_eq!(signed.signatures.len(), 2);
        assert_eq!(signed.signatures[0].0, first.public_key());
        assert_eq!(signed.signatures[1].0, second.public_key());
        assert_eq!(signed.sequences, vec![3, 0]);
        assert_eq!(signed.tx_hash, tx_hash(&signed.tx_bytes));

        for ((public_key, signature), account_number) in signed.signatures.iter().zip([10, 11]) {
            let doc = SignDoc {
                body_bytes: signed.body_bytes.clone(),
                auth_info_bytes: signed.auth_info_bytes.clone(),
                chain_id: "initiation-2".to_string(),
                account_number,
            };
            verify_signature(public_key, &doc.to_bytes(), signature).unwrap();
        }
    }

    #[tokio::test]
    async fn test_account_lookup() {
        let key = RawKey::generate();
        let address = key.address();
        let dispatcher = StaticDispatcher::default().with(
            &format!("/cosmos/auth/v1beta1/accounts/{address}"),
            json!({
                "account": {
                    "address": address.to_string(),
                    "pub_key": null,
                    "account_number": "42",
                    "sequence": "7"
                }
            }),
        );

        let signed = builder(dispatcher)
            .build(&tx(), &fee(), &[SignerEntry::new(Arc::new(key))])
            .await
            .unwrap();
        assert_eq!(signed.sequences, vec![7]);
    }

    #[tokio::test]
    async fn test_failing_signer_aborts_build() {
        let signers = vec![
            SignerEntry::new(Arc::new(RawKey::generate())).with_account(1, 0),
            SignerEntry::new(Arc::new(BrokenKey(RawKey::generate()))).with_account(2, 0),
        ];
        let err = builder(StaticDispatcher::default())
            .build(&tx(), &fee(), &signers)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Signing { signer: 1, .. }));
        assert!(err.is_key_unavailable());
    }

    #[tokio::test]
    async fn test_verification_catches_wrong_key() {
        let lying = LyingKey {
            reported: RawKey::generate(),
            actual: RawKey::generate(),
        };
        let signers = vec![SignerEntry::new(Arc::new(lying)).with_account(1, 0)];

        let err = builder(StaticDispatcher::default())
            .build(&tx(), &fee(), &signers)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Signing {
                signer: 0,
                source: KeyringError::SigningFailed(_)
            }
        ));

        let unchecked = TxBuilder::new(
            AuthApi::new(StaticDispatcher::default().into_arc()),
            "initiation-2",
            SigningOptions {
                verify_signatures: false,
            },
        );
        assert!(unchecked.build(&tx(), &fee(), &signers).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_empty_inputs() {
        let b = builder(StaticDispatcher::default());
        let signer = SignerEntry::new(Arc::new(RawKey::generate())).with_account(1, 0);

        let empty = UnsignedTx::new(vec![]);
        assert!(matches!(
            b.build(&empty, &fee(), &[signer]).await,
            Err(Error::InvalidTx(_))
        ));
        assert!(matches!(
            b.build(&tx(), &fee(), &[]).await,
            Err(Error::InvalidTx(_))
        ));
    }
}
