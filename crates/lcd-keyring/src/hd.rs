//! Mnemonic keys with BIP-32/BIP-44 derivation
//!
//! Cosmos chains derive account keys at `m/44'/118'/{account}'/0/{index}`.
//!
//! Reference: https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki
//!            https://github.com/bitcoin/bips/blob/master/bip-0044.mediawiki

use crate::{KeyringError, RawKey, SigningKey};
use async_trait::async_trait;
use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey as Secp256k1PrivKey;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use lcd_crypto::{PrivateKey, PublicKey};
use sha2::Sha512;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

/// SLIP-0044 coin type registered for Cosmos
pub const COSMOS_COIN_TYPE: u32 = 118;

const HARDENED: u32 = 1 << 31;

/// A parsed derivation path such as `m/44'/118'/0'/0/0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    indices: Vec<u32>,
}

impl DerivationPath {
    pub fn parse(path: &str) -> Result<Self, KeyringError> {
        let rest = path
            .strip_prefix("m/")
            .or_else(|| path.strip_prefix("M/"))
            .ok_or_else(|| KeyringError::InvalidPath(format!("{path}: must start with m/")))?;

        let mut indices = Vec::new();
        for component in rest.split('/').filter(|c| !c.is_empty()) {
            let (digits, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (component, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| KeyringError::InvalidPath(format!("bad component {component}")))?;
            if index >= HARDENED {
                return Err(KeyringError::InvalidPath(format!(
                    "index {index} out of range"
                )));
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }

        Ok(Self { indices })
    }

    /// `m/44'/{coin_type}'/{account}'/0/{index}`
    pub fn bip44(coin_type: u32, account: u32, index: u32) -> Self {
        Self {
            indices: vec![
                44 | HARDENED,
                coin_type | HARDENED,
                account | HARDENED,
                0,
                index,
            ],
        }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for index in &self.indices {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

/// BIP-32 extended private key (secp256k1 only)
struct ExtendedKey {
    secret: Scalar,
    chain_code: [u8; 32],
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.chain_code.zeroize();
    }
}

impl ExtendedKey {
    fn master(seed: &[u8]) -> Result<Self, KeyringError> {
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| KeyringError::BackendError(e.to_string()))?;
        mac.update(seed);
        Self::split(&mac.finalize().into_bytes(), None)
    }

    fn child(&self, index: u32) -> Result<Self, KeyringError> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| KeyringError::BackendError(e.to_string()))?;
        if index & HARDENED != 0 {
            mac.update(&[0u8]);
            mac.update(self.secret_bytes().as_slice());
        } else {
            let signing = Secp256k1PrivKey::from_slice(self.secret_bytes().as_slice())
                .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
            mac.update(signing.verifying_key().to_encoded_point(true).as_bytes());
        }
        mac.update(&index.to_be_bytes());
        Self::split(&mac.finalize().into_bytes(), Some(&self.secret))
    }

    /// Left half is the key (or the tweak added to `parent` mod n), right
    /// half the chain code. Out-of-range or zero keys are rejected.
    fn split(output: &[u8], parent: Option<&Scalar>) -> Result<Self, KeyringError> {
        let (left, right) = output.split_at(32);
        let tweak: Option<Scalar> = Scalar::from_repr(FieldBytes::clone_from_slice(left)).into();
        let tweak = tweak.ok_or_else(|| {
            KeyringError::InvalidKey("derived key exceeds curve order".to_string())
        })?;
        let secret = match parent {
            Some(parent) => *parent + tweak,
            None => tweak,
        };
        if secret == Scalar::ZERO {
            return Err(KeyringError::InvalidKey("derived key is zero".to_string()));
        }

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(right);
        Ok(Self { secret, chain_code })
    }

    fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&self.secret.to_bytes());
        bytes
    }

    fn private_key(&self) -> Result<PrivateKey, KeyringError> {
        Ok(PrivateKey::from_secp256k1_bytes(
            self.secret_bytes().as_slice(),
        )?)
    }
}

/// Derive the secp256k1 key at `path` from a mnemonic phrase
pub fn derive_private_key(
    mnemonic: &str,
    passphrase: &str,
    path: &DerivationPath,
) -> Result<PrivateKey, KeyringError> {
    let mnemonic = Mnemonic::parse_in(Language::English, mnemonic)
        .map_err(|_| KeyringError::InvalidMnemonic)?;
    let seed = Zeroizing::new(mnemonic.to_seed(passphrase));

    let mut key = ExtendedKey::master(seed.as_slice())?;
    for index in path.indices() {
        key = key.child(*index)?;
    }
    key.private_key()
}

/// Generate a random English mnemonic with 12, 15, 18, 21 or 24 words
pub fn generate_mnemonic(word_count: usize) -> Result<String, KeyringError> {
    use rand::RngCore;

    if !(12..=24).contains(&word_count) || word_count % 3 != 0 {
        return Err(KeyringError::BackendError(format!(
            "unsupported mnemonic length {word_count}"
        )));
    }
    let mut entropy = Zeroizing::new(vec![0u8; word_count / 3 * 4]);
    rand::thread_rng().fill_bytes(&mut entropy);

    Mnemonic::from_entropy(&entropy)
        .map(|m| m.to_string())
        .map_err(|e| KeyringError::BackendError(e.to_string()))
}

pub fn validate_mnemonic(mnemonic: &str) -> Result<(), KeyringError> {
    Mnemonic::parse_in(Language::English, mnemonic)
        .map(|_| ())
        .map_err(|_| KeyringError::InvalidMnemonic)
}

/// Derivation settings for [`MnemonicKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicOptions {
    pub coin_type: u32,
    pub account: u32,
    pub index: u32,
    pub passphrase: String,
}

impl Default for MnemonicOptions {
    fn default() -> Self {
        Self {
            coin_type: COSMOS_COIN_TYPE,
            account: 0,
            index: 0,
            passphrase: String::new(),
        }
    }
}

/// Key derived from a BIP-39 mnemonic. The phrase itself is not retained.
#[derive(Clone, Debug)]
pub struct MnemonicKey {
    inner: RawKey,
    path: DerivationPath,
}

impl MnemonicKey {
    /// Derive with the Cosmos defaults (`m/44'/118'/0'/0/0`)
    pub fn new(mnemonic: &str) -> Result<Self, KeyringError> {
        Self::with_options(mnemonic, &MnemonicOptions::default())
    }

    pub fn with_options(mnemonic: &str, options: &MnemonicOptions) -> Result<Self, KeyringError> {
        let path = DerivationPath::bip44(options.coin_type, options.account, options.index);
        Self::from_path(mnemonic, &options.passphrase, path)
    }

    pub fn from_path(
        mnemonic: &str,
        passphrase: &str,
        path: DerivationPath,
    ) -> Result<Self, KeyringError> {
        let private_key = derive_private_key(mnemonic, passphrase, &path)?;
        Ok(Self {
            inner: RawKey::new(private_key),
            path,
        })
    }

    /// Fresh 24 word mnemonic and the default key derived from it
    pub fn generate() -> Result<(String, Self), KeyringError> {
        let phrase = generate_mnemonic(24)?;
        let key = Self::new(&phrase)?;
        Ok((phrase, key))
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn private_key(&self) -> &PrivateKey {
        self.inner.private_key()
    }
}

#[async_trait]
impl SigningKey for MnemonicKey {
    fn public_key(&self) -> PublicKey {
        self.inner.public_key()
    }

    async fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, KeyringError> {
        self.inner.sign(payload).await
    }
}
