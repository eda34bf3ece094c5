//! Key representations using static enum dispatch

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{SigningKey as Ed25519PrivKey, VerifyingKey as Ed25519PubKey};
use k256::ecdsa::{SigningKey as Secp256k1PrivKey, VerifyingKey as Secp256k1PubKey};
use lcd_types::{AccAddress, Any};
use prost::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

pub const SECP256K1_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
pub const ED25519_TYPE_URL: &str = "/cosmos.crypto.ed25519.PubKey";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid {algo} key: {reason}")]
    InvalidKey { algo: &'static str, reason: String },

    #[error("unknown public key type: {0}")]
    UnknownKeyType(String),

    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),
}

/// All supported public key types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Secp256k1(Secp256k1PubKey),
    Ed25519(Ed25519PubKey),
}

/// All supported private key types
#[derive(Clone)]
pub enum PrivateKey {
    Secp256k1(Secp256k1PrivKey),
    Ed25519(Ed25519PrivKey),
}

/// Cosmos `PubKey { bytes key = 1; }` wrapper used inside `Any`
#[derive(Clone, PartialEq, Message)]
struct PubKeyProto {
    #[prost(bytes = "vec", tag = "1")]
    key: Vec<u8>,
}

impl PublicKey {
    /// Derive the account address for this key
    pub fn to_address(&self) -> AccAddress {
        match self {
            PublicKey::Secp256k1(_) => AccAddress::from_pubkey(&self.to_bytes()),
            PublicKey::Ed25519(_) => AccAddress::from_ed25519_pubkey(&self.to_bytes()),
        }
    }

    /// Protobuf type URL for this key type
    pub fn type_url(&self) -> &'static str {
        match self {
            PublicKey::Secp256k1(_) => SECP256K1_TYPE_URL,
            PublicKey::Ed25519(_) => ED25519_TYPE_URL,
        }
    }

    /// Raw key bytes (compressed SEC1 for secp256k1)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Secp256k1(key) => key.to_encoded_point(true).as_bytes().to_vec(),
            PublicKey::Ed25519(key) => key.as_bytes().to_vec(),
        }
    }

    /// Build from a type URL and raw key bytes
    pub fn from_raw(type_url: &str, bytes: &[u8]) -> Result<Self, KeyError> {
        match type_url {
            SECP256K1_TYPE_URL => Secp256k1PubKey::from_sec1_bytes(bytes)
                .map(PublicKey::Secp256k1)
                .map_err(|e| KeyError::InvalidKey {
                    algo: "secp256k1",
                    reason: e.to_string(),
                }),
            ED25519_TYPE_URL => {
                let bytes: &[u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidKey {
                    algo: "ed25519",
                    reason: format!("expected 32 bytes, got {}", bytes.len()),
                })?;
                Ed25519PubKey::from_bytes(bytes)
                    .map(PublicKey::Ed25519)
                    .map_err(|e| KeyError::InvalidKey {
                        algo: "ed25519",
                        reason: e.to_string(),
                    })
            }
            other => Err(KeyError::UnknownKeyType(other.to_string())),
        }
    }

    /// Pack into a protobuf `Any` for signer infos
    pub fn to_any(&self) -> Any {
        Any {
            type_url: self.type_url().to_string(),
            value: PubKeyProto {
                key: self.to_bytes(),
            }
            .encode_to_vec(),
        }
    }

    pub fn from_any(any: &Any) -> Result<Self, KeyError> {
        let wrapper = PubKeyProto::decode(any.value.as_slice())
            .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        Self::from_raw(&any.type_url, &wrapper.key)
    }
}

impl PrivateKey {
    /// Generate a fresh secp256k1 key from the OS RNG
    pub fn generate_secp256k1() -> Self {
        PrivateKey::Secp256k1(Secp256k1PrivKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_secp256k1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        Secp256k1PrivKey::from_slice(bytes)
            .map(PrivateKey::Secp256k1)
            .map_err(|e| KeyError::InvalidKey {
                algo: "secp256k1",
                reason: e.to_string(),
            })
    }

    pub fn from_ed25519_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidKey {
            algo: "ed25519",
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })?;
        Ok(PrivateKey::Ed25519(Ed25519PrivKey::from_bytes(bytes)))
    }

    /// Parse a hex-encoded secp256k1 secret
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?,
        );
        Self::from_secp256k1_bytes(&bytes)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Secp256k1(key) => PublicKey::Secp256k1(*key.verifying_key()),
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
        }
    }

    /// Secret bytes, wiped on drop
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            PrivateKey::Secp256k1(key) => Zeroizing::new(key.to_bytes().to_vec()),
            PrivateKey::Ed25519(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            PrivateKey::Secp256k1(_) => "secp256k1",
            PrivateKey::Ed25519(_) => "ed25519",
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .field("address", &self.public_key().to_address().to_string())
            .finish_non_exhaustive()
    }
}

/// LCD JSON form: `{"@type": "/cosmos.crypto.secp256k1.PubKey", "key": "<base64>"}`
#[derive(Serialize, Deserialize)]
struct PublicKeyJson {
    #[serde(rename = "@type")]
    key_type: String,
    key: String,
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PublicKeyJson {
            key_type: self.type_url().to_string(),
            key: general_purpose::STANDARD.encode(self.to_bytes()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = PublicKeyJson::deserialize(deserializer)?;
        let bytes = general_purpose::STANDARD
            .decode(&data.key)
            .map_err(serde::de::Error::custom)?;
        PublicKey::from_raw(&data.key_type, &bytes).map_err(serde::de::Error::custom)
    }
}
