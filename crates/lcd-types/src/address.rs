//! Account addresses

use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bech32 prefix used when an address is displayed without an explicit one
pub const DEFAULT_HRP: &str = "init";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid bech32 prefix {hrp:?}: {reason}")]
    InvalidPrefix { hrp: String, reason: String },

    #[error("invalid bech32 address: {0}")]
    InvalidBech32(String),

    #[error("invalid address length: expected 20 or 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Account address. 20 bytes for key-derived accounts, 32 for module and
/// contract accounts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccAddress(Vec<u8>);

impl AccAddress {
    /// Derive from a compressed secp256k1 key: `ripemd160(sha256(pubkey))`
    pub fn from_pubkey(pubkey_bytes: &[u8]) -> Self {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        let ripemd160_hash = Ripemd160::digest(sha256_hash);
        Self(ripemd160_hash.to_vec())
    }

    /// Derive from an ed25519 key: the first 20 bytes of `sha256(pubkey)`
    pub fn from_ed25519_pubkey(pubkey_bytes: &[u8]) -> Self {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        Self(sha256_hash[..20].to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        match bytes.len() {
            20 | 32 => Ok(Self(bytes.to_vec())),
            len => Err(AddressError::InvalidLength(len)),
        }
    }

    pub fn to_bech32(&self, hrp: &str) -> Result<String, AddressError> {
        let parsed = Hrp::parse(hrp).map_err(|e| AddressError::InvalidPrefix {
            hrp: hrp.to_string(),
            reason: e.to_string(),
        })?;
        bech32::encode::<Bech32>(parsed, &self.0)
            .map_err(|e| AddressError::InvalidBech32(e.to_string()))
    }

    /// Parse a bech32 string, returning its prefix alongside the address
    pub fn from_bech32(s: &str) -> Result<(String, Self), AddressError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|e| AddressError::InvalidBech32(e.to_string()))?;
        Ok((hrp.to_string(), Self::from_bytes(&data)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_bech32(DEFAULT_HRP).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for AccAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, addr) = Self::from_bech32(s)?;
        Ok(addr)
    }
}

impl Serialize for AccAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = self
            .to_bech32(DEFAULT_HRP)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bech32_roundtrip_keeps_prefix() {
        let addr = AccAddress::from_pubkey(&[2u8; 33]);
        let encoded = addr.to_bech32("cosmos").unwrap();
        assert!(encoded.starts_with("cosmos1"));
        let (hrp, decoded) = AccAddress::from_bech32(&encoded).unwrap();
        assert_eq!(hrp, "cosmos");
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_display_uses_default_prefix() {
        let addr = AccAddress::from_pubkey(&[3u8; 33]);
        assert!(addr.to_string().starts_with("init1"));
        assert_eq!(addr.as_bytes().len(), 20);
    }

    #[test]
    fn test_derivation_differs_by_key_type() {
        let bytes = [7u8; 32];
        assert_ne!(
            AccAddress::from_pubkey(&bytes),
            AccAddress::from_ed25519_pubkey(&bytes)
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(AccAddress::from_bytes(&[0u8; 19]).is_err());
        assert!("not-an-address".parse::<AccAddress>().is_err());
        assert!(AccAddress::from_pubkey(&[1u8; 33])
            .to_bech32("")
            .is_err());
    }

    #[test]
    fn test_serde_as_bech32_string() {
        let addr = AccAddress::from_pubkey(&[4u8; 33]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: AccAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
