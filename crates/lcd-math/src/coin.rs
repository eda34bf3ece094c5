//! Coin and Coins types for multi-asset amounts

use crate::decimal::Dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("negative amount not allowed: {0}")]
    NegativeAmount(String),

    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("invalid coin string: {0:?}")]
    InvalidCoinString(String),
}

/// A single denomination and its decimal amount
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Dec,
}

impl Coin {
    /// Create a new coin, validating denomination and amount
    pub fn new(denom: impl Into<String>, amount: Dec) -> Result<Self, CoinError> {
        let denom = denom.into();
        if !is_valid_denom(&denom) {
            return Err(CoinError::InvalidDenom(denom));
        }
        if amount.is_negative() {
            return Err(CoinError::NegativeAmount(format!("{amount}{denom}")));
        }
        Ok(Self { denom, amount })
    }

    /// Parse the amount from a decimal string
    pub fn parse(denom: impl Into<String>, amount: &str) -> Result<Self, CoinError> {
        let amount = amount
            .parse::<Dec>()
            .map_err(|e| CoinError::InvalidAmount {
                amount: amount.to_string(),
                reason: e.to_string(),
            })?;
        Self::new(denom, amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    /// Parse `"0.15uinit"` style text
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split_pos = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| CoinError::InvalidCoinString(s.to_string()))?;
        let (amount, denom) = s.split_at(split_pos);
        if amount.is_empty() {
            return Err(CoinError::InvalidCoinString(s.to_string()));
        }
        Self::parse(denom, amount)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCoin {
            denom: String,
            amount: Dec,
        }

        let raw = RawCoin::deserialize(deserializer)?;
        Coin::new(raw.denom, raw.amount).map_err(serde::de::Error::custom)
    }
}

/// A set of coins keyed by denomination, kept sorted.
///
/// Invariants: one entry per denomination, no zero amounts. Every
/// arithmetic operation returns a new set. Subtraction can produce
/// negative entries, which is how a delta between two sets is expressed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a set from coins, summing repeated denominations
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Self {
        let mut merged: BTreeMap<String, Dec> = BTreeMap::new();
        for coin in coins {
            let entry = merged.entry(coin.denom).or_insert_with(Dec::zero);
            *entry = &*entry + &coin.amount;
        }
        Self::from_map(merged)
    }

    fn from_map(map: BTreeMap<String, Dec>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(denom, amount)| Coin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, Dec> {
        self.0
            .iter()
            .map(|c| (c.denom.clone(), c.amount.clone()))
            .collect()
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    /// Denominations in sorted order
    pub fn denoms(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.denom.as_str()).collect()
    }

    pub fn get(&self, denom: &str) -> Option<&Coin> {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .ok()
            .map(|i| &self.0[i])
    }

    /// Amount of a denomination, zero when absent
    pub fn amount_of(&self, denom: &str) -> Dec {
        self.get(denom).map(|c| c.amount.clone()).unwrap_or_default()
    }

    pub fn add(&self, other: &Coins) -> Coins {
        let mut map = self.to_map();
        for coin in &other.0 {
            let entry = map.entry(coin.denom.clone()).or_insert_with(Dec::zero);
            *entry = &*entry + &coin.amount;
        }
        Self::from_map(map)
    }

    pub fn sub(&self, other: &Coins) -> Coins {
        let mut map = self.to_map();
        for coin in &other.0 {
            let entry = map.entry(coin.denom.clone()).or_insert_with(Dec::zero);
            *entry = &*entry - &coin.amount;
        }
        Self::from_map(map)
    }

    /// Scale every amount by `factor`
    pub fn mul(&self, factor: &Dec) -> Coins {
        Self::from_map(
            self.0
                .iter()
                .map(|c| (c.denom.clone(), &c.amount * factor))
                .collect(),
        )
    }

    /// Round every amount up to a whole number
    pub fn ceil(&self) -> Coins {
        Self::from_map(
            self.0
                .iter()
                .map(|c| (c.denom.clone(), c.amount.ceil()))
                .collect(),
        )
    }

    pub fn is_any_negative(&self) -> bool {
        self.0.iter().any(|c| c.amount.is_negative())
    }

    pub fn is_integral(&self) -> bool {
        self.0.iter().all(|c| c.amount.is_integer())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", s.join(","))
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    /// Parse `"0.15uinit,1uusdc"`; the empty string is the empty set
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coins = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(coins))
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Self::new([coin])
    }
}

impl<'de> Deserialize<'de> for Coins {
    /// Accepts the LCD list form, a `denom -> amount` table, or coin text
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CoinsInput {
            List(Vec<Coin>),
            Table(BTreeMap<String, Dec>),
            Text(String),
        }

        match CoinsInput::deserialize(deserializer)? {
            CoinsInput::List(coins) => Ok(Coins::new(coins)),
            CoinsInput::Table(table) => table
                .into_iter()
                .map(|(denom, amount)| Coin::new(denom, amount))
                .collect::<Result<Vec<_>, _>>()
                .map(Coins::new)
                .map_err(serde::de::Error::custom),
            CoinsInput::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Cosmos SDK denomination rule: `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    (3..=128).contains(&denom.len())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}
