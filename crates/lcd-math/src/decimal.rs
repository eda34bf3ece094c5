//! Arbitrary precision fixed-point decimal for amounts, prices and multipliers
//!
//! Values carry 18 fractional digits, like the Cosmos SDK `Dec`, on top of
//! an unbounded integer. Chain amounts are 256-bit integers, so addition,
//! subtraction and multiplication never overflow here.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits kept by [`Dec`]
pub const PRECISION: u32 = 18;

const SCALE: u64 = 1_000_000_000_000_000_000;

fn scale() -> BigInt {
    BigInt::from(SCALE)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecError {
    #[error("invalid decimal {0:?}")]
    Invalid(String),

    #[error("decimal {0:?} has more than 18 fractional digits")]
    TooPrecise(String),
}

/// Decimal stored as `value * 10^18` in a `BigInt`, serialized as a string
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(BigInt);

impl Dec {
    pub fn from_u64(n: u64) -> Self {
        Self(BigInt::from(n) * scale())
    }

    /// `atomics / 10^decimal_places`, truncated to 18 fractional digits
    pub fn from_atomics(atomics: u64, decimal_places: u32) -> Self {
        let atomics = BigInt::from(atomics);
        if decimal_places <= PRECISION {
            let shift = num_traits::pow(BigInt::from(10u8), (PRECISION - decimal_places) as usize);
            Self(atomics * shift)
        } else {
            let shift = num_traits::pow(BigInt::from(10u8), (decimal_places - PRECISION) as usize);
            Self(atomics / shift)
        }
    }

    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// True when there is no fractional part
    pub fn is_integer(&self) -> bool {
        (&self.0 % scale()).is_zero()
    }

    /// Checked division, `None` on a zero divisor
    pub fn checked_div(&self, other: &Self) -> Option<Self> {
        if other.is_zero() {
            None
        } else {
            Some(Self(&self.0 * scale() / &other.0))
        }
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Whole part and remainder, both with the sign of `self`
    fn split(&self) -> (BigInt, BigInt) {
        let s = scale();
        (&self.0 / &s, &self.0 % &s)
    }

    pub fn floor(&self) -> Self {
        let (whole, rest) = self.split();
        let whole = if rest.is_negative() { whole - 1 } else { whole };
        Self(whole * scale())
    }

    /// Smallest integer greater than or equal to this value
    pub fn ceil(&self) -> Self {
        let (whole, rest) = self.split();
        let whole = if rest.is_positive() { whole + 1 } else { whole };
        Self(whole * scale())
    }

    /// Round up and convert to u64. `None` when negative or out of range.
    pub fn ceil_u64(&self) -> Option<u64> {
        if self.is_negative() {
            return None;
        }
        (self.ceil().0 / scale()).to_u64()
    }
}

impl FromStr for Dec {
    type Err = DecError;

    /// Plain decimal notation: optional sign, digits, optional fraction
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecError::Invalid(s.to_string());
        let text = s.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !is_digits(whole) || !is_digits(fraction) {
            return Err(invalid());
        }
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > PRECISION as usize {
            return Err(DecError::TooPrecise(s.to_string()));
        }

        let mut digits = String::with_capacity(whole.len() + PRECISION as usize);
        digits.push_str(whole);
        digits.push_str(fraction);
        digits.extend(std::iter::repeat('0').take(PRECISION as usize - fraction.len()));
        let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl From<u64> for Dec {
    fn from(n: u64) -> Self {
        Self::from_u64(n)
    }
}

impl fmt::Display for Dec {
    /// Shortest form: no trailing fractional zeros, no point for integers
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = scale();
        let magnitude = self.0.abs();
        let (whole, rest) = (&magnitude / &s, &magnitude % &s);
        if self.is_negative() {
            f.write_str("-")?;
        }
        write!(f, "{whole}")?;
        if !rest.is_zero() {
            let rest = rest.to_string();
            let padded = format!("{}{rest}", "0".repeat(PRECISION as usize - rest.len()));
            write!(f, ".{}", padded.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

impl Serialize for Dec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct DecVisitor;

impl<'de> Visitor<'de> for DecVisitor {
    type Value = Dec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Dec, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Dec, E> {
        Ok(Dec::from_u64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Dec, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Dec, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("non-finite decimal {v}")));
        }
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DecVisitor)
    }
}

impl Add for &Dec {
    type Output = Dec;

    fn add(self, other: &Dec) -> Dec {
        Dec(&self.0 + &other.0)
    }
}

impl Sub for &Dec {
    type Output = Dec;

    fn sub(self, other: &Dec) -> Dec {
        Dec(&self.0 - &other.0)
    }
}

impl Mul for &Dec {
    type Output = Dec;

    /// Exact product truncated toward zero at 18 fractional digits
    fn mul(self, other: &Dec) -> Dec {
        Dec(&self.0 * &other.0 / scale())
    }
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, other: Dec) -> Dec {
        &self + &other
    }
}

impl Sub for Dec {
    type Output = Dec;

    fn sub(self, other: Dec) -> Dec {
        &self - &other
    }
}

impl Mul for Dec {
    type Output = Dec;

    fn mul(self, other: Dec) -> Dec {
        &self * &other
    }
}

impl Neg for Dec {
    type Output = Dec;

    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}
