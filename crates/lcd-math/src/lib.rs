//! Decimal and coin arithmetic for the LCD client
//!
//! Amounts on the LCD wire are decimal strings. Gas prices are fractional
//! (`0.15uinit`), fee amounts are whole numbers, and both live in the same
//! [`Coins`] set.

pub mod coin;
pub mod decimal;

pub use coin::{Coin, CoinError, Coins};
pub use decimal::{Dec, DecError};
