//! Exact-decimal money types shared across the engine and wire formats.
//!
//! Everything that represents a price, a quantity, or a balance is a
//! `rust_decimal::Decimal`. Floating point is only allowed inside the price
//! model, which must round back to a `Decimal` before anything else sees it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An asset code such as `"BTC"` or `"USD"`. Cheaply cloneable.
pub type Asset = Arc<str>;

/// A trading pair, e.g. `BTC/USD`. The book and the price series for a
/// symbol are both keyed by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    pub base: Asset,
    pub quote: Asset,
}

impl Symbol {
    pub fn new(base: impl Into<Asset>, quote: impl Into<Asset>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Error returned when a `"BASE/QUOTE"` string does not parse as a [`Symbol`].
#[derive(Debug, thiserror::Error)]
#[error("invalid symbol {0:?}, expected BASE/QUOTE")]
pub struct ParseSymbolError(String);

impl FromStr for Symbol {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Symbol::new(base, quote))
            }
            _ => Err(ParseSymbolError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = ParseSymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

/// A non-negative balance split between `free` (spendable) and `locked`
/// (reserved against a resting order).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Balance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parses_base_quote() {
        let sym: Symbol = "BTC/USD".parse().unwrap();
        assert_eq!(sym.base.as_ref(), "BTC");
        assert_eq!(sym.quote.as_ref(), "USD");
        assert_eq!(sym.to_string(), "BTC/USD");
    }

    #[test]
    fn test_symbol_rejects_missing_separator() {
        assert!("BTCUSD".parse::<Symbol>().is_err());
        assert!("/USD".parse::<Symbol>().is_err());
        assert!("BTC/".parse::<Symbol>().is_err());
    }

    #[test]
    fn test_balance_total_is_free_plus_locked() {
        let bal = Balance {
            free: Decimal::new(100, 0),
            locked: Decimal::new(50, 0),
        };
        assert_eq!(bal.total(), Decimal::new(150, 0));
    }
}
