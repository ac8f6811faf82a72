use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of a currency as it appears in client files and rate tables.
///
/// Names are the bank's own lowercase words (`"euro"`, `"zloty"`, `"dolar"`
/// spelled as client files spell it), not ISO codes. Nothing normalizes them:
/// comparison is byte-exact, so `"Euro"` and `"euro"` are different
/// currencies. Whether a name is usable is decided by the bank's known set,
/// not here.
///
/// # Examples
///
/// ```
/// use bank_exchange::core::currency::CurrencyCode;
///
/// let dolar: CurrencyCode = "dolar".into();
/// assert_eq!(dolar.as_str(), "dolar");
/// assert_ne!(CurrencyCode::new("Euro"), CurrencyCode::new("euro"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for CurrencyCode {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Errors arising from exchange rate lookups and updates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FxError {
    #[error("exchange from {from} to {to} is not available")]
    RateNotFound {
        from: CurrencyCode,
        to: CurrencyCode,
    },
    #[error("exchange rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    },
    #[error("converting {amount} {from} to {to} overflows")]
    Overflow {
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    },
}

/// An ordered pair of currencies: the direction of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// Fixed exchange rates between ordered currency pairs.
///
/// A rate of `r` for `(from, to)` means one unit of `from` buys `r` units
/// of `to`. Pairs are looked up exactly: there is no implicit identity rate
/// and no cross-rate routing through a third currency.
///
/// # Examples
///
/// ```
/// use bank_exchange::core::currency::{CurrencyCode, RateTable};
/// use rust_decimal_macros::dec;
///
/// let mut rates = RateTable::new();
/// rates.set_rate(CurrencyCode::new("euro"), CurrencyCode::new("zloty"), dec!(4.34)).unwrap();
///
/// let converted = rates
///     .convert(dec!(10), &CurrencyCode::new("euro"), &CurrencyCode::new("zloty"))
///     .unwrap();
/// assert_eq!(converted, dec!(43.4));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: BTreeMap<CurrencyPair, Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a rate and its reciprocal: `from -> to` at `rate`, `to -> from`
    /// at `1 / rate`.
    pub fn set_rate(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    ) -> Result<(), FxError> {
        Self::validate(&from, &to, rate)?;
        self.rates
            .insert(CurrencyPair::new(to.clone(), from.clone()), Decimal::ONE / rate);
        self.rates.insert(CurrencyPair::new(from, to), rate);
        Ok(())
    }

    /// Set a single direction only, replacing any reciprocal stored for it.
    ///
    /// Used for independently quoted buy/sell rates.
    pub fn set_directional_rate(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    ) -> Result<(), FxError> {
        Self::validate(&from, &to, rate)?;
        self.rates.insert(CurrencyPair::new(from, to), rate);
        Ok(())
    }

    fn validate(from: &CurrencyCode, to: &CurrencyCode, rate: Decimal) -> Result<(), FxError> {
        if rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate {
                from: from.clone(),
                to: to.clone(),
                rate,
            });
        }
        Ok(())
    }

    /// Get the exchange rate from one currency to another.
    pub fn get_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError> {
        self.rates
            .get(&CurrencyPair::new(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| FxError::RateNotFound {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Convert an amount from one currency to another.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, FxError> {
        let rate = self.get_rate(from, to)?;
        amount.checked_mul(rate).ok_or_else(|| FxError::Overflow {
            from: from.clone(),
            to: to.clone(),
            amount,
        })
    }

    /// All stored rates, ordered by pair.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyPair, Decimal)> {
        self.rates.iter().map(|(pair, rate)| (pair, *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl fmt::Display for RateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Exchange Rates ===")?;
        for (pair, rate) in self.iter() {
            writeln!(f, "  {:<16} {}", pair.to_string(), rate.round_dp(6))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn euro() -> CurrencyCode {
        CurrencyCode::new("euro")
    }

    fn zloty() -> CurrencyCode {
        CurrencyCode::new("zloty")
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut rates = RateTable::new();
        rates.set_rate(euro(), zloty(), dec!(4.34)).unwrap();
        assert!(rates.get_rate(&CurrencyCode::new("Euro"), &zloty()).is_err());
        assert_eq!(CurrencyCode::from(String::from("euro")), euro());
    }

    #[test]
    fn test_currency_code_equality() {
        assert_eq!(CurrencyCode::new("euro"), CurrencyCode::from("euro"));
        assert_ne!(euro(), zloty());
    }

    #[test]
    fn test_rate_table_direct() {
        let mut table = RateTable::new();
        table.set_rate(euro(), zloty(), dec!(4.34)).unwrap();
        assert_eq!(table.get_rate(&euro(), &zloty()).unwrap(), dec!(4.34));
    }

    #[test]
    fn test_rate_table_reciprocal() {
        let mut table = RateTable::new();
        table.set_rate(CurrencyCode::new("pound"), zloty(), dec!(5)).unwrap();
        let rate = table
            .get_rate(&zloty(), &CurrencyCode::new("pound"))
            .unwrap();
        assert_eq!(rate, dec!(0.2));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_directional_rate_overrides_reciprocal() {
        let mut table = RateTable::new();
        table.set_rate(euro(), zloty(), dec!(4.34)).unwrap();
        table.set_directional_rate(zloty(), euro(), dec!(0.22)).unwrap();

        assert_eq!(table.get_rate(&zloty(), &euro()).unwrap(), dec!(0.22));
        assert_eq!(table.get_rate(&euro(), &zloty()).unwrap(), dec!(4.34));
    }

    #[test]
    fn test_convert() {
        let mut table = RateTable::new();
        table.set_rate(euro(), zloty(), dec!(4.34)).unwrap();
        let result = table.convert(dec!(10), &euro(), &zloty()).unwrap();
        assert_eq!(result, dec!(43.4));
    }

    #[test]
    fn test_missing_rate() {
        let table = RateTable::new();
        let err = table.convert(dec!(1), &euro(), &zloty()).unwrap_err();
        assert_eq!(
            err,
            FxError::RateNotFound {
                from: euro(),
                to: zloty()
            }
        );
        assert_eq!(err.to_string(), "exchange from euro to zloty is not available");
    }

    #[test]
    fn test_convert_overflow() {
        let mut table = RateTable::new();
        table.set_rate(euro(), zloty(), dec!(4.34)).unwrap();
        let err = table.convert(Decimal::MAX, &euro(), &zloty()).unwrap_err();
        assert!(matches!(err, FxError::Overflow { .. }));
    }

    #[test]
    fn test_same_currency_has_no_implicit_rate() {
        let table = RateTable::new();
        assert!(table.get_rate(&euro(), &euro()).is_err());
    }

    #[test]
    fn test_invalid_rate() {
        let mut table = RateTable::new();
        assert!(table.set_rate(euro(), zloty(), dec!(-0.5)).is_err());
        assert!(table.set_directional_rate(euro(), zloty(), Decimal::ZERO).is_err());
        assert!(table.is_empty());
    }
}
