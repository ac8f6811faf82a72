use crate::core::currency::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A bank client: a name and an amount held per currency.
///
/// The serialized form is the client file record:
/// `{"name": "...", "balance": {"euro": "100"}}`.
///
/// # Examples
///
/// ```
/// use bank_exchange::core::client::Client;
/// use bank_exchange::core::currency::CurrencyCode;
/// use rust_decimal_macros::dec;
///
/// let client = Client::new("Jan Nowak").with_balance("euro", dec!(100));
/// assert_eq!(client.balance(&CurrencyCode::new("euro")), Some(dec!(100)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    name: String,
    balance: BTreeMap<CurrencyCode, Decimal>,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: BTreeMap::new(),
        }
    }

    /// Set the amount held in `currency`. Negative amounts are refused when
    /// the client is registered with a bank.
    pub fn with_balance(mut self, currency: impl Into<CurrencyCode>, amount: Decimal) -> Self {
        self.balance.insert(currency.into(), amount);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Amount held in `currency`, or `None` if the client never held it.
    pub fn balance(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.balance.get(currency).copied()
    }

    pub fn balances(&self) -> &BTreeMap<CurrencyCode, Decimal> {
        &self.balance
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.balance.keys()
    }

    // Callers check funds first; these never validate.
    pub(crate) fn debit(&mut self, currency: &CurrencyCode, amount: Decimal) {
        *self.balance.entry(currency.clone()).or_insert(Decimal::ZERO) -= amount;
    }

    pub(crate) fn credit(&mut self, currency: &CurrencyCode, amount: Decimal) {
        *self.balance.entry(currency.clone()).or_insert(Decimal::ZERO) += amount;
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {{", self.name)?;
        for (i, (currency, amount)) in self.balance.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", currency, amount)?;
        }
        write!(f, "}}")
    }
}
