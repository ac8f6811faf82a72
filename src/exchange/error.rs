use crate::core::bank::ClientId;
use crate::core::currency::{CurrencyCode, FxError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Why an exchange did not happen. No variant is ever returned after a
/// balance was changed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    #[error("exchange amount must not be negative, got {0}")]
    NegativeAmount(Decimal),

    #[error("no client registered as {0}")]
    UnknownClient(String),

    #[error("{client} holds no {currency}")]
    CurrencyNotHeld {
        client: String,
        currency: CurrencyCode,
    },

    #[error("insufficient funds: {client} has {available} {currency}, needs {requested}")]
    InsufficientFunds {
        client: String,
        currency: CurrencyCode,
        available: Decimal,
        requested: Decimal,
    },

    #[error(transparent)]
    NoRate(#[from] FxError),
}

impl ExchangeError {
    pub(crate) fn unknown_id(id: ClientId) -> Self {
        Self::UnknownClient(id.to_string())
    }
}

/// Rejects negative amounts before anything else runs.
pub fn ensure_non_negative(amount: Decimal) -> Result<Decimal, ExchangeError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ExchangeError::NegativeAmount(amount));
    }
    Ok(amount)
}
