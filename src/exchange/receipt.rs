use crate::core::currency::CurrencyCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Record of a completed exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeReceipt {
    /// Unique identifier for this exchange.
    pub id: Uuid,
    /// Name of the client whose balance changed.
    pub client: String,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Amount debited from `from`.
    pub amount: Decimal,
    /// Rate applied.
    pub rate: Decimal,
    /// Amount credited to `to`.
    pub converted: Decimal,
    /// When the balances were updated.
    pub executed_at: DateTime<Utc>,
    /// Wall-clock time from request to completion, simulated delay included.
    pub elapsed: Duration,
}

impl ExchangeReceipt {
    pub(crate) fn new(
        client: impl Into<String>,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
        rate: Decimal,
        converted: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client: client.into(),
            from,
            to,
            amount,
            rate,
            converted,
            executed_at: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

impl fmt::Display for ExchangeReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Exchanged {} {} to {:.2} {}. Transaction took {:.2} s",
            self.client,
            self.amount,
            self.from,
            self.converted,
            self.to,
            self.elapsed.as_secs_f64()
        )
    }
}
