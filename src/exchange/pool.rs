//! Concurrent execution of exchange orders.

use crate::core::bank::Bank;
use crate::core::currency::CurrencyCode;
use crate::exchange::error::ExchangeError;
use crate::exchange::receipt::ExchangeReceipt;
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orders file layout shown to users of the `batch` command.
pub const ORDERS_FILE_EXAMPLE: &str = r#"[
  { "client": "Jan Nowak", "amount": "10", "from": "euro", "to": "zloty" }
]"#;

/// A request to exchange on behalf of a named client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeOrder {
    pub client: String,
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl ExchangeOrder {
    pub fn new(
        client: impl Into<String>,
        amount: Decimal,
        from: impl Into<CurrencyCode>,
        to: impl Into<CurrencyCode>,
    ) -> Self {
        Self {
            client: client.into(),
            amount,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Fixed-size worker pool that runs exchange orders against a shared bank.
///
/// Orders touching the same client serialize on that client's lock; their
/// relative order is whatever the scheduler picks. Results always come back
/// in submission order.
pub struct ExchangePool {
    pool: ThreadPool,
}

impl ExchangePool {
    /// `workers == 0` lets rayon pick one thread per core.
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("exchange-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every order, one result per order.
    pub fn run(
        &self,
        bank: &Bank,
        orders: &[ExchangeOrder],
    ) -> Vec<Result<ExchangeReceipt, ExchangeError>> {
        debug!(
            "running {} exchange orders on {} workers",
            orders.len(),
            self.workers()
        );
        self.pool.install(|| {
            orders
                .par_iter()
                // One order per task.
                .with_max_len(1)
                .map(|order| {
                    bank.exchange_by_name(&order.client, order.amount, &order.from, &order.to)
                })
                .collect()
        })
    }
}
