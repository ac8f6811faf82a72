//! # bank-exchange
//!
//! A small multi-currency bank: clients hold balances in several
//! currencies and exchange between them at fixed rates.
//!
//! ## Architecture
//!
//! - **core** — Currencies and rate tables, clients, the bank itself
//! - **exchange** — Exchange errors, receipts and the concurrent order pool
//! - **simulation** — Simulated processing latency
//! - **storage** — JSON client files
//! - **config** — Bank configuration and its defaults

pub mod config;
pub mod core;
pub mod exchange;
pub mod simulation;
pub mod storage;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{BankConfig, RateEntry};
    pub use crate::core::bank::{Bank, ClientId, MoneyCount, RegistrationError};
    pub use crate::core::client::Client;
    pub use crate::core::currency::{CurrencyCode, FxError, RateTable};
    pub use crate::exchange::error::ExchangeError;
    pub use crate::exchange::pool::{ExchangeOrder, ExchangePool};
    pub use crate::exchange::receipt::ExchangeReceipt;
    pub use crate::storage::{LoadReport, StorageError};
}
