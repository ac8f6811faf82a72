//! Exchange outcomes and concurrent order execution.
//!
//! The exchange itself is [`Bank::exchange`](crate::core::bank::Bank::exchange);
//! this module holds what it returns and how batches of orders are run.

pub mod error;
pub mod pool;
pub mod receipt;
