//! Bank configuration: supported currencies, exchange rates and simulated
//! latency.
//!
//! The default configuration is the fixed setup the bank has always run
//! with. A JSON file with the same shape can replace any part of it:
//!
//! ```json
//! {
//!   "known_currencies": ["euro", "zloty"],
//!   "rates": [{ "from": "euro", "to": "zloty", "rate": "4.34" }],
//!   "latency": { "enabled": false }
//! }
//! ```

use crate::core::bank::Bank;
use crate::core::currency::{CurrencyCode, FxError, RateTable};
use crate::simulation::latency::{LatencyConfig, LatencyError, LatencyModel};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad rate: {0}")]
    Rate(#[from] FxError),
    #[error("bad latency: {0}")]
    Latency(#[from] LatencyError),
}

/// One configured exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
    /// Also install `1 / rate` for the reverse direction.
    #[serde(default = "default_reciprocal")]
    pub reciprocal: bool,
}

fn default_reciprocal() -> bool {
    true
}

impl RateEntry {
    pub fn new(from: impl Into<CurrencyCode>, to: impl Into<CurrencyCode>, rate: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate,
            reciprocal: true,
        }
    }

    /// Only the `from -> to` direction.
    pub fn one_way(mut self) -> Self {
        self.reciprocal = false;
        self
    }
}

/// Everything needed to build a [`Bank`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    pub known_currencies: Vec<CurrencyCode>,
    /// Applied in order; a later entry overrides an earlier one for the same pair.
    pub rates: Vec<RateEntry>,
    pub latency: LatencyConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            known_currencies: ["euro", "pound", "zloty", "lira", "dolar", "forint"]
                .into_iter()
                .map(CurrencyCode::new)
                .collect(),
            rates: vec![
                RateEntry::new("euro", "zloty", dec!(4.34)),
                RateEntry::new("dolar", "zloty", dec!(3.98)),
                RateEntry::new("pound", "zloty", dec!(5.18)),
            ],
            latency: LatencyConfig::default(),
        }
    }
}

impl BankConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Same configuration with the simulated delay switched off.
    pub fn without_latency(mut self) -> Self {
        self.latency.enabled = false;
        self
    }

    /// Build the rate table described by `rates`.
    pub fn rate_table(&self) -> Result<RateTable, FxError> {
        let mut table = RateTable::new();
        for entry in &self.rates {
            if entry.reciprocal {
                table.set_rate(entry.from.clone(), entry.to.clone(), entry.rate)?;
            } else {
                table.set_directional_rate(entry.from.clone(), entry.to.clone(), entry.rate)?;
            }
        }
        Ok(table)
    }

    /// Validate the configuration and build an empty bank from it.
    pub fn build(&self) -> Result<Bank, ConfigError> {
        let rates = self.rate_table()?;
        let latency = LatencyModel::from_config(&self.latency)?;
        Ok(Bank::new(self.known_currencies.iter().cloned(), rates).with_latency(latency))
    }
}
