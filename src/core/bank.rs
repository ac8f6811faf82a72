use crate::core::client::Client;
use crate::core::currency::{CurrencyCode, FxError, RateTable};
use crate::exchange::error::{ensure_non_negative, ExchangeError};
use crate::exchange::receipt::ExchangeReceipt;
use crate::simulation::latency::LatencyModel;
use crate::storage::{self, LoadReport, StorageError};
use log::{info, warn};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use thiserror::Error;

/// A registered client behind its own lock.
///
/// Every balance change happens while holding this lock, so exchanges on
/// the same client are serialized and exchanges on different clients are not.
pub type ClientHandle = Arc<Mutex<Client>>;

/// Position of a client in the bank's registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(usize);

impl ClientId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("no supported currency: can't append {name} with {currencies:?}")]
    UnsupportedCurrencies {
        name: String,
        currencies: Vec<CurrencyCode>,
    },
    #[error("negative balance: can't append {name} with {amount} {currency}")]
    NegativeBalance {
        name: String,
        currency: CurrencyCode,
        amount: Decimal,
    },
}

/// Bank-wide totals per currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoneyCount {
    /// One entry per known currency, zero when nobody holds it.
    pub totals: BTreeMap<CurrencyCode, Decimal>,
    /// Holdings in currencies the bank does not support. Not part of `totals`.
    pub unsupported: BTreeMap<CurrencyCode, Decimal>,
    /// Currencies whose sum exceeded the decimal range. Their entries are
    /// pinned at `Decimal::MAX`.
    #[serde(default)]
    pub overflowed: BTreeSet<CurrencyCode>,
}

impl MoneyCount {
    /// Total held in `currency`, zero if unknown.
    pub fn total(&self, currency: &CurrencyCode) -> Decimal {
        self.totals.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Currencies with a strictly positive total.
    pub fn positive_totals(&self) -> impl Iterator<Item = (&CurrencyCode, Decimal)> {
        self.totals
            .iter()
            .filter(|(_, amount)| **amount > Decimal::ZERO)
            .map(|(currency, amount)| (currency, *amount))
    }
}

impl fmt::Display for MoneyCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total money in bank:")?;
        for (currency, amount) in self.positive_totals() {
            writeln!(f, "{}: {}", currency, amount)?;
        }
        Ok(())
    }
}

/// A bank holding client balances and exchanging between currencies at
/// fixed rates.
///
/// Configuration (known currencies, rates, latency) is owned by the
/// instance; build one directly or through
/// [`BankConfig::build`](crate::config::BankConfig::build).
///
/// # Examples
///
/// ```
/// use bank_exchange::core::bank::Bank;
/// use bank_exchange::core::client::Client;
/// use bank_exchange::core::currency::{CurrencyCode, RateTable};
/// use rust_decimal_macros::dec;
///
/// let euro = CurrencyCode::new("euro");
/// let zloty = CurrencyCode::new("zloty");
///
/// let mut rates = RateTable::new();
/// rates.set_rate(euro.clone(), zloty.clone(), dec!(4.34)).unwrap();
/// let mut bank = Bank::new(vec![euro.clone(), zloty.clone()], rates);
///
/// let id = bank
///     .register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
///     .unwrap();
/// bank.exchange(id, dec!(10), &euro, &zloty).unwrap();
///
/// let client = bank.client(id).unwrap();
/// assert_eq!(client.balance(&euro), Some(dec!(90)));
/// assert_eq!(client.balance(&zloty), Some(dec!(43.4)));
/// ```
#[derive(Debug)]
pub struct Bank {
    clients: Vec<ClientHandle>,
    known_currencies: BTreeSet<CurrencyCode>,
    rates: RateTable,
    latency: LatencyModel,
    aggregate: MoneyCount,
}

impl Bank {
    /// Create a bank with no simulated latency.
    pub fn new(known_currencies: impl IntoIterator<Item = CurrencyCode>, rates: RateTable) -> Self {
        let known_currencies: BTreeSet<CurrencyCode> = known_currencies.into_iter().collect();
        let aggregate = MoneyCount {
            totals: known_currencies
                .iter()
                .map(|c| (c.clone(), Decimal::ZERO))
                .collect(),
            unsupported: BTreeMap::new(),
            overflowed: BTreeSet::new(),
        };
        Self {
            clients: Vec::new(),
            known_currencies,
            rates,
            latency: LatencyModel::none(),
            aggregate,
        }
    }

    pub fn with_latency(mut self, latency: LatencyModel) -> Self {
        self.latency = latency;
        self
    }

    pub fn known_currencies(&self) -> &BTreeSet<CurrencyCode> {
        &self.known_currencies
    }

    pub fn supports(&self, currency: &CurrencyCode) -> bool {
        self.known_currencies.contains(currency)
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    // --- Clients ---

    /// Register a client.
    ///
    /// A client is admitted when every balance is non-negative and at least
    /// one of its currencies is known to the bank. Other currencies it holds
    /// come along unchanged.
    pub fn register_client(&mut self, client: Client) -> Result<ClientId, RegistrationError> {
        if let Some((currency, amount)) = client
            .balances()
            .iter()
            .find(|(_, amount)| **amount < Decimal::ZERO)
        {
            let err = RegistrationError::NegativeBalance {
                name: client.name().to_string(),
                currency: currency.clone(),
                amount: *amount,
            };
            info!("{}", err);
            return Err(err);
        }
        if !client.currencies().any(|c| self.supports(c)) {
            let err = RegistrationError::UnsupportedCurrencies {
                name: client.name().to_string(),
                currencies: client.currencies().cloned().collect(),
            };
            info!("{}", err);
            return Err(err);
        }
        let id = ClientId(self.clients.len());
        self.clients.push(Arc::new(Mutex::new(client)));
        Ok(id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn client_ids(&self) -> impl Iterator<Item = ClientId> {
        (0..self.clients.len()).map(ClientId)
    }

    /// Shared handle to a registered client.
    pub fn handle(&self, id: ClientId) -> Option<&ClientHandle> {
        self.clients.get(id.0)
    }

    /// Snapshot of a client's current state.
    pub fn client(&self, id: ClientId) -> Option<Client> {
        self.handle(id).map(|h| h.lock().clone())
    }

    /// First client registered under `name`.
    pub fn find_client(&self, name: &str) -> Option<ClientId> {
        self.clients
            .iter()
            .position(|h| h.lock().name() == name)
            .map(ClientId)
    }

    /// Snapshot of every client, in registration order.
    pub fn clients(&self) -> Vec<Client> {
        self.clients.iter().map(|h| h.lock().clone()).collect()
    }

    // --- Aggregate ---

    /// Recompute the per-currency totals over all registered clients.
    ///
    /// Holdings in currencies the bank does not support are left out of the
    /// totals and reported separately. A sum past the decimal range stops at
    /// `Decimal::MAX` and the currency is listed in `overflowed`.
    pub fn money_count(&mut self) -> &MoneyCount {
        let mut count = MoneyCount {
            totals: self
                .known_currencies
                .iter()
                .map(|c| (c.clone(), Decimal::ZERO))
                .collect(),
            unsupported: BTreeMap::new(),
            overflowed: BTreeSet::new(),
        };

        for handle in &self.clients {
            let client = handle.lock();
            for (currency, amount) in client.balances() {
                let total = match count.totals.get_mut(currency) {
                    Some(total) => total,
                    None => {
                        warn!("{} holds {} which is not in our bank", client.name(), currency);
                        count
                            .unsupported
                            .entry(currency.clone())
                            .or_insert(Decimal::ZERO)
                    }
                };
                let fits = saturating_accumulate(total, *amount);
                if !fits && count.overflowed.insert(currency.clone()) {
                    warn!("total {} exceeds {}, capped", currency, Decimal::MAX);
                }
            }
        }

        info!("Total money in bank:");
        for (currency, amount) in count.positive_totals() {
            info!("{}: {}", currency, amount);
        }

        self.aggregate = count;
        &self.aggregate
    }

    /// Totals from the last [`money_count`](Self::money_count).
    pub fn aggregate(&self) -> &MoneyCount {
        &self.aggregate
    }

    // --- Exchange ---

    /// Convert an amount at the bank's rate without touching any balance.
    pub fn calculate(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, FxError> {
        self.rates.convert(amount, from, to)
    }

    /// Exchange `amount` of `from` into `to` for a client.
    ///
    /// On success the client is debited `amount` of `from` and credited the
    /// converted amount of `to`, then the call waits out the simulated
    /// processing delay. On failure nothing changes and no delay is applied.
    pub fn exchange(
        &self,
        id: ClientId,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeReceipt, ExchangeError> {
        let started = Instant::now();
        let result = ensure_non_negative(amount).and_then(|amount| {
            let handle = self.handle(id).ok_or_else(|| ExchangeError::unknown_id(id))?;
            let mut client = handle.lock();
            apply_exchange(&mut client, &self.rates, amount, from, to)
        });

        match result {
            Ok(receipt) => {
                thread::sleep(self.latency.sample());
                let receipt = receipt.with_elapsed(started.elapsed());
                info!("{}", receipt);
                Ok(receipt)
            }
            Err(err) => {
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// [`exchange`](Self::exchange) for the first client registered under `name`.
    pub fn exchange_by_name(
        &self,
        name: &str,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ExchangeReceipt, ExchangeError> {
        match self.find_client(name) {
            Some(id) => self.exchange(id, amount, from, to),
            None => {
                let err = ExchangeError::UnknownClient(name.to_string());
                warn!("{}", err);
                Err(err)
            }
        }
    }

    // --- Persistence ---

    pub fn save_clients(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        storage::save_clients(path, &self.clients())
    }

    /// Load clients from a file, admitting each one as if it had been
    /// registered live. A missing file leaves the bank untouched.
    pub fn load_clients(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, StorageError> {
        let loaded = storage::load_clients(path)?;
        let mut report = LoadReport::default();
        for client in loaded {
            match self.register_client(client) {
                Ok(id) => report.admitted.push(id),
                Err(err) => report.rejected.push(err),
            }
        }
        Ok(report)
    }
}

/// Add `amount` to `total`, pinning at the decimal bounds. Returns false
/// when the sum did not fit.
fn saturating_accumulate(total: &mut Decimal, amount: Decimal) -> bool {
    match total.checked_add(amount) {
        Some(sum) => {
            *total = sum;
            true
        }
        None => {
            *total = if amount.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            };
            false
        }
    }
}

fn apply_exchange(
    client: &mut Client,
    rates: &RateTable,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<ExchangeReceipt, ExchangeError> {
    let available = client
        .balance(from)
        .ok_or_else(|| ExchangeError::CurrencyNotHeld {
            client: client.name().to_string(),
            currency: from.clone(),
        })?;
    if available < amount {
        return Err(ExchangeError::InsufficientFunds {
            client: client.name().to_string(),
            currency: from.clone(),
            available,
            requested: amount,
        });
    }

    let rate = rates.get_rate(from, to)?;
    let converted = rates.convert(amount, from, to)?;
    // Both sides must fit before anything is written.
    let credited = client.balance(to).unwrap_or(Decimal::ZERO);
    if credited.checked_add(converted).is_none() {
        return Err(FxError::Overflow {
            from: from.clone(),
            to: to.clone(),
            amount,
        }
        .into());
    }

    client.debit(from, amount);
    client.credit(to, converted);
    Ok(ExchangeReceipt::new(
        client.name(),
        from.clone(),
        to.clone(),
        amount,
        rate,
        converted,
    ))
}
