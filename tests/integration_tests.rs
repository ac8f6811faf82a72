use bank_exchange::config::BankConfig;
use bank_exchange::core::bank::{Bank, RegistrationError};
use bank_exchange::core::client::Client;
use bank_exchange::core::currency::CurrencyCode;
use bank_exchange::exchange::error::ExchangeError;
use bank_exchange::exchange::pool::{ExchangeOrder, ExchangePool, ORDERS_FILE_EXAMPLE};
use bank_exchange::storage::{self, StorageError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use std::sync::Arc;
use std::thread;

fn c(code: &str) -> CurrencyCode {
    CurrencyCode::new(code)
}

fn default_bank() -> Bank {
    BankConfig::default().without_latency().build().unwrap()
}

/// The classic session: register, count, exchange, count again.
#[test]
fn full_session_with_default_rates() {
    let mut bank = default_bank();

    let jan = bank
        .register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
        .unwrap();
    let zbigniew = bank
        .register_client(Client::new("Zbigniew Kropka").with_balance("zloty", dec!(150)))
        .unwrap();
    assert!(bank
        .register_client(Client::new("Daniel Krabus").with_balance("hrywna", dec!(150)))
        .is_err());
    assert_eq!(bank.client_count(), 2);

    let count = bank.money_count();
    assert_eq!(count.total(&c("euro")), dec!(100));
    assert_eq!(count.total(&c("zloty")), dec!(150));

    bank.exchange(jan, dec!(10), &c("euro"), &c("zloty")).unwrap();
    let jan_now = bank.client(jan).unwrap();
    assert_eq!(jan_now.balance(&c("euro")), Some(dec!(90)));
    assert_eq!(jan_now.balance(&c("zloty")), Some(dec!(43.4)));

    bank.exchange(zbigniew, dec!(50), &c("zloty"), &c("pound"))
        .unwrap();
    let zbigniew_now = bank.client(zbigniew).unwrap();
    assert_eq!(zbigniew_now.balance(&c("zloty")), Some(dec!(100)));
    let pound = zbigniew_now.balance(&c("pound")).unwrap();
    assert_eq!(pound.round_dp(3), dec!(9.653));

    let count = bank.money_count();
    assert_eq!(count.total(&c("euro")), dec!(90));
    assert_eq!(count.total(&c("zloty")), dec!(143.4));
}

/// Failed exchanges report why and leave every balance alone.
#[test]
fn failures_are_explicit_and_harmless() {
    let mut bank = default_bank();
    let id = bank
        .register_client(
            Client::new("Jan Kran")
                .with_balance("pound", dec!(1))
                .with_balance("euro", dec!(3)),
        )
        .unwrap();
    let before = bank.client(id).unwrap();

    let cases = [
        (dec!(-1), "pound", "zloty"),
        (dec!(2), "pound", "zloty"),
        (dec!(1), "dolar", "zloty"),
        (dec!(1), "euro", "pound"),
    ];
    let errors: Vec<ExchangeError> = cases
        .iter()
        .map(|(amount, from, to)| {
            bank.exchange(id, *amount, &c(from), &c(to))
                .unwrap_err()
        })
        .collect();

    assert!(matches!(errors[0], ExchangeError::NegativeAmount(_)));
    assert!(matches!(errors[1], ExchangeError::InsufficientFunds { .. }));
    assert!(matches!(errors[2], ExchangeError::CurrencyNotHeld { .. }));
    assert!(matches!(errors[3], ExchangeError::NoRate(_)));
    assert_eq!(bank.client(id).unwrap(), before);
}

/// Saving and loading reproduces the same clients.
#[test]
fn persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clients.json");

    let mut bank = default_bank();
    let jan = bank
        .register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
        .unwrap();
    bank.register_client(
        Client::new("Mixed")
            .with_balance("zloty", dec!(12.5))
            .with_balance("hrywna", dec!(3)),
    )
    .unwrap();
    bank.exchange(jan, dec!(10), &c("euro"), &c("zloty")).unwrap();
    bank.save_clients(&path).unwrap();

    let mut restored = default_bank();
    let report = restored.load_clients(&path).unwrap();
    assert_eq!(report.admitted.len(), 2);
    assert!(report.rejected.is_empty());
    assert_eq!(restored.clients(), bank.clients());
}

/// Loading applies the same admission check as live registration.
#[test]
fn load_filters_unsupported_clients() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clients.json");
    fs::write(
        &path,
        r#"[
            {"name": "Jan Nowak", "balance": {"euro": 100}},
            {"name": "Daniel Krabus", "balance": {"hrywna": 150}},
            {"name": "Jan Kran", "balance": {"pound": "1"}}
        ]"#,
    )
    .unwrap();

    let mut bank = default_bank();
    let report = bank.load_clients(&path).unwrap();
    assert_eq!(report.admitted.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(bank.find_client("Daniel Krabus"), None);
    assert!(bank.find_client("Jan Kran").is_some());
}

/// Negative balances in a file are turned away like any other bad record.
#[test]
fn load_rejects_negative_balances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clients.json");
    fs::write(
        &path,
        r#"[
            {"name": "N", "balance": {"euro": "-50"}},
            {"name": "Jan Nowak", "balance": {"euro": 100}}
        ]"#,
    )
    .unwrap();

    let mut bank = default_bank();
    let report = bank.load_clients(&path).unwrap();
    assert_eq!(report.admitted.len(), 1);
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        report.rejected[0],
        RegistrationError::NegativeBalance { .. }
    ));
    assert_eq!(bank.find_client("N"), None);
    assert_eq!(bank.money_count().total(&c("euro")), dec!(100));
}

/// An orders file in the documented layout runs through the pool.
#[test]
fn batch_orders_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.json");
    fs::write(&path, ORDERS_FILE_EXAMPLE).unwrap();

    let mut bank = default_bank();
    bank.register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
        .unwrap();

    let orders = storage::load_orders(&path).unwrap();
    let results = ExchangePool::new(2).unwrap().run(&bank, &orders);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().converted, dec!(43.4));

    let jan = bank.client(bank.find_client("Jan Nowak").unwrap()).unwrap();
    assert_eq!(jan.balance(&c("euro")), Some(dec!(90)));
}

/// A missing file is reported and leaves registered clients in place.
#[test]
fn load_missing_file_keeps_clients() {
    let dir = tempfile::tempdir().unwrap();
    let mut bank = default_bank();
    bank.register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
        .unwrap();

    let err = bank.load_clients(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    assert_eq!(bank.client_count(), 1);
}

/// Many threads hammering one client never take it below zero.
#[test]
fn concurrent_exchanges_on_one_client() {
    let mut bank = default_bank();
    let id = bank
        .register_client(Client::new("Shared").with_balance("euro", dec!(1000)))
        .unwrap();
    let bank = Arc::new(bank);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bank = Arc::clone(&bank);
            thread::spawn(move || {
                (0..25)
                    .filter(|_| {
                        bank.exchange(id, dec!(10), &c("euro"), &c("zloty"))
                            .is_ok()
                    })
                    .count()
            })
        })
        .collect();
    let succeeded: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(succeeded, 100);
    let client = bank.client(id).unwrap();
    assert_eq!(client.balance(&c("euro")), Some(Decimal::ZERO));
    assert_eq!(client.balance(&c("zloty")), Some(dec!(4340)));
}

/// The worker pool and direct calls agree.
#[test]
fn pool_matches_sequential_exchanges() {
    let clients = vec![
        Client::new("A").with_balance("euro", dec!(100)),
        Client::new("B").with_balance("zloty", dec!(150)),
        Client::new("C").with_balance("pound", dec!(1)),
    ];
    let orders = vec![
        ExchangeOrder::new("A", dec!(10), "euro", "zloty"),
        ExchangeOrder::new("B", dec!(50), "zloty", "pound"),
        ExchangeOrder::new("C", dec!(1), "pound", "zloty"),
    ];

    let mut sequential = default_bank();
    let mut pooled = default_bank();
    for client in &clients {
        sequential.register_client(client.clone()).unwrap();
        pooled.register_client(client.clone()).unwrap();
    }

    for order in &orders {
        sequential
            .exchange_by_name(&order.client, order.amount, &order.from, &order.to)
            .unwrap();
    }
    let results = ExchangePool::new(2).unwrap().run(&pooled, &orders);
    assert!(results.iter().all(|r| r.is_ok()));

    assert_eq!(pooled.clients(), sequential.clients());
}

/// Receipts serialize for reporting.
#[test]
fn receipt_serializes() {
    let mut bank = default_bank();
    let id = bank
        .register_client(Client::new("Jan Nowak").with_balance("euro", dec!(100)))
        .unwrap();
    let receipt = bank.exchange(id, dec!(10), &c("euro"), &c("zloty")).unwrap();

    let json: serde_json::Value = serde_json::to_value(&receipt).unwrap();
    assert_eq!(json["client"], "Jan Nowak");
    assert_eq!(json["from"], "euro");
    assert_eq!(json["to"], "zloty");
    assert!(json.get("id").is_some());
    assert!(json.get("executed_at").is_some());
}
