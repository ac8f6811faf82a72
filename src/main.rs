//! bank-exchange CLI
//!
//! Work with a client file from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show bank-wide totals
//! bank-exchange count --clients clients.json
//!
//! # Exchange for one client and save the file back
//! bank-exchange exchange --clients clients.json --name "Jan Nowak" --amount 10 --from euro --to zloty
//!
//! # Run a batch of orders on four workers
//! bank-exchange batch --clients clients.json --orders orders.json --workers 4
//! ```

use bank_exchange::config::BankConfig;
use bank_exchange::core::bank::Bank;
use bank_exchange::core::currency::CurrencyCode;
use bank_exchange::exchange::pool::{ExchangePool, ORDERS_FILE_EXAMPLE};
use bank_exchange::storage::{self, StorageError, DEFAULT_CLIENTS_FILE};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::io::Write;
use std::process;

fn print_usage() {
    eprintln!(
        r#"bank-exchange — multi-currency client bank with fixed-rate exchange

USAGE:
    bank-exchange <COMMAND> [OPTIONS]

COMMANDS:
    count       Print bank-wide totals per currency
    exchange    Exchange an amount for one client
    batch       Run a JSON array of exchange orders concurrently
    rates       Print the configured exchange rates
    help        Show this message

OPTIONS (all commands):
    --config <FILE>     JSON bank configuration (default: built-in)

OPTIONS (count, exchange, batch):
    --clients <FILE>    Client file (default: clients.json)

OPTIONS (exchange):
    --name <NAME>       Client name
    --amount <DEC>      Amount to exchange
    --from <CURRENCY>   Source currency
    --to <CURRENCY>     Target currency

OPTIONS (batch):
    --orders <FILE>     JSON array of {{client, amount, from, to}}
    --workers <N>       Worker threads (default: one per core)

OPTIONS (exchange, batch):
    --no-delay          Skip the simulated processing delay

Set RUST_LOG to change the log level (default: info)."#
    );
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

/// Parse `--key value` pairs and bare `--switch` flags.
fn parse_options(args: &[String], switches: &[&str]) -> HashMap<String, String> {
    let mut options = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        let key = args[i].as_str();
        if !key.starts_with("--") {
            eprintln!("Unexpected argument: {}", key);
            process::exit(1);
        }
        if switches.contains(&key) {
            options.insert(key.to_string(), String::new());
        } else {
            i += 1;
            let value = args.get(i).cloned().unwrap_or_else(|| {
                eprintln!("{} requires a value", key);
                process::exit(1);
            });
            options.insert(key.to_string(), value);
        }
        i += 1;
    }
    options
}

fn required<'a>(options: &'a HashMap<String, String>, key: &str) -> &'a str {
    options.get(key).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Error: {} is required", key);
        process::exit(1);
    })
}

fn load_config(options: &HashMap<String, String>) -> BankConfig {
    let config = match options.get("--config") {
        Some(path) => BankConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }),
        None => BankConfig::default(),
    };
    if options.contains_key("--no-delay") {
        config.without_latency()
    } else {
        config
    }
}

fn build_bank(options: &HashMap<String, String>) -> Bank {
    load_config(options).build().unwrap_or_else(|e| {
        eprintln!("Invalid config: {}", e);
        process::exit(1);
    })
}

fn clients_path(options: &HashMap<String, String>) -> String {
    options
        .get("--clients")
        .cloned()
        .unwrap_or_else(|| DEFAULT_CLIENTS_FILE.to_string())
}

fn load_clients(bank: &mut Bank, path: &str, allow_missing: bool) {
    match bank.load_clients(path) {
        Ok(report) => {
            for rejected in &report.rejected {
                eprintln!("Skipped: {}", rejected);
            }
        }
        Err(StorageError::NotFound(_)) if allow_missing => {}
        Err(e) => {
            eprintln!("Error loading clients: {}", e);
            process::exit(1);
        }
    }
}

fn save_clients(bank: &Bank, path: &str) {
    bank.save_clients(path).unwrap_or_else(|e| {
        eprintln!("Error saving clients: {}", e);
        process::exit(1);
    });
}

fn cmd_count(args: &[String]) {
    let options = parse_options(args, &[]);
    let mut bank = build_bank(&options);
    load_clients(&mut bank, &clients_path(&options), true);

    let count = bank.money_count();
    println!("{}", count);
    for (currency, amount) in &count.unsupported {
        println!("Not supported: {} {}", amount, currency);
    }
    for currency in &count.overflowed {
        println!("Capped: {} total exceeds the decimal range", currency);
    }
}

fn cmd_exchange(args: &[String]) {
    let options = parse_options(args, &["--no-delay"]);
    let name = required(&options, "--name");
    let amount: Decimal = required(&options, "--amount").parse().unwrap_or_else(|e| {
        eprintln!("Invalid amount: {}", e);
        process::exit(1);
    });
    let from = CurrencyCode::new(required(&options, "--from"));
    let to = CurrencyCode::new(required(&options, "--to"));

    let path = clients_path(&options);
    let mut bank = build_bank(&options);
    load_clients(&mut bank, &path, false);

    match bank.exchange_by_name(name, amount, &from, &to) {
        Ok(receipt) => {
            save_clients(&bank, &path);
            if let Some(client) = bank.find_client(name).and_then(|id| bank.client(id)) {
                println!("Updated balance for {}", client);
            }
            println!("Receipt: {}", receipt.id);
        }
        Err(e) => {
            eprintln!("Exchange failed: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_batch(args: &[String]) {
    let options = parse_options(args, &["--no-delay"]);
    let orders_path = required(&options, "--orders");
    let workers: usize = match options.get("--workers") {
        Some(n) => n.parse().unwrap_or_else(|_| {
            eprintln!("--workers requires a number");
            process::exit(1);
        }),
        None => 0,
    };

    let orders = storage::load_orders(orders_path).unwrap_or_else(|e| {
        eprintln!("Error loading orders: {}", e);
        if matches!(e, StorageError::Json { .. }) {
            eprintln!("Expected format:");
            eprintln!("{}", ORDERS_FILE_EXAMPLE);
        }
        process::exit(1);
    });

    let path = clients_path(&options);
    let mut bank = build_bank(&options);
    load_clients(&mut bank, &path, false);

    let pool = ExchangePool::new(workers).unwrap_or_else(|e| {
        eprintln!("Cannot start worker pool: {}", e);
        process::exit(1);
    });
    let results = pool.run(&bank, &orders);

    let mut failures = 0;
    for (order, result) in orders.iter().zip(&results) {
        match result {
            Ok(receipt) => println!("ok     {}", receipt),
            Err(e) => {
                failures += 1;
                println!(
                    "failed {} {} {} -> {}: {}",
                    order.client, order.amount, order.from, order.to, e
                );
            }
        }
    }
    save_clients(&bank, &path);

    println!("\n{} succeeded, {} failed", results.len() - failures, failures);
    for client in bank.clients() {
        println!("Updated balance for {}", client);
    }
}

fn cmd_rates(args: &[String]) {
    let options = parse_options(args, &[]);
    let bank = build_bank(&options);
    print!("{}", bank.rates());
    let known: Vec<&str> = bank.known_currencies().iter().map(|c| c.as_str()).collect();
    println!("Supported currencies: {}", known.join(", "));
}

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "count" => cmd_count(rest),
        "exchange" => cmd_exchange(rest),
        "batch" => cmd_batch(rest),
        "rates" => cmd_rates(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
