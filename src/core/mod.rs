pub mod bank;
pub mod client;
pub mod currency;
