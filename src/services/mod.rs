pub mod alpha_vantage;
pub mod coingecko;
pub mod market_data;

pub mod db_init;
pub mod memory_store;
pub mod mongo_store;
pub mod store;

pub mod notifier;
pub mod formatting;
pub mod conversation;
pub mod sessions;

pub mod scheduler;
pub mod alert_monitor;
pub mod digest_service;
pub mod engine;
