pub mod alert_store;
pub mod memory_store;
pub mod mongo_store;

pub mod quote_source;
pub mod vietstock;
pub mod batch_fetcher;

pub mod notifier;
pub mod telegram;

pub mod session_gate;
pub mod alert_monitor;
pub mod alerts_service;
