pub mod alert;
pub mod quote;

pub use alert::{normalize_symbol, Alert, OwnerId};
pub use quote::{Quote, StockInfo};
