pub mod address;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod math;
pub mod msg;
pub mod operations;
pub mod pricing;
pub mod query;
pub mod retry;
pub mod state;
pub mod vesting;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
#[cfg(test)]
mod tests;

pub use crate::client::TradeProtocolClient;
pub use crate::error::BondError;
