//! In-memory reference ledger and test fixtures.

mod execute;
mod ledger;

pub use ledger::{MockLedger, GENESIS_SECONDS};
