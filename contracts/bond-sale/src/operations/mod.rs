//! Per-action planners. Each turns a state snapshot and the caller's
//! parameters into the ordered steps of one atomic transaction.

pub mod change_params;
pub mod claim_bond;
pub mod claim_quote;
pub mod create_bond;
pub mod create_state;
pub mod end_bond_sale;
pub mod init_bond_sale;
pub mod withdraw_fee;

use crate::address::Address;
use crate::error::BondError;
use crate::msg::Step;

/// Token account a payout lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenDestination {
    pub address: Address,
    pub owner: Address,
    pub mint: Address,
    /// Canonical account not yet on the ledger; created ahead of the payout.
    pub missing: bool,
}

impl TokenDestination {
    pub fn setup_step(&self) -> Option<Step> {
        self.missing.then_some(Step::CreateTokenAccount {
            owner: self.owner,
            mint: self.mint,
        })
    }

    pub(crate) fn expect_mint(&self, mint: &Address) -> Result<(), BondError> {
        if self.mint != *mint {
            return Err(BondError::InvalidTokenAccount {
                account: self.address.to_string(),
                expected: mint.to_string(),
            });
        }
        Ok(())
    }
}
