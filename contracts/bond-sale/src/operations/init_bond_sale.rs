use cosmwasm_std::Binary;

use crate::address::{derive_sale_address, derive_vault_address, Address, MAX_SEED_LEN};
use crate::error::BondError;
use crate::math::{Decimal, TokenAmount};
use crate::msg::{BondInstruction, Plan, Step};
use crate::state::SaleState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitBondSaleParams {
    pub token_bond: Address,
    pub token_quote: Address,
    pub floor_price: Decimal,
    pub up_bound: Decimal,
    pub velocity: Decimal,
    pub supply: TokenAmount,
    pub duration: u64,
    pub vesting_time: u64,
    pub bond_vault_seed: Vec<u8>,
    pub quote_vault_seed: Vec<u8>,
}

impl InitBondSaleParams {
    pub fn validate(&self) -> Result<(), BondError> {
        let invalid = |reason: &str| {
            Err(BondError::InvalidSaleParameters {
                reason: reason.to_string(),
            })
        };
        if self.floor_price.is_zero() {
            return invalid("floor price must be positive");
        }
        if self.supply.is_zero() {
            return invalid("supply must be positive");
        }
        if self.duration == 0 {
            return invalid("duration must be positive");
        }
        if self.token_bond == self.token_quote {
            return invalid("bond and quote tokens must differ");
        }
        if self.bond_vault_seed == self.quote_vault_seed {
            return invalid("vault seeds must differ");
        }
        for seed in [&self.bond_vault_seed, &self.quote_vault_seed] {
            if seed.is_empty() || seed.len() > MAX_SEED_LEN {
                return Err(BondError::InvalidSeed {
                    reason: format!("vault seed must be 1 to {MAX_SEED_LEN} bytes"),
                });
            }
        }
        Ok(())
    }
}

/// The sale lands at the address of `state.next_sale_id` unless another
/// sale is created first; the receipt reports where it actually went.
pub fn plan_init_bond_sale(
    program_id: &Address,
    state: &SaleState,
    creator: &Address,
    creator_bond_account: &Address,
    params: &InitBondSaleParams,
) -> Result<Plan, BondError> {
    params.validate()?;
    let (expected_sale, _) = derive_sale_address(program_id, state.next_sale_id)?;
    let (bond_vault, _) =
        derive_vault_address(program_id, &expected_sale, &params.bond_vault_seed)?;

    Ok(Plan::new("bond_sale.init_bond_sale")
        .add_step(Step::Invoke(BondInstruction::InitBondSale {
            creator: *creator,
            token_bond: params.token_bond,
            token_quote: params.token_quote,
            floor_price: params.floor_price,
            up_bound: params.up_bound,
            velocity: params.velocity,
            supply: params.supply,
            duration: params.duration,
            vesting_time: params.vesting_time,
            bond_vault_seed: Binary::from(params.bond_vault_seed.clone()),
            quote_vault_seed: Binary::from(params.quote_vault_seed.clone()),
            creator_bond_account: *creator_bond_account,
        }))
        .add_attribute("creator", creator.to_string())
        .add_attribute("expected_sale_id", state.next_sale_id.to_string())
        .add_attribute("expected_sale", expected_sale.to_string())
        .add_attribute("expected_bond_vault", bond_vault.to_string())
        .add_attribute("floor_price", params.floor_price.to_string())
        .add_attribute("supply", params.supply.to_string()))
}
