use crate::address::Address;
use crate::error::BondError;
use crate::msg::{BondInstruction, Plan, Step};
use crate::operations::TokenDestination;
use crate::state::{Bond, BondSale};
use crate::vesting::claimable_amount;

pub fn plan_claim_bond(
    sale_address: &Address,
    sale: &BondSale,
    bond_address: &Address,
    bond: &Bond,
    destination: &TokenDestination,
    now: u64,
) -> Result<Plan, BondError> {
    if bond.sale != *sale_address {
        return Err(BondError::InvalidSaleParameters {
            reason: format!("bond {bond_address} belongs to sale {}", bond.sale),
        });
    }
    destination.expect_mint(&sale.token_bond)?;

    let claimable = claimable_amount(bond, now)?;
    if claimable.is_zero() {
        return Err(BondError::NothingToClaim { id: bond.id });
    }

    Ok(Plan::new("bond_sale.claim_bond")
        .add_steps(destination.setup_step())
        .add_step(Step::Invoke(BondInstruction::ClaimBond {
            owner: bond.owner,
            sale: *sale_address,
            bond: *bond_address,
            destination: destination.address,
        }))
        .add_attribute("bond", bond_address.to_string())
        .add_attribute("bond_id", bond.id.to_string())
        .add_attribute("estimated_amount", claimable.to_string()))
}
