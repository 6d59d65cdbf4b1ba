use crate::address::Address;
use crate::error::BondError;
use crate::msg::{BondInstruction, Plan, Step};
use crate::operations::TokenDestination;
use crate::state::BondSale;

pub fn plan_claim_quote(
    sale_address: &Address,
    sale: &BondSale,
    creator: &Address,
    destination: &TokenDestination,
) -> Result<Plan, BondError> {
    destination.expect_mint(&sale.token_quote)?;

    Ok(Plan::new("bond_sale.claim_quote")
        .add_steps(destination.setup_step())
        .add_step(Step::Invoke(BondInstruction::ClaimQuote {
            creator: *creator,
            sale: *sale_address,
            destination: destination.address,
        }))
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("estimated_amount", sale.quote_amount.to_string()))
}
