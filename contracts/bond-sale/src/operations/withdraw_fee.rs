use crate::address::Address;
use crate::error::BondError;
use crate::msg::{BondInstruction, Plan, Step};
use crate::operations::TokenDestination;
use crate::state::BondSale;

pub fn plan_withdraw_fee(
    sale_address: &Address,
    sale: &BondSale,
    admin: &Address,
    destination: &TokenDestination,
) -> Result<Plan, BondError> {
    destination.expect_mint(&sale.token_quote)?;

    Ok(Plan::new("bond_sale.withdraw_fee")
        .add_steps(destination.setup_step())
        .add_step(Step::Invoke(BondInstruction::WithdrawFee {
            admin: *admin,
            sale: *sale_address,
            destination: destination.address,
        }))
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("estimated_amount", sale.fee_amount.to_string()))
}
