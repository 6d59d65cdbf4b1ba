use crate::address::Address;
use crate::error::BondError;
use crate::msg::{BondInstruction, Plan, Step};
use crate::operations::TokenDestination;
use crate::state::BondSale;

/// Where `end_bond_sale` pays out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndSaleDestinations {
    /// Unsold bond tokens, to the creator.
    pub bond: TokenDestination,
    /// Quote proceeds, to the creator.
    pub quote: TokenDestination,
    /// Accrued fees, to the admin.
    pub fee: TokenDestination,
}

/// Payout accounts chosen by the caller; `None` means the payee's
/// canonical account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndSaleAccounts {
    pub bond: Option<Address>,
    pub quote: Option<Address>,
    pub fee: Option<Address>,
}

pub fn plan_end_bond_sale(
    sale_address: &Address,
    sale: &BondSale,
    creator: &Address,
    destinations: &EndSaleDestinations,
) -> Result<Plan, BondError> {
    destinations.bond.expect_mint(&sale.token_bond)?;
    destinations.quote.expect_mint(&sale.token_quote)?;
    destinations.fee.expect_mint(&sale.token_quote)?;

    let mut setup: Vec<Step> = vec![];
    for destination in [&destinations.bond, &destinations.quote, &destinations.fee] {
        if let Some(step) = destination.setup_step() {
            if !setup.contains(&step) {
                setup.push(step);
            }
        }
    }

    Ok(Plan::new("bond_sale.end_bond_sale")
        .add_steps(setup)
        .add_step(Step::Invoke(BondInstruction::EndBondSale {
            creator: *creator,
            sale: *sale_address,
            bond_destination: destinations.bond.address,
            quote_destination: destinations.quote.address,
            fee_destination: destinations.fee.address,
        }))
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("unsold", sale.remaining_amount.to_string())
        .add_attribute("quote_amount", sale.quote_amount.to_string())
        .add_attribute("fee_amount", sale.fee_amount.to_string()))
}
