//! Parameter changes on a live sale. The fee is the admin's; velocity and
//! up bound belong to the creator.

use crate::address::Address;
use crate::error::BondError;
use crate::math::Decimal;
use crate::msg::{BondInstruction, Plan, Step};

/// A fee rate is a fraction of the quote paid.
pub fn check_fee(fee: Decimal) -> Result<(), BondError> {
    if fee > Decimal::one() {
        return Err(BondError::InvalidSaleParameters {
            reason: format!("fee {fee} exceeds 1"),
        });
    }
    Ok(())
}

pub fn plan_change_fee(sale: &Address, admin: &Address, fee: Decimal) -> Result<Plan, BondError> {
    check_fee(fee)?;
    Ok(Plan::new("bond_sale.change_fee")
        .add_step(Step::Invoke(BondInstruction::ChangeFee {
            admin: *admin,
            sale: *sale,
            fee,
        }))
        .add_attribute("sale", sale.to_string())
        .add_attribute("fee", fee.to_string()))
}

pub fn plan_change_velocity(
    sale: &Address,
    creator: &Address,
    velocity: Decimal,
) -> Result<Plan, BondError> {
    Ok(Plan::new("bond_sale.change_velocity")
        .add_step(Step::Invoke(BondInstruction::ChangeVelocity {
            creator: *creator,
            sale: *sale,
            velocity,
        }))
        .add_attribute("sale", sale.to_string())
        .add_attribute("velocity", velocity.to_string()))
}

pub fn plan_change_up_bound(
    sale: &Address,
    creator: &Address,
    up_bound: Decimal,
) -> Result<Plan, BondError> {
    Ok(Plan::new("bond_sale.change_up_bound")
        .add_step(Step::Invoke(BondInstruction::ChangeUpBound {
            creator: *creator,
            sale: *sale,
            up_bound,
        }))
        .add_attribute("sale", sale.to_string())
        .add_attribute("up_bound", up_bound.to_string()))
}
