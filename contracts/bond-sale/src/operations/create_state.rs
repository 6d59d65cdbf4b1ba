use crate::address::{derive_authority, derive_state_address, Address};
use crate::error::BondError;
use crate::msg::{BondInstruction, Plan, Step};

pub fn plan_create_state(program_id: &Address, admin: &Address) -> Result<Plan, BondError> {
    let (state, _) = derive_state_address(program_id)?;
    let (authority, nonce) = derive_authority(program_id)?;

    Ok(Plan::new("bond_sale.create_state")
        .add_step(Step::Invoke(BondInstruction::CreateState { admin: *admin }))
        .add_attribute("admin", admin.to_string())
        .add_attribute("state", state.to_string())
        .add_attribute("authority", authority.to_string())
        .add_attribute("nonce", nonce.to_string()))
}
