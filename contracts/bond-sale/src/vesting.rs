//! Linear vesting of purchased bonds.

use crate::error::BondError;
use crate::math::{to_scale, Decimal, TokenAmount, SCALE};
use crate::state::Bond;

/// Claims never count time past the end of vesting.
pub fn effective_now(bond: &Bond, now: u64) -> u64 {
    now.min(bond.vesting_end)
}

/// Amount releasable at `now`.
///
/// `bond_amount` is what is still unclaimed, so the release is measured
/// from `last_claim` over what is left of the vesting window. Before the
/// first claim this is `bond_amount * (now - start) / (end - start)`, and
/// at `vesting_end` the whole remainder is released.
pub fn claimable_amount(bond: &Bond, now: u64) -> Result<TokenAmount, BondError> {
    let effective = effective_now(bond, now);
    let elapsed = effective.saturating_sub(bond.last_claim);
    let window = bond.vesting_end.saturating_sub(bond.last_claim);

    // zero-length vesting or a claim already made at the end
    if window == 0 {
        return Ok(bond.bond_amount);
    }

    let fraction = Decimal::new(to_scale(elapsed, SCALE)?)
        .checked_div(Decimal::new(to_scale(window, SCALE)?))?;
    bond.bond_amount.mul_floor(fraction)
}

/// Whether anything is left to release after `now`.
pub fn fully_vested(bond: &Bond, now: u64) -> bool {
    now >= bond.vesting_end
}
