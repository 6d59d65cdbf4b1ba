//! Decaying bonding curve.
//!
//! The quoted price decays linearly from the last executed price toward the
//! floor and jumps up in proportion to the share of supply a purchase takes.
//! A purchase executes at the midpoint of its own jump.

use crate::error::BondError;
use crate::math::{to_decimal, to_scale, Decimal, SignedDecimal, TokenAmount, SCALE};
use crate::state::BondSale;

/// Result of pricing a purchase against a sale snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeQuote {
    /// Price after time decay, before this purchase's own impact.
    pub base_price: Decimal,
    pub jump: Decimal,
    /// `base_price + jump / 2`; what the buyer pays per token.
    pub execution_price: Decimal,
    /// `base_price + jump`; becomes the sale's `previous_price`.
    pub post_trade_price: Decimal,
    /// Quote tokens owed, `ceil(amount * execution_price)`.
    pub cost: TokenAmount,
}

/// Price decayed by the time elapsed since the last trade, clamped at the floor.
pub fn decayed_price(sale: &BondSale, now: u64) -> Result<Decimal, BondError> {
    let delta_time = Decimal::new(to_scale(now.saturating_sub(sale.last_trade), SCALE)?);
    let sale_duration = Decimal::new(to_scale(
        sale.end_time.saturating_sub(sale.start_time),
        SCALE,
    )?);
    let time_ratio = delta_time.checked_div(sale_duration)?;

    let decay = sale
        .velocity
        .checked_mul(sale.up_bound)?
        .checked_mul(sale.floor_price)?
        .checked_mul(time_ratio)?;

    if sale.previous_price < sale.floor_price.checked_add(decay)? {
        Ok(sale.floor_price)
    } else {
        sale.previous_price.checked_sub(decay)
    }
}

/// Current spot price with no purchase impact.
pub fn current_price(sale: &BondSale, now: u64) -> Result<Decimal, BondError> {
    decayed_price(sale, now)
}

pub fn simulate_trade(
    sale: &BondSale,
    now: u64,
    amount: TokenAmount,
) -> Result<TradeQuote, BondError> {
    let base_price = decayed_price(sale, now)?;
    let supply_ratio = amount.percent(sale.supply)?;
    let jump = supply_ratio
        .checked_mul(sale.up_bound)?
        .checked_mul(sale.floor_price)?;

    let half_jump = to_decimal(5, 1)?.checked_mul(jump)?;
    let execution_price = base_price.checked_add(half_jump)?;
    let post_trade_price = base_price.checked_add(jump)?;
    let cost = amount.mul_ceil(execution_price)?;

    Ok(TradeQuote {
        base_price,
        jump,
        execution_price,
        post_trade_price,
        cost,
    })
}

/// Per-token price a purchase of `amount` executes at.
pub fn execution_price(
    sale: &BondSale,
    now: u64,
    amount: TokenAmount,
) -> Result<Decimal, BondError> {
    Ok(simulate_trade(sale, now, amount)?.execution_price)
}

/// `price * (1 + slippage)`. A negative slippage lowers the ceiling; one
/// that would push the factor below zero is rejected.
pub fn price_after_slippage(price: Decimal, slippage: SignedDecimal) -> Result<Decimal, BondError> {
    let factor = slippage.one_plus().ok_or_else(|| BondError::InvalidSlippage {
        slippage: slippage.to_string(),
    })?;
    price.checked_mul(factor)
}

/// Highest price the curve can report: `(1 + up_bound) * floor_price`.
pub fn ceiling_price(up_bound: Decimal, floor_price: Decimal) -> Result<Decimal, BondError> {
    Decimal::one().checked_add(up_bound)?.checked_mul(floor_price)
}

/// Limit to submit with a buy: the slippage-adjusted execution price, never
/// above the curve's ceiling.
pub fn price_limit(
    sale: &BondSale,
    now: u64,
    amount: TokenAmount,
    slippage: SignedDecimal,
) -> Result<Decimal, BondError> {
    let adjusted = price_after_slippage(execution_price(sale, now, amount)?, slippage)?;
    let ceiling = ceiling_price(sale.up_bound, sale.floor_price)?;
    Ok(adjusted.min(ceiling))
}
