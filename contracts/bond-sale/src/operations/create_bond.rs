use crate::address::Address;
use crate::error::BondError;
use crate::math::{Decimal, SignedDecimal, TokenAmount};
use crate::msg::{BondInstruction, Plan, Step};
use crate::pricing::{ceiling_price, price_limit, simulate_trade, TradeQuote};
use crate::state::BondSale;

/// Client-side estimate behind a buy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuyQuote {
    pub trade: TradeQuote,
    pub price_limit: Decimal,
}

/// Checks an order against the last observed snapshot.
pub fn check_amount(sale: &BondSale, amount: TokenAmount) -> Result<(), BondError> {
    if amount.is_zero() {
        return Err(BondError::InvalidSaleParameters {
            reason: "bond amount must be positive".to_string(),
        });
    }
    if amount > sale.remaining_amount {
        return Err(BondError::InsufficientRemainingSupply {
            requested: amount.v,
            remaining: sale.remaining_amount.v,
        });
    }
    Ok(())
}

/// Quotes `amount` at `now` and derives the limit to submit for `slippage`.
///
/// Lowering `up_bound` can leave the curve above its own ceiling; no limit
/// can then be met, so the quote fails instead of producing one.
pub fn quote_buy(
    sale: &BondSale,
    now: u64,
    amount: TokenAmount,
    slippage: SignedDecimal,
) -> Result<BuyQuote, BondError> {
    check_amount(sale, amount)?;
    let trade = simulate_trade(sale, now, amount)?;
    let ceiling = ceiling_price(sale.up_bound, sale.floor_price)?;
    if trade.execution_price > ceiling {
        return Err(BondError::PriceLimitExceeded {
            price: trade.execution_price.to_string(),
            limit: ceiling.to_string(),
        });
    }
    Ok(BuyQuote {
        trade,
        price_limit: price_limit(sale, now, amount, slippage)?,
    })
}

/// Buy with an explicit limit.
pub fn plan_create_bond(
    sale_address: &Address,
    sale: &BondSale,
    buyer: &Address,
    buyer_quote_account: &Address,
    amount: TokenAmount,
    price_limit: Decimal,
) -> Result<Plan, BondError> {
    check_amount(sale, amount)?;

    Ok(Plan::new("bond_sale.create_bond")
        .add_step(Step::Invoke(BondInstruction::CreateBond {
            buyer: *buyer,
            sale: *sale_address,
            buyer_quote_account: *buyer_quote_account,
            amount,
            price_limit,
        }))
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("buyer", buyer.to_string())
        .add_attribute("amount", amount.to_string())
        .add_attribute("price_limit", price_limit.to_string()))
}

/// Buy whose limit is the quoted execution price widened by `slippage`.
pub fn plan_buy(
    sale_address: &Address,
    sale: &BondSale,
    buyer: &Address,
    buyer_quote_account: &Address,
    amount: TokenAmount,
    slippage: SignedDecimal,
    now: u64,
) -> Result<(Plan, BuyQuote), BondError> {
    let quote = quote_buy(sale, now, amount, slippage)?;
    let plan = plan_create_bond(
        sale_address,
        sale,
        buyer,
        buyer_quote_account,
        amount,
        quote.price_limit,
    )?
    .add_attribute("quoted_price", quote.trade.execution_price.to_string())
        .add_attribute("quoted_cost", quote.trade.cost.to_string())
        .add_attribute("slippage", slippage.to_string());
    Ok((plan, quote))
}
