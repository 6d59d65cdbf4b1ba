//! Program semantics of the reference ledger, one handler per instruction.

use cosmwasm_std::{Binary, Response};

use crate::address::{
    derive_authority, derive_bond_address, derive_sale_address, derive_state_address,
    derive_vault_address, Address,
};
use crate::error::BondError;
use crate::math::{to_decimal, Decimal, TokenAmount};
use crate::msg::{BondInstruction, Step};
use crate::operations::change_params::check_fee;
use crate::operations::create_bond::check_amount;
use crate::pricing::simulate_trade;
use crate::state::{Bond, BondSale, SaleState};
use crate::testing::ledger::MockLedger;
use crate::vesting::{claimable_amount, effective_now};

fn require_signer(signers: &[Address], who: &Address) -> Result<(), BondError> {
    if signers.contains(who) {
        Ok(())
    } else {
        Err(BondError::Unauthorized)
    }
}

fn require(who: &Address, expected: &Address) -> Result<(), BondError> {
    if who == expected {
        Ok(())
    } else {
        Err(BondError::Unauthorized)
    }
}

pub(crate) fn apply_step(
    ledger: &mut MockLedger,
    signers: &[Address],
    step: &Step,
) -> Result<Response, BondError> {
    match step {
        Step::CreateTokenAccount { owner, mint } => {
            execute_create_token_account(ledger, owner, mint)
        }
        Step::Invoke(instruction) => {
            require_signer(signers, instruction.authority())?;
            execute(ledger, instruction.clone())
        }
    }
}

fn execute(ledger: &mut MockLedger, instruction: BondInstruction) -> Result<Response, BondError> {
    match instruction {
        BondInstruction::CreateState { admin } => execute_create_state(ledger, admin),
        BondInstruction::InitBondSale {
            creator,
            token_bond,
            token_quote,
            floor_price,
            up_bound,
            velocity,
            supply,
            duration,
            vesting_time,
            bond_vault_seed,
            quote_vault_seed,
            creator_bond_account,
        } => execute_init_bond_sale(
            ledger,
            SaleTerms {
                creator,
                token_bond,
                token_quote,
                floor_price,
                up_bound,
                velocity,
                supply,
                duration,
                vesting_time,
            },
            bond_vault_seed,
            quote_vault_seed,
            creator_bond_account,
        ),
        BondInstruction::CreateBond {
            buyer,
            sale,
            buyer_quote_account,
            amount,
            price_limit,
        } => execute_create_bond(ledger, buyer, sale, buyer_quote_account, amount, price_limit),
        BondInstruction::ClaimBond {
            owner,
            sale,
            bond,
            destination,
        } => execute_claim_bond(ledger, owner, sale, bond, destination),
        BondInstruction::ClaimQuote {
            creator,
            sale,
            destination,
        } => execute_claim_quote(ledger, creator, sale, destination),
        BondInstruction::EndBondSale {
            creator,
            sale,
            bond_destination,
            quote_destination,
            fee_destination,
        } => execute_end_bond_sale(
            ledger,
            creator,
            sale,
            bond_destination,
            quote_destination,
            fee_destination,
        ),
        BondInstruction::ChangeFee { admin, sale, fee } => {
            execute_change_fee(ledger, admin, sale, fee)
        }
        BondInstruction::ChangeVelocity {
            creator,
            sale,
            velocity,
        } => execute_change_velocity(ledger, creator, sale, velocity),
        BondInstruction::ChangeUpBound {
            creator,
            sale,
            up_bound,
        } => execute_change_up_bound(ledger, creator, sale, up_bound),
        BondInstruction::WithdrawFee {
            admin,
            sale,
            destination,
        } => execute_withdraw_fee(ledger, admin, sale, destination),
    }
}

/// Opens the canonical account, or does nothing if it already exists.
fn execute_create_token_account(
    ledger: &mut MockLedger,
    owner: &Address,
    mint: &Address,
) -> Result<Response, BondError> {
    let address = ledger.canonical_token_account(owner, mint)?;
    match ledger.token_account(&address) {
        Ok(_) => {
            ledger.expect_token_account(&address, mint, Some(owner))?;
        }
        Err(BondError::AccountNotFound { .. }) => {
            ledger.create_token_account(&address, owner, mint)?
        }
        Err(err) => return Err(err),
    }
    Ok(Response::new()
        .add_attribute("action", "token.create_account")
        .add_attribute("account", address.to_string()))
}

fn execute_create_state(ledger: &mut MockLedger, admin: Address) -> Result<Response, BondError> {
    let program_id = ledger.program_id();
    let (state_address, bump) = derive_state_address(&program_id)?;
    let (authority, nonce) = derive_authority(&program_id)?;

    let state = SaleState {
        admin,
        authority,
        next_sale_id: 0,
        nonce,
        bump,
    };
    ledger.create(&state_address, &state)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.create_state")
        .add_attribute("admin", admin.to_string())
        .add_attribute("state", state_address.to_string()))
}

struct SaleTerms {
    creator: Address,
    token_bond: Address,
    token_quote: Address,
    floor_price: Decimal,
    up_bound: Decimal,
    velocity: Decimal,
    supply: TokenAmount,
    duration: u64,
    vesting_time: u64,
}

fn execute_init_bond_sale(
    ledger: &mut MockLedger,
    terms: SaleTerms,
    bond_vault_seed: Binary,
    quote_vault_seed: Binary,
    creator_bond_account: Address,
) -> Result<Response, BondError> {
    let program_id = ledger.program_id();
    let (state_address, _) = derive_state_address(&program_id)?;
    let mut state = ledger.load_state()?;

    if terms.floor_price.is_zero() || terms.supply.is_zero() || terms.duration == 0 {
        return Err(BondError::InvalidSaleParameters {
            reason: "floor price, supply and duration must be positive".to_string(),
        });
    }
    if terms.token_bond == terms.token_quote {
        return Err(BondError::InvalidSaleParameters {
            reason: "bond and quote tokens must differ".to_string(),
        });
    }

    let id = state.next_sale_id;
    state.next_sale_id = id.checked_add(1).ok_or_else(|| BondError::InvalidSaleParameters {
        reason: "sale counter exhausted".to_string(),
    })?;
    ledger.store(&state_address, &state)?;

    let (sale_address, _) = derive_sale_address(&program_id, id)?;
    let (bond_vault, _) =
        derive_vault_address(&program_id, &sale_address, bond_vault_seed.as_slice())?;
    let (quote_vault, _) =
        derive_vault_address(&program_id, &sale_address, quote_vault_seed.as_slice())?;

    let now = ledger.now_seconds();
    let end_time = now.checked_add(terms.duration).ok_or_else(|| BondError::InvalidSaleParameters {
        reason: "duration overflows the clock".to_string(),
    })?;

    let sale = BondSale {
        token_bond: terms.token_bond,
        token_quote: terms.token_quote,
        token_bond_vault: bond_vault,
        token_quote_vault: quote_vault,
        creator: terms.creator,
        fee: to_decimal(1, 1)?,
        fee_amount: TokenAmount::new(0),
        floor_price: terms.floor_price,
        previous_price: terms.floor_price,
        up_bound: terms.up_bound,
        velocity: terms.velocity,
        supply: terms.supply,
        remaining_amount: terms.supply,
        quote_amount: TokenAmount::new(0),
        end_time,
        start_time: now,
        last_trade: now,
        vesting_time: terms.vesting_time,
        next_bond_id: 0,
        id,
    };
    ledger.create(&sale_address, &sale)?;
    ledger.create_token_account(&bond_vault, &state.authority, &terms.token_bond)?;
    ledger.create_token_account(&quote_vault, &state.authority, &terms.token_quote)?;

    ledger.expect_token_account(&creator_bond_account, &terms.token_bond, Some(&terms.creator))?;
    ledger.transfer(&creator_bond_account, &bond_vault, terms.supply)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.init_bond_sale")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("sale_id", id.to_string())
        .add_attribute("creator", terms.creator.to_string())
        .add_attribute("supply", terms.supply.to_string())
        .add_attribute("floor_price", terms.floor_price.to_string())
        .add_attribute("end_time", end_time.to_string()))
}

fn execute_create_bond(
    ledger: &mut MockLedger,
    buyer: Address,
    sale_address: Address,
    buyer_quote_account: Address,
    amount: TokenAmount,
    price_limit: Decimal,
) -> Result<Response, BondError> {
    let mut sale: BondSale = ledger.load(&sale_address)?;
    check_amount(&sale, amount)?;

    let now = ledger.now_seconds();
    let quote = simulate_trade(&sale, now, amount)?;
    if quote.execution_price > price_limit {
        return Err(BondError::PriceLimitExceeded {
            price: quote.execution_price.to_string(),
            limit: price_limit.to_string(),
        });
    }

    let fee = quote.cost.mul_floor(sale.fee)?;
    ledger.expect_token_account(&buyer_quote_account, &sale.token_quote, Some(&buyer))?;
    ledger.transfer(&buyer_quote_account, &sale.token_quote_vault, quote.cost)?;

    let bond_id = sale.next_bond_id;
    let (bond_address, _) =
        derive_bond_address(&ledger.program_id(), &sale_address, &buyer, bond_id)?;
    let vesting_end = now
        .checked_add(sale.vesting_time)
        .ok_or_else(|| BondError::InvalidSaleParameters {
            reason: "vesting time overflows the clock".to_string(),
        })?;
    let bond = Bond {
        sale: sale_address,
        token_bond: sale.token_bond,
        owner: buyer,
        bond_amount: amount,
        last_claim: now,
        vesting_start: now,
        vesting_end,
        id: bond_id,
    };
    ledger.create(&bond_address, &bond)?;

    sale.next_bond_id = bond_id + 1;
    sale.previous_price = quote.post_trade_price;
    sale.remaining_amount = sale.remaining_amount.checked_sub(amount)?;
    sale.last_trade = now;
    sale.fee_amount = sale.fee_amount.checked_add(fee)?;
    sale.quote_amount = sale.quote_amount.checked_add(quote.cost.checked_sub(fee)?)?;
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.create_bond")
        .add_attribute("bond", bond_address.to_string())
        .add_attribute("bond_id", bond_id.to_string())
        .add_attribute("amount", amount.to_string())
        .add_attribute("price", quote.execution_price.to_string())
        .add_attribute("cost", quote.cost.to_string())
        .add_attribute("fee", fee.to_string())
        .add_attribute("remaining", sale.remaining_amount.to_string()))
}

fn execute_claim_bond(
    ledger: &mut MockLedger,
    owner: Address,
    sale_address: Address,
    bond_address: Address,
    destination: Address,
) -> Result<Response, BondError> {
    let mut bond: Bond = ledger.load(&bond_address)?;
    require(&owner, &bond.owner)?;
    if bond.sale != sale_address {
        return Err(BondError::InvalidSaleParameters {
            reason: format!("bond {bond_address} belongs to sale {}", bond.sale),
        });
    }
    let sale: BondSale = ledger.load(&sale_address)?;

    let now = ledger.now_seconds();
    let amount = claimable_amount(&bond, now)?;
    if amount.is_zero() {
        return Err(BondError::NothingToClaim { id: bond.id });
    }
    ledger.expect_token_account(&destination, &sale.token_bond, Some(&owner))?;
    ledger.transfer(&sale.token_bond_vault, &destination, amount)?;

    bond.bond_amount = bond.bond_amount.checked_sub(amount)?;
    bond.last_claim = effective_now(&bond, now);
    let closed = bond.bond_amount.is_zero();
    if closed {
        ledger.close(&bond_address);
    } else {
        ledger.store(&bond_address, &bond)?;
    }

    Ok(Response::new()
        .add_attribute("action", "bond_sale.claim_bond")
        .add_attribute("bond", bond_address.to_string())
        .add_attribute("amount", amount.to_string())
        .add_attribute("unclaimed", bond.bond_amount.to_string())
        .add_attribute("closed", closed.to_string()))
}

fn execute_claim_quote(
    ledger: &mut MockLedger,
    creator: Address,
    sale_address: Address,
    destination: Address,
) -> Result<Response, BondError> {
    let mut sale: BondSale = ledger.load(&sale_address)?;
    require(&creator, &sale.creator)?;
    ledger.expect_token_account(&destination, &sale.token_quote, None)?;

    let amount = sale.quote_amount;
    ledger.transfer(&sale.token_quote_vault, &destination, amount)?;
    sale.quote_amount = TokenAmount::new(0);
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.claim_quote")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("amount", amount.to_string()))
}

fn execute_withdraw_fee(
    ledger: &mut MockLedger,
    admin: Address,
    sale_address: Address,
    destination: Address,
) -> Result<Response, BondError> {
    let state = ledger.load_state()?;
    require(&admin, &state.admin)?;
    let mut sale: BondSale = ledger.load(&sale_address)?;
    ledger.expect_token_account(&destination, &sale.token_quote, Some(&admin))?;

    let amount = sale.fee_amount;
    ledger.transfer(&sale.token_quote_vault, &destination, amount)?;
    sale.fee_amount = TokenAmount::new(0);
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.withdraw_fee")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("amount", amount.to_string()))
}

/// Vested bonds keep their tokens in the vault; only the sale record goes.
fn execute_end_bond_sale(
    ledger: &mut MockLedger,
    creator: Address,
    sale_address: Address,
    bond_destination: Address,
    quote_destination: Address,
    fee_destination: Address,
) -> Result<Response, BondError> {
    let sale: BondSale = ledger.load(&sale_address)?;
    require(&creator, &sale.creator)?;
    let state = ledger.load_state()?;

    ledger.expect_token_account(&bond_destination, &sale.token_bond, Some(&creator))?;
    ledger.expect_token_account(&quote_destination, &sale.token_quote, Some(&creator))?;
    ledger.expect_token_account(&fee_destination, &sale.token_quote, Some(&state.admin))?;

    ledger.transfer(&sale.token_bond_vault, &bond_destination, sale.remaining_amount)?;
    ledger.transfer(&sale.token_quote_vault, &quote_destination, sale.quote_amount)?;
    ledger.transfer(&sale.token_quote_vault, &fee_destination, sale.fee_amount)?;
    ledger.close(&sale_address);

    Ok(Response::new()
        .add_attribute("action", "bond_sale.end_bond_sale")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("unsold", sale.remaining_amount.to_string())
        .add_attribute("quote_amount", sale.quote_amount.to_string())
        .add_attribute("fee_amount", sale.fee_amount.to_string()))
}

fn execute_change_fee(
    ledger: &mut MockLedger,
    admin: Address,
    sale_address: Address,
    fee: Decimal,
) -> Result<Response, BondError> {
    let state = ledger.load_state()?;
    require(&admin, &state.admin)?;
    check_fee(fee)?;

    let mut sale: BondSale = ledger.load(&sale_address)?;
    sale.fee = fee;
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.change_fee")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("fee", fee.to_string()))
}

fn execute_change_velocity(
    ledger: &mut MockLedger,
    creator: Address,
    sale_address: Address,
    velocity: Decimal,
) -> Result<Response, BondError> {
    let mut sale: BondSale = ledger.load(&sale_address)?;
    require(&creator, &sale.creator)?;
    sale.velocity = velocity;
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.change_velocity")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("velocity", velocity.to_string()))
}

fn execute_change_up_bound(
    ledger: &mut MockLedger,
    creator: Address,
    sale_address: Address,
    up_bound: Decimal,
) -> Result<Response, BondError> {
    let mut sale: BondSale = ledger.load(&sale_address)?;
    require(&creator, &sale.creator)?;
    sale.up_bound = up_bound;
    ledger.store(&sale_address, &sale)?;

    Ok(Response::new()
        .add_attribute("action", "bond_sale.change_up_bound")
        .add_attribute("sale", sale_address.to_string())
        .add_attribute("up_bound", up_bound.to_string()))
}
