use cosmwasm_std::Timestamp;

use crate::address::Address;
use crate::error::BondError;
use crate::ledger::{sign, Ledger, LocalSigner, Signer};
use crate::math::{to_decimal, Decimal, SignedDecimal, TokenAmount};
use crate::msg::{BondInstruction, Step, Transaction};
use crate::operations::end_bond_sale::EndSaleAccounts;
use crate::retry::RetryPolicy;
use crate::testing::helpers::*;
use crate::testing::GENESIS_SECONDS;

fn buy(client: &mut TestClient, buyer: &str, sale: &Address, amount: u64) -> u128 {
    let (outcome, _) = client
        .buy(&signer(buyer), sale, TokenAmount::new(amount), None)
        .unwrap();
    outcome.receipt.attribute("bond_id").unwrap().parse().unwrap()
}

// ============================================================
// Setup
// ============================================================

#[test]
fn test_create_state() {
    let mut client = setup_client();
    let (_, state) = client.get_state().unwrap();
    assert_eq!(state.admin, addr(ADMIN));
    assert_eq!(state.next_sale_id, 0);

    let err = client.create_state(&signer(ADMIN)).unwrap_err();
    assert!(matches!(err, BondError::AccountAlreadyExists { .. }));
}

#[test]
fn test_init_bond_sale() {
    let mut client = setup_client();
    let params = default_sale_params();
    let creator_account = client.token_account_address(&addr(CREATOR), &params.token_bond).unwrap();
    let sale_address = setup_sale(&mut client, &params);

    let sale = load_sale(&client, &sale_address);
    assert_eq!(sale.id, 0);
    assert_eq!(sale.creator, addr(CREATOR));
    assert_eq!(sale.floor_price, Decimal::one());
    assert_eq!(sale.previous_price, Decimal::one());
    assert_eq!(sale.fee, to_decimal(1, 1).unwrap());
    assert_eq!(sale.supply, TokenAmount::new(SALE_SUPPLY));
    assert_eq!(sale.remaining_amount, TokenAmount::new(SALE_SUPPLY));
    assert_eq!(sale.start_time, GENESIS_SECONDS);
    assert_eq!(sale.last_trade, GENESIS_SECONDS);
    assert_eq!(sale.end_time, GENESIS_SECONDS + SALE_DURATION);
    assert_eq!(sale.vesting_time, VESTING_TIME);

    let ledger = client.ledger();
    assert_eq!(ledger.balance(&sale.token_bond_vault), TokenAmount::new(SALE_SUPPLY));
    assert_eq!(ledger.balance(&creator_account), TokenAmount::new(0));

    let (_, state) = client.get_state().unwrap();
    assert_eq!(state.next_sale_id, 1);
    let (by_id, _) = client.get_sale_by_id(0).unwrap();
    assert_eq!(by_id, sale_address);
}

#[test]
fn test_init_bond_sale_without_funds_rolls_back() {
    let mut client = setup_client();
    let err = client
        .init_bond_sale(&signer(CREATOR), &default_sale_params())
        .unwrap_err();
    assert!(matches!(err, BondError::AccountNotFound { .. }));

    // counter bump and vault creation were undone
    let (_, state) = client.get_state().unwrap();
    assert_eq!(state.next_sale_id, 0);
    assert!(client.get_all_sales().unwrap().is_empty());
}

// ============================================================
// Buying
// ============================================================

#[test]
fn test_buy_right_after_open() {
    let (mut client, sale_address) = setup_default_sale();
    let (outcome, quote) = client
        .buy(&signer(BUYER), &sale_address, TokenAmount::new(100), None)
        .unwrap();

    // 10% of supply jumps by 0.05; the buyer pays the midpoint
    assert_eq!(quote.trade.execution_price, to_decimal(1025, 3).unwrap());
    assert_eq!(quote.trade.cost, TokenAmount::new(103));
    assert!(outcome
        .request
        .iter()
        .any(|a| a.key == "price_limit" && a.value == "1.03525"));
    assert_eq!(outcome.receipt.attribute("action"), Some("bond_sale.create_bond"));
    assert_eq!(outcome.receipt.attribute("bond_id"), Some("0"));
    assert_eq!(outcome.receipt.attribute("price"), Some("1.025"));
    assert_eq!(outcome.receipt.attribute("fee"), Some("10"));

    let sale = load_sale(&client, &sale_address);
    assert_eq!(sale.remaining_amount, TokenAmount::new(900));
    assert_eq!(sale.quote_amount, TokenAmount::new(93));
    assert_eq!(sale.fee_amount, TokenAmount::new(10));
    assert_eq!(sale.previous_price, to_decimal(105, 2).unwrap());
    assert_eq!(sale.next_bond_id, 1);

    let buyer_quote = client
        .token_account_address(&addr(BUYER), &sale.token_quote)
        .unwrap();
    assert_eq!(client.ledger().balance(&buyer_quote), TokenAmount::new(BUYER_FUNDS - 103));
    assert_eq!(client.ledger().balance(&sale.token_quote_vault), TokenAmount::new(103));

    let bond_address = client.bond_address(&sale_address, &addr(BUYER), 0).unwrap();
    assert_eq!(outcome.receipt.created, vec![bond_address]);
    let bond = client.get_bond(&bond_address).unwrap();
    assert_eq!(bond.owner, addr(BUYER));
    assert_eq!(bond.sale, sale_address);
    assert_eq!(bond.bond_amount, TokenAmount::new(100));
    assert_eq!(bond.vesting_start, sale.last_trade);
    assert_eq!(bond.vesting_end, bond.vesting_start + VESTING_TIME);
    assert_eq!(bond.last_claim, bond.vesting_start);
}

#[test]
fn test_sequential_buys_number_bonds() {
    let (mut client, sale) = setup_default_sale();
    let first = buy(&mut client, BUYER, &sale, 100);
    let second = buy(&mut client, BUYER, &sale, 50);
    assert_eq!(second, first + 1);

    // bought on top of the first purchase's jump
    let bond = client
        .get_bond(&client.bond_address(&sale, &addr(BUYER), second).unwrap())
        .unwrap();
    assert_eq!(bond.id, second);
    assert_eq!(load_sale(&client, &sale).previous_price, to_decimal(1075, 3).unwrap());

    let third = buy(&mut client, OTHER_BUYER, &sale, 10);
    assert_eq!(third, second + 1);
    assert_eq!(load_sale(&client, &sale).remaining_amount, TokenAmount::new(840));
}

#[test]
fn test_price_decays_back_to_floor() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);
    assert_eq!(client.current_price(&sale).unwrap(), to_decimal(105, 2).unwrap());

    client.ledger_mut().advance_seconds(10);
    // 0.025 of decay per tenth of the sale's duration
    let decayed = client.current_price(&sale).unwrap();
    assert_eq!(decayed, to_decimal(1025, 3).unwrap());

    client.ledger_mut().advance_seconds(40);
    assert_eq!(client.current_price(&sale).unwrap(), Decimal::one());
    assert_eq!(client.ceiling_price(&sale).unwrap(), to_decimal(15, 1).unwrap());
}

#[test]
fn test_price_limit_below_execution_fails() {
    let (mut client, sale) = setup_default_sale();
    let err = client
        .create_bond(&signer(BUYER), &sale, TokenAmount::new(100), Decimal::one())
        .unwrap_err();
    assert_eq!(
        err,
        BondError::PriceLimitExceeded {
            price: "1.025".to_string(),
            limit: "1".to_string(),
        }
    );
    assert!(err.is_recoverable());

    let sale_state = load_sale(&client, &sale);
    assert_eq!(sale_state.remaining_amount, TokenAmount::new(SALE_SUPPLY));
    assert_eq!(sale_state.next_bond_id, 0);
}

#[test]
fn test_price_limit_at_execution_price_passes() {
    let (mut client, sale) = setup_default_sale();
    let limit = to_decimal(1025, 3).unwrap();
    let outcome = client
        .create_bond(&signer(BUYER), &sale, TokenAmount::new(100), limit)
        .unwrap();
    assert_eq!(outcome.receipt.attribute("price"), Some("1.025"));
    assert_eq!(load_sale(&client, &sale).remaining_amount, TokenAmount::new(900));
}

#[test]
fn test_lowered_up_bound_blocks_buys_before_submission() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 500);
    assert_eq!(client.current_price(&sale).unwrap(), to_decimal(125, 2).unwrap());

    let tighter = to_decimal(1, 1).unwrap();
    client.change_up_bound(&signer(CREATOR), &sale, tighter).unwrap();
    assert_eq!(client.ceiling_price(&sale).unwrap(), to_decimal(11, 1).unwrap());

    let buyer_quote = client
        .token_account_address(&addr(BUYER), &addr(QUOTE_MINT))
        .unwrap();
    let funds = client.ledger().balance(&buyer_quote);

    let generous = SignedDecimal::from_decimal(10, 0).unwrap();
    let err = client
        .buy(&signer(BUYER), &sale, TokenAmount::new(10), Some(generous))
        .unwrap_err();
    assert_eq!(
        err,
        BondError::PriceLimitExceeded {
            price: "1.2505".to_string(),
            limit: "1.1".to_string(),
        }
    );
    assert_eq!(load_sale(&client, &sale).next_bond_id, 1);
    assert_eq!(client.ledger().balance(&buyer_quote), funds);

    // restoring the bound makes the curve reachable again
    client.change_up_bound(&signer(CREATOR), &sale, half()).unwrap();
    client
        .buy(&signer(BUYER), &sale, TokenAmount::new(10), Some(generous))
        .unwrap();
}

#[test]
fn test_concurrent_buy_invalidates_stale_quote() {
    let (mut client, sale) = setup_default_sale();
    let quote = client
        .quote_buy(&sale, TokenAmount::new(100), Some(SignedDecimal::new(0)))
        .unwrap();
    assert_eq!(quote.price_limit, to_decimal(1025, 3).unwrap());

    // someone else lands first and lifts the price
    buy(&mut client, OTHER_BUYER, &sale, 100);

    let err = client
        .create_bond(&signer(BUYER), &sale, TokenAmount::new(100), quote.price_limit)
        .unwrap_err();
    assert!(matches!(err, BondError::PriceLimitExceeded { .. }));
    assert_eq!(load_sale(&client, &sale).remaining_amount, TokenAmount::new(900));

    // a fresh quote goes through
    client
        .buy(&signer(BUYER), &sale, TokenAmount::new(100), None)
        .unwrap();
}

#[test]
fn test_negative_slippage_is_rejected_by_ledger() {
    let (mut client, sale) = setup_default_sale();
    let tighter = SignedDecimal::from_decimal(-5, 2).unwrap();
    let err = client
        .buy(&signer(BUYER), &sale, TokenAmount::new(100), Some(tighter))
        .unwrap_err();
    assert!(matches!(err, BondError::PriceLimitExceeded { .. }));

    let impossible = SignedDecimal::from_decimal(-2, 0).unwrap();
    let err = client
        .buy(&signer(BUYER), &sale, TokenAmount::new(100), Some(impossible))
        .unwrap_err();
    assert!(matches!(err, BondError::InvalidSlippage { .. }));
}

#[test]
fn test_buy_more_than_remaining() {
    let (mut client, sale) = setup_default_sale();
    let err = client
        .buy(&signer(BUYER), &sale, TokenAmount::new(SALE_SUPPLY + 1), None)
        .unwrap_err();
    assert_eq!(
        err,
        BondError::InsufficientRemainingSupply {
            requested: SALE_SUPPLY + 1,
            remaining: SALE_SUPPLY,
        }
    );

    // the ledger checks on its own as well
    let buyer = signer(BUYER);
    let tx = Transaction {
        payer: buyer.address(),
        steps: vec![
            Step::CreateTokenAccount {
                owner: buyer.address(),
                mint: addr(BOND_MINT),
            },
            Step::Invoke(BondInstruction::CreateBond {
                buyer: buyer.address(),
                sale,
                buyer_quote_account: client
                    .token_account_address(&buyer.address(), &addr(QUOTE_MINT))
                    .unwrap(),
                amount: TokenAmount::new(SALE_SUPPLY + 1),
                price_limit: to_decimal(15, 1).unwrap(),
            }),
        ],
    };
    let signed = sign(tx, &[&buyer]).unwrap();
    let err = client.ledger_mut().submit(signed).unwrap_err();
    assert_eq!(err.ledger_code(), Some(crate::error::CODE_INSUFFICIENT_TOKEN_AMOUNT));

    // the first step was rolled back with the second
    let bond_account = client
        .token_account_address(&buyer.address(), &addr(BOND_MINT))
        .unwrap();
    assert_eq!(client.ledger().get_token_account(&bond_account).unwrap(), None);
}

// ============================================================
// Claiming
// ============================================================

#[test]
fn test_claim_bond_over_vesting() {
    let (mut client, sale) = setup_default_sale();
    let id = buy(&mut client, BUYER, &sale, 100);
    let bond_address = client.bond_address(&sale, &addr(BUYER), id).unwrap();

    let err = client.claim_bond(&signer(BUYER), &sale, id, None).unwrap_err();
    assert_eq!(err, BondError::NothingToClaim { id });

    client.ledger_mut().advance_seconds(5);
    assert_eq!(client.claimable(&bond_address).unwrap(), TokenAmount::new(50));
    let outcome = client.claim_bond(&signer(BUYER), &sale, id, None).unwrap();
    assert_eq!(outcome.receipt.attribute("amount"), Some("50"));
    assert_eq!(outcome.receipt.attribute("closed"), Some("false"));

    let destination = client
        .token_account_address(&addr(BUYER), &addr(BOND_MINT))
        .unwrap();
    assert_eq!(outcome.receipt.created, vec![destination]);
    assert_eq!(client.ledger().balance(&destination), TokenAmount::new(50));

    let bond = client.get_bond(&bond_address).unwrap();
    assert_eq!(bond.bond_amount, TokenAmount::new(50));
    assert_eq!(bond.last_claim, GENESIS_SECONDS + 5);

    // past the end only the remainder is left
    client.ledger_mut().advance_seconds(20);
    let outcome = client.claim_bond(&signer(BUYER), &sale, id, None).unwrap();
    assert_eq!(outcome.receipt.attribute("closed"), Some("true"));
    assert_eq!(client.ledger().balance(&destination), TokenAmount::new(100));

    assert!(matches!(
        client.get_bond(&bond_address).unwrap_err(),
        BondError::AccountNotFound { .. }
    ));
    assert!(client.get_all_bonds_for_sale(&sale).unwrap().is_empty());
    let err = client.claim_bond(&signer(BUYER), &sale, id, None).unwrap_err();
    assert!(err.is_recoverable());
}

#[test]
fn test_claim_long_after_vesting() {
    let (mut client, sale) = setup_default_sale();
    let id = buy(&mut client, BUYER, &sale, 100);

    let later = Timestamp::from_seconds(GENESIS_SECONDS + 10 * VESTING_TIME);
    client.ledger_mut().set_block_time(later);
    assert_eq!(client.ledger().block_time(), later);

    let outcome = client.claim_bond(&signer(BUYER), &sale, id, None).unwrap();
    assert_eq!(outcome.receipt.attribute("amount"), Some("100"));
    assert_eq!(outcome.receipt.attribute("closed"), Some("true"));
}

#[test]
fn test_claim_bond_by_someone_else() {
    let (mut client, sale) = setup_default_sale();
    let id = buy(&mut client, BUYER, &sale, 100);
    client.ledger_mut().advance_seconds(VESTING_TIME);

    // the bond address is derived from the claimant, so a stranger finds nothing
    let err = client.claim_bond(&signer(RANDOM_USER), &sale, id, None).unwrap_err();
    assert!(matches!(err, BondError::AccountNotFound { .. }));

    let thief = signer(RANDOM_USER);
    let tx = Transaction {
        payer: thief.address(),
        steps: vec![Step::Invoke(BondInstruction::ClaimBond {
            owner: thief.address(),
            sale,
            bond: client.bond_address(&sale, &addr(BUYER), id).unwrap(),
            destination: client
                .token_account_address(&thief.address(), &addr(BOND_MINT))
                .unwrap(),
        })],
    };
    let err = client.ledger_mut().submit(sign(tx, &[&thief]).unwrap()).unwrap_err();
    assert_eq!(err, BondError::Unauthorized);
}

#[test]
fn test_claim_quote() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);

    let err = client.claim_quote(&signer(BUYER), &sale, None).unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    let outcome = client.claim_quote(&signer(CREATOR), &sale, None).unwrap();
    assert_eq!(outcome.receipt.attribute("amount"), Some("93"));
    let creator_quote = client
        .token_account_address(&addr(CREATOR), &addr(QUOTE_MINT))
        .unwrap();
    assert_eq!(client.ledger().balance(&creator_quote), TokenAmount::new(93));

    let sale_state = load_sale(&client, &sale);
    assert_eq!(sale_state.quote_amount, TokenAmount::new(0));
    // fees stay behind for the admin
    assert_eq!(client.ledger().balance(&sale_state.token_quote_vault), TokenAmount::new(10));
}

// ============================================================
// Fees and parameters
// ============================================================

#[test]
fn test_withdraw_fee() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);

    let err = client.withdraw_fee(&signer(RANDOM_USER), &sale, None).unwrap_err();
    assert_eq!(err, BondError::Unauthorized);
    let stranger_account = client
        .token_account_address(&addr(RANDOM_USER), &addr(QUOTE_MINT))
        .unwrap();
    assert_eq!(client.ledger().get_token_account(&stranger_account).unwrap(), None);

    client.withdraw_fee(&signer(ADMIN), &sale, None).unwrap();
    let admin_quote = client
        .token_account_address(&addr(ADMIN), &addr(QUOTE_MINT))
        .unwrap();
    assert_eq!(client.ledger().balance(&admin_quote), TokenAmount::new(10));
    assert_eq!(load_sale(&client, &sale).fee_amount, TokenAmount::new(0));
}

#[test]
fn test_change_fee() {
    let (mut client, sale) = setup_default_sale();
    let new_fee = to_decimal(2, 1).unwrap();

    let err = client.change_fee(&signer(CREATOR), &sale, new_fee).unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    client.change_fee(&signer(ADMIN), &sale, new_fee).unwrap();
    assert_eq!(load_sale(&client, &sale).fee, new_fee);

    buy(&mut client, BUYER, &sale, 100);
    let sale_state = load_sale(&client, &sale);
    // floor(103 * 0.2)
    assert_eq!(sale_state.fee_amount, TokenAmount::new(20));
    assert_eq!(sale_state.quote_amount, TokenAmount::new(83));
}

#[test]
fn test_change_velocity_and_up_bound() {
    let (mut client, sale) = setup_default_sale();

    let err = client
        .change_velocity(&signer(RANDOM_USER), &sale, Decimal::one())
        .unwrap_err();
    assert_eq!(err, BondError::Unauthorized);
    let err = client
        .change_up_bound(&signer(ADMIN), &sale, Decimal::one())
        .unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    client.change_velocity(&signer(CREATOR), &sale, Decimal::one()).unwrap();
    client.change_up_bound(&signer(CREATOR), &sale, Decimal::one()).unwrap();
    let sale_state = load_sale(&client, &sale);
    assert_eq!(sale_state.velocity, Decimal::one());
    assert_eq!(sale_state.up_bound, Decimal::one());
    assert_eq!(client.ceiling_price(&sale).unwrap(), to_decimal(2, 0).unwrap());

    // a wider up bound doubles the jump
    let (_, quote) = client
        .buy(&signer(BUYER), &sale, TokenAmount::new(100), None)
        .unwrap();
    assert_eq!(quote.trade.execution_price, to_decimal(105, 2).unwrap());
}

// ============================================================
// Ending a sale
// ============================================================

#[test]
fn test_end_bond_sale() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);

    let defaults = EndSaleAccounts::default();
    let err = client
        .end_bond_sale(&signer(BUYER), &sale, &defaults)
        .unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    let vault = load_sale(&client, &sale).token_bond_vault;
    let outcome = client
        .end_bond_sale(&signer(CREATOR), &sale, &defaults)
        .unwrap();
    assert_eq!(outcome.receipt.attribute("unsold"), Some("900"));

    let ledger = client.ledger();
    let creator_bond = client
        .token_account_address(&addr(CREATOR), &addr(BOND_MINT))
        .unwrap();
    let creator_quote = client
        .token_account_address(&addr(CREATOR), &addr(QUOTE_MINT))
        .unwrap();
    let admin_quote = client
        .token_account_address(&addr(ADMIN), &addr(QUOTE_MINT))
        .unwrap();
    assert_eq!(ledger.balance(&creator_bond), TokenAmount::new(900));
    assert_eq!(ledger.balance(&creator_quote), TokenAmount::new(93));
    assert_eq!(ledger.balance(&admin_quote), TokenAmount::new(10));
    // sold bonds stay in custody
    assert_eq!(ledger.balance(&vault), TokenAmount::new(100));

    assert!(matches!(
        client.get_sale(&sale).unwrap_err(),
        BondError::AccountNotFound { .. }
    ));
    assert!(client.get_all_sales().unwrap().is_empty());
    assert_eq!(client.get_all_bonds_for_sale(&sale).unwrap().len(), 1);

    let ledger = client.into_ledger();
    assert_eq!(ledger.raw_account(&sale), None);
}

#[test]
fn test_end_bond_sale_to_chosen_accounts() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);
    client.claim_quote(&signer(CREATOR), &sale, None).unwrap();

    let creator_quote = client
        .token_account_address(&addr(CREATOR), &addr(QUOTE_MINT))
        .unwrap();
    let admin_quote = client
        .token_account_address(&addr(ADMIN), &addr(QUOTE_MINT))
        .unwrap();

    // fees belong to the admin, not the creator
    let misdirected = EndSaleAccounts {
        fee: Some(creator_quote),
        ..EndSaleAccounts::default()
    };
    let err = client
        .end_bond_sale(&signer(CREATOR), &sale, &misdirected)
        .unwrap_err();
    assert!(matches!(err, BondError::InvalidTokenAccount { .. }));
    assert_eq!(client.ledger().get_token_account(&admin_quote).unwrap(), None);

    let chosen = EndSaleAccounts {
        quote: Some(creator_quote),
        ..EndSaleAccounts::default()
    };
    client
        .end_bond_sale(&signer(CREATOR), &sale, &chosen)
        .unwrap();
    assert_eq!(client.ledger().balance(&creator_quote), TokenAmount::new(93));
    assert_eq!(client.ledger().balance(&admin_quote), TokenAmount::new(10));
}

// ============================================================
// Queries
// ============================================================

#[test]
fn test_bond_enumeration() {
    let mut client = setup_client();
    let first = setup_sale(&mut client, &default_sale_params());
    let second = setup_sale(&mut client, &default_sale_params());
    assert_ne!(first, second);
    assert_eq!(client.get_sale_by_id(1).unwrap().0, second);
    assert_eq!(client.get_all_sales().unwrap().len(), 2);

    buy(&mut client, BUYER, &first, 10);
    buy(&mut client, BUYER, &first, 10);
    buy(&mut client, OTHER_BUYER, &first, 10);
    buy(&mut client, BUYER, &second, 10);

    assert_eq!(client.get_all_bonds_for_sale(&first).unwrap().len(), 3);
    assert_eq!(client.get_all_bonds_for_sale(&second).unwrap().len(), 1);

    let mine = client
        .get_all_bonds_for_owner_in_sale(&first, &addr(BUYER))
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|(_, bond)| bond.owner == addr(BUYER) && bond.sale == first));

    assert_eq!(client.get_all_bonds_for_owner(&addr(BUYER)).unwrap().len(), 3);
    assert_eq!(client.get_all_bonds_for_owner(&addr(OTHER_BUYER)).unwrap().len(), 1);
    assert!(client.get_all_bonds_for_owner(&addr(RANDOM_USER)).unwrap().is_empty());
}

#[test]
fn test_get_sale_is_stable_without_trades() {
    let (mut client, sale) = setup_default_sale();
    buy(&mut client, BUYER, &sale, 100);
    client.ledger_mut().advance_seconds(30);

    let first = client.ledger().get_account(&sale).unwrap().unwrap();
    let second = client.ledger().get_account(&sale).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(client.ledger().raw_account(&sale), Some(first));
    assert_eq!(client.get_sale(&sale).unwrap(), client.get_sale(&sale).unwrap());
}

// ============================================================
// Signatures and visibility
// ============================================================

#[test]
fn test_forged_authorization() {
    let (mut client, sale) = setup_default_sale();
    let creator = signer(CREATOR);
    let impostor = signer(RANDOM_USER);

    // signed by someone other than the named authority
    let tx = Transaction {
        payer: impostor.address(),
        steps: vec![Step::Invoke(BondInstruction::ChangeVelocity {
            creator: creator.address(),
            sale,
            velocity: Decimal::one(),
        })],
    };
    let err = client
        .ledger_mut()
        .submit(sign(tx.clone(), &[&impostor]).unwrap())
        .unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    // authorization over a different transaction
    let mut signed = sign(tx, &[&impostor, &creator]).unwrap();
    signed.tx.steps.push(Step::Invoke(BondInstruction::ChangeUpBound {
        creator: creator.address(),
        sale,
        up_bound: Decimal::one(),
    }));
    let err = client.ledger_mut().submit(signed).unwrap_err();
    assert_eq!(err, BondError::Unauthorized);

    assert_eq!(load_sale(&client, &sale).velocity, half());
}

#[test]
fn test_waits_out_visibility_lag() {
    let (mut client, sale) = setup_default_sale();
    client.ledger_mut().set_visibility_lag(2);

    let id = buy(&mut client, BUYER, &sale, 100);
    let bond_address = client.bond_address(&sale, &addr(BUYER), id).unwrap();

    let err = client.get_bond(&bond_address).unwrap_err();
    assert!(err.is_transient());

    let bond = client.wait_for_bond(&bond_address).unwrap();
    assert_eq!(bond.id, id);
}

#[test]
fn test_visibility_lag_outlasting_retries() {
    let mut client = setup_client();
    client.ledger_mut().set_visibility_lag(10);
    let sale = setup_sale(&mut client, &default_sale_params());

    let err = client.wait_for_sale(&sale).unwrap_err();
    assert!(matches!(err, BondError::AccountNotFound { .. }));

    let patient = RetryPolicy {
        max_attempts: 20,
        initial_backoff_ms: 0,
        max_backoff_ms: 0,
        backoff_multiplier: 1,
    };
    let found = patient.poll(|| client.get_sale(&sale)).unwrap();
    assert_eq!(found.id, 0);
}

#[test]
fn test_local_signer_is_the_payer() {
    let (mut client, sale) = setup_default_sale();
    let late = LocalSigner::new(addr("late_buyer"));

    let account = client
        .ledger_mut()
        .mint_to(&late.address(), &addr(QUOTE_MINT), 10)
        .unwrap();
    assert_eq!(
        account,
        client
            .token_account_address(&late.address(), &addr(QUOTE_MINT))
            .unwrap()
    );

    let (outcome, quote) = client
        .buy(&late, &sale, TokenAmount::new(1), None)
        .unwrap();
    assert_eq!(outcome.receipt.attribute("amount"), Some("1"));
    assert_eq!(client.ledger().balance(&account), TokenAmount::new(10 - quote.trade.cost.v));
}
