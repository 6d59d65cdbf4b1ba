//! Client over a `Ledger`: fetch a snapshot, plan the action, sign it and
//! submit it as one transaction.
//!
//! Reads never retry on their own. Use the `wait_for_*` helpers when an
//! account created by a just-applied transaction has to be observed.

use cosmwasm_std::Attribute;

use crate::address::{derive_bond_address, derive_token_account, Address};
use crate::config::ClientConfig;
use crate::error::BondError;
use crate::ledger::{sign, Ledger, Signer};
use crate::math::{Decimal, SignedDecimal, TokenAmount};
use crate::msg::{Plan, Receipt};
use crate::operations::change_params::{plan_change_fee, plan_change_up_bound, plan_change_velocity};
use crate::operations::claim_bond::plan_claim_bond;
use crate::operations::claim_quote::plan_claim_quote;
use crate::operations::create_bond::{plan_buy, plan_create_bond, quote_buy, BuyQuote};
use crate::operations::create_state::plan_create_state;
use crate::operations::end_bond_sale::{plan_end_bond_sale, EndSaleAccounts, EndSaleDestinations};
use crate::operations::init_bond_sale::{plan_init_bond_sale, InitBondSaleParams};
use crate::operations::withdraw_fee::plan_withdraw_fee;
use crate::operations::TokenDestination;
use crate::pricing::{self, current_price};
use crate::query;
use crate::state::{Bond, BondSale, SaleState};
use crate::vesting::claimable_amount;

/// What a submitted action asked for and what the ledger reported back.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub request: Vec<Attribute>,
    pub receipt: Receipt,
}

pub struct TradeProtocolClient<L: Ledger> {
    ledger: L,
    config: ClientConfig,
}

impl<L: Ledger> TradeProtocolClient<L> {
    pub fn new(ledger: L, config: ClientConfig) -> Self {
        TradeProtocolClient { ledger, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    fn program_id(&self) -> &Address {
        &self.config.program_id
    }

    fn execute(&mut self, plan: Plan, signer: &dyn Signer) -> Result<Outcome, BondError> {
        let request = plan.attributes.clone();
        let tx = plan.into_transaction(signer.address());
        let receipt = self.ledger.submit(sign(tx, &[signer])?)?;
        Ok(Outcome { request, receipt })
    }

    /// Canonical token account of `owner` for `mint`.
    pub fn token_account_address(
        &self,
        owner: &Address,
        mint: &Address,
    ) -> Result<Address, BondError> {
        derive_token_account(&self.config.token_program_id, owner, mint)
    }

    /// Resolves a payout account: `explicit` if given, otherwise the
    /// owner's canonical account, created in the same transaction when absent.
    pub fn token_destination(
        &self,
        owner: &Address,
        mint: &Address,
        explicit: Option<Address>,
    ) -> Result<TokenDestination, BondError> {
        let canonical = self.token_account_address(owner, mint)?;
        let address = explicit.unwrap_or(canonical);
        match self.ledger.get_token_account(&address)? {
            Some(account) => Ok(TokenDestination {
                address,
                owner: account.owner,
                mint: account.mint,
                missing: false,
            }),
            None => Ok(TokenDestination {
                address,
                owner: *owner,
                mint: *mint,
                missing: address == canonical,
            }),
        }
    }

    // ---- submissions ----

    pub fn create_state(&mut self, admin: &dyn Signer) -> Result<Outcome, BondError> {
        let plan = plan_create_state(self.program_id(), &admin.address())?;
        self.execute(plan, admin)
    }

    /// Opens a sale funded from the creator's canonical bond token account.
    pub fn init_bond_sale(
        &mut self,
        creator: &dyn Signer,
        params: &InitBondSaleParams,
    ) -> Result<Outcome, BondError> {
        let (_, state) = self.get_state()?;
        let creator_address = creator.address();
        let creator_bond_account =
            self.token_account_address(&creator_address, &params.token_bond)?;
        let plan = plan_init_bond_sale(
            self.program_id(),
            &state,
            &creator_address,
            &creator_bond_account,
            params,
        )?;
        self.execute(plan, creator)
    }

    /// Buys at a limit derived from a fresh snapshot. `slippage` defaults
    /// to the configured tolerance.
    pub fn buy(
        &mut self,
        buyer: &dyn Signer,
        sale: &Address,
        amount: TokenAmount,
        slippage: Option<SignedDecimal>,
    ) -> Result<(Outcome, BuyQuote), BondError> {
        let snapshot = self.get_sale(sale)?;
        let now = self.ledger.now()?;
        let buyer_address = buyer.address();
        let quote_account = self.token_account_address(&buyer_address, &snapshot.token_quote)?;
        let (plan, quote) = plan_buy(
            sale,
            &snapshot,
            &buyer_address,
            &quote_account,
            amount,
            slippage.unwrap_or(self.config.default_slippage),
            now,
        )?;
        Ok((self.execute(plan, buyer)?, quote))
    }

    /// Buy with a caller-computed limit.
    pub fn create_bond(
        &mut self,
        buyer: &dyn Signer,
        sale: &Address,
        amount: TokenAmount,
        price_limit: Decimal,
    ) -> Result<Outcome, BondError> {
        let snapshot = self.get_sale(sale)?;
        let buyer_address = buyer.address();
        let quote_account = self.token_account_address(&buyer_address, &snapshot.token_quote)?;
        let plan = plan_create_bond(
            sale,
            &snapshot,
            &buyer_address,
            &quote_account,
            amount,
            price_limit,
        )?;
        self.execute(plan, buyer)
    }

    pub fn claim_bond(
        &mut self,
        owner: &dyn Signer,
        sale: &Address,
        bond_id: u128,
        destination: Option<Address>,
    ) -> Result<Outcome, BondError> {
        let owner_address = owner.address();
        let bond_address = self.bond_address(sale, &owner_address, bond_id)?;
        let snapshot = self.get_sale(sale)?;
        let bond = self.get_bond(&bond_address)?;
        let destination =
            self.token_destination(&owner_address, &snapshot.token_bond, destination)?;
        let now = self.ledger.now()?;
        let plan = plan_claim_bond(sale, &snapshot, &bond_address, &bond, &destination, now)?;
        self.execute(plan, owner)
    }

    pub fn claim_quote(
        &mut self,
        creator: &dyn Signer,
        sale: &Address,
        destination: Option<Address>,
    ) -> Result<Outcome, BondError> {
        let snapshot = self.get_sale(sale)?;
        let creator_address = creator.address();
        let destination =
            self.token_destination(&creator_address, &snapshot.token_quote, destination)?;
        let plan = plan_claim_quote(sale, &snapshot, &creator_address, &destination)?;
        self.execute(plan, creator)
    }

    /// Closes the sale, paying unsold bond tokens and proceeds to the
    /// creator and fees to the admin. Unset accounts default to the
    /// payee's canonical ones.
    pub fn end_bond_sale(
        &mut self,
        creator: &dyn Signer,
        sale: &Address,
        accounts: &EndSaleAccounts,
    ) -> Result<Outcome, BondError> {
        let snapshot = self.get_sale(sale)?;
        let (_, state) = self.get_state()?;
        let creator_address = creator.address();
        let destinations = EndSaleDestinations {
            bond: self.token_destination(&creator_address, &snapshot.token_bond, accounts.bond)?,
            quote: self.token_destination(&creator_address, &snapshot.token_quote, accounts.quote)?,
            fee: self.token_destination(&state.admin, &snapshot.token_quote, accounts.fee)?,
        };
        let plan = plan_end_bond_sale(sale, &snapshot, &creator_address, &destinations)?;
        self.execute(plan, creator)
    }

    pub fn change_fee(
        &mut self,
        admin: &dyn Signer,
        sale: &Address,
        fee: Decimal,
    ) -> Result<Outcome, BondError> {
        let plan = plan_change_fee(sale, &admin.address(), fee)?;
        self.execute(plan, admin)
    }

    pub fn change_velocity(
        &mut self,
        creator: &dyn Signer,
        sale: &Address,
        velocity: Decimal,
    ) -> Result<Outcome, BondError> {
        let plan = plan_change_velocity(sale, &creator.address(), velocity)?;
        self.execute(plan, creator)
    }

    pub fn change_up_bound(
        &mut self,
        creator: &dyn Signer,
        sale: &Address,
        up_bound: Decimal,
    ) -> Result<Outcome, BondError> {
        let plan = plan_change_up_bound(sale, &creator.address(), up_bound)?;
        self.execute(plan, creator)
    }

    pub fn withdraw_fee(
        &mut self,
        admin: &dyn Signer,
        sale: &Address,
        destination: Option<Address>,
    ) -> Result<Outcome, BondError> {
        let snapshot = self.get_sale(sale)?;
        let admin_address = admin.address();
        let destination =
            self.token_destination(&admin_address, &snapshot.token_quote, destination)?;
        let plan = plan_withdraw_fee(sale, &snapshot, &admin_address, &destination)?;
        self.execute(plan, admin)
    }

    // ---- reads ----

    pub fn bond_address(
        &self,
        sale: &Address,
        owner: &Address,
        bond_id: u128,
    ) -> Result<Address, BondError> {
        Ok(derive_bond_address(self.program_id(), sale, owner, bond_id)?.0)
    }

    pub fn get_state(&self) -> Result<(Address, SaleState), BondError> {
        query::get_state(&self.ledger, self.program_id())
    }

    pub fn get_sale(&self, address: &Address) -> Result<BondSale, BondError> {
        query::get_sale(&self.ledger, address)
    }

    pub fn get_bond(&self, address: &Address) -> Result<Bond, BondError> {
        query::get_bond(&self.ledger, address)
    }

    pub fn get_sale_by_id(&self, id: u128) -> Result<(Address, BondSale), BondError> {
        query::get_sale_by_id(&self.ledger, self.program_id(), id)
    }

    pub fn get_all_sales(&self) -> Result<Vec<(Address, BondSale)>, BondError> {
        query::get_all_sales(&self.ledger)
    }

    pub fn get_all_bonds_for_sale(
        &self,
        sale: &Address,
    ) -> Result<Vec<(Address, Bond)>, BondError> {
        query::get_all_bonds_for_sale(&self.ledger, sale)
    }

    pub fn get_all_bonds_for_owner_in_sale(
        &self,
        sale: &Address,
        owner: &Address,
    ) -> Result<Vec<(Address, Bond)>, BondError> {
        query::get_all_bonds_for_owner_in_sale(&self.ledger, sale, owner)
    }

    pub fn get_all_bonds_for_owner(
        &self,
        owner: &Address,
    ) -> Result<Vec<(Address, Bond)>, BondError> {
        query::get_all_bonds_for_owner(&self.ledger, owner)
    }

    /// Spot price of a sale at the ledger's current time.
    pub fn current_price(&self, sale: &Address) -> Result<Decimal, BondError> {
        let snapshot = self.get_sale(sale)?;
        current_price(&snapshot, self.ledger.now()?)
    }

    pub fn ceiling_price(&self, sale: &Address) -> Result<Decimal, BondError> {
        let snapshot = self.get_sale(sale)?;
        pricing::ceiling_price(snapshot.up_bound, snapshot.floor_price)
    }

    pub fn quote_buy(
        &self,
        sale: &Address,
        amount: TokenAmount,
        slippage: Option<SignedDecimal>,
    ) -> Result<BuyQuote, BondError> {
        let snapshot = self.get_sale(sale)?;
        quote_buy(
            &snapshot,
            self.ledger.now()?,
            amount,
            slippage.unwrap_or(self.config.default_slippage),
        )
    }

    pub fn claimable(&self, bond: &Address) -> Result<TokenAmount, BondError> {
        let bond = self.get_bond(bond)?;
        claimable_amount(&bond, self.ledger.now()?)
    }

    // ---- polling ----

    pub fn wait_for_state(&self) -> Result<(Address, SaleState), BondError> {
        self.config.retry.poll(|| self.get_state())
    }

    pub fn wait_for_sale(&self, address: &Address) -> Result<BondSale, BondError> {
        self.config.retry.poll(|| self.get_sale(address))
    }

    pub fn wait_for_bond(&self, address: &Address) -> Result<Bond, BondError> {
        self.config.retry.poll(|| self.get_bond(address))
    }
}
