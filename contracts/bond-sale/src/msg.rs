use cosmwasm_schema::cw_serde;
use cosmwasm_std::{attr, Attribute, Binary};

use crate::address::Address;
use crate::math::{Decimal, TokenAmount};

/// Instructions understood by the bond sale program. Each names the
/// identity that must authorize it.
#[cw_serde]
pub enum BondInstruction {
    /// One-time setup of the global state and program authority.
    CreateState { admin: Address },

    /// Opens a sale and moves `supply` bond tokens into its vault.
    InitBondSale {
        creator: Address,
        token_bond: Address,
        token_quote: Address,
        floor_price: Decimal,
        up_bound: Decimal,
        velocity: Decimal,
        supply: TokenAmount,
        /// Seconds from now until the sale's nominal end.
        duration: u64,
        vesting_time: u64,
        bond_vault_seed: Binary,
        quote_vault_seed: Binary,
        creator_bond_account: Address,
    },

    /// Buys `amount` bond tokens; fails if the price at execution exceeds `price_limit`.
    CreateBond {
        buyer: Address,
        sale: Address,
        buyer_quote_account: Address,
        amount: TokenAmount,
        price_limit: Decimal,
    },

    ClaimBond {
        owner: Address,
        sale: Address,
        bond: Address,
        destination: Address,
    },

    /// Creator withdraws the quote proceeds.
    ClaimQuote {
        creator: Address,
        sale: Address,
        destination: Address,
    },

    EndBondSale {
        creator: Address,
        sale: Address,
        bond_destination: Address,
        quote_destination: Address,
        /// Must belong to the admin.
        fee_destination: Address,
    },

    /// Admin only.
    ChangeFee {
        admin: Address,
        sale: Address,
        fee: Decimal,
    },

    ChangeVelocity {
        creator: Address,
        sale: Address,
        velocity: Decimal,
    },

    ChangeUpBound {
        creator: Address,
        sale: Address,
        up_bound: Decimal,
    },

    /// Admin only.
    WithdrawFee {
        admin: Address,
        sale: Address,
        destination: Address,
    },
}

impl BondInstruction {
    /// Identity whose authorization the instruction requires.
    pub fn authority(&self) -> &Address {
        match self {
            BondInstruction::CreateState { admin }
            | BondInstruction::ChangeFee { admin, .. }
            | BondInstruction::WithdrawFee { admin, .. } => admin,
            BondInstruction::InitBondSale { creator, .. }
            | BondInstruction::ClaimQuote { creator, .. }
            | BondInstruction::EndBondSale { creator, .. }
            | BondInstruction::ChangeVelocity { creator, .. }
            | BondInstruction::ChangeUpBound { creator, .. } => creator,
            BondInstruction::CreateBond { buyer, .. } => buyer,
            BondInstruction::ClaimBond { owner, .. } => owner,
        }
    }
}

/// One atomic step of a transaction.
#[cw_serde]
pub enum Step {
    /// Creates the canonical token account of `owner` for `mint`.
    CreateTokenAccount { owner: Address, mint: Address },
    Invoke(BondInstruction),
}

#[cw_serde]
pub struct Transaction {
    pub payer: Address,
    pub steps: Vec<Step>,
}

#[cw_serde]
pub struct Authorization {
    pub signer: Address,
    pub digest: Binary,
}

#[cw_serde]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub authorizations: Vec<Authorization>,
}

/// Outcome of an applied transaction.
#[cw_serde]
pub struct Receipt {
    /// Accounts created, in creation order.
    pub created: Vec<Address>,
    pub attributes: Vec<Attribute>,
}

impl Receipt {
    /// First attribute value under `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Ordered steps for one user action, plus attributes describing the request.
#[cw_serde]
pub struct Plan {
    pub steps: Vec<Step>,
    pub attributes: Vec<Attribute>,
}

impl Plan {
    pub fn new(action: &str) -> Self {
        Plan {
            steps: vec![],
            attributes: vec![attr("action", action)],
        }
    }

    pub fn add_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(attr(key, value));
        self
    }

    pub fn into_transaction(self, payer: Address) -> Transaction {
        Transaction {
            payer,
            steps: self.steps,
        }
    }
}
