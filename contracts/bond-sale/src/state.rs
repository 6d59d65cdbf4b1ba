//! Persisted account layouts.
//!
//! Every account starts with an 8-byte discriminator,
//! `sha256("account:<Name>")[..8]`, followed by its fields in fixed order,
//! integers little-endian. `Decimal` is 16 bytes, `TokenAmount` 8.

use sha2::{Digest, Sha256};

use crate::address::{Address, ADDRESS_LEN};
use crate::error::BondError;
use crate::math::{Decimal, TokenAmount};

pub const DISCRIMINATOR_LEN: usize = 8;

/// Offset of `Bond::sale` (after the discriminator).
pub const BOND_SALE_OFFSET: usize = DISCRIMINATOR_LEN;
/// Offset of `Bond::owner`.
pub const BOND_OWNER_OFFSET: usize = DISCRIMINATOR_LEN + 2 * ADDRESS_LEN;
/// Offset of `BondSale::creator`.
pub const BOND_SALE_CREATOR_OFFSET: usize = DISCRIMINATOR_LEN + 4 * ADDRESS_LEN;

/// Global sale registry, one per deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaleState {
    pub admin: Address,
    pub authority: Address,
    pub next_sale_id: u128,
    /// Bump of the authority address.
    pub nonce: u8,
    /// Bump of the state address.
    pub bump: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BondSale {
    pub token_bond: Address,
    pub token_quote: Address,
    pub token_bond_vault: Address,
    pub token_quote_vault: Address,
    pub creator: Address,
    pub fee: Decimal,
    pub fee_amount: TokenAmount,
    pub floor_price: Decimal,
    pub previous_price: Decimal,
    pub up_bound: Decimal,
    pub velocity: Decimal,
    pub supply: TokenAmount,
    pub remaining_amount: TokenAmount,
    pub quote_amount: TokenAmount,
    pub end_time: u64,
    pub start_time: u64,
    pub last_trade: u64,
    pub vesting_time: u64,
    pub next_bond_id: u128,
    pub id: u128,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bond {
    pub sale: Address,
    pub token_bond: Address,
    pub owner: Address,
    pub bond_amount: TokenAmount,
    pub last_claim: u64,
    pub vesting_start: u64,
    pub vesting_end: u64,
    pub id: u128,
}

/// Fixed-layout binary codec for a persisted account.
pub trait AccountLayout: Sized {
    const NAME: &'static str;
    /// Encoded size including the discriminator.
    const LEN: usize;

    fn write_fields(&self, w: &mut Writer);
    fn read_fields(r: &mut Reader<'_>) -> Self;

    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        discriminator(Self::NAME)
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = Writer(Vec::with_capacity(Self::LEN));
        w.bytes(&Self::discriminator());
        self.write_fields(&mut w);
        w.0
    }

    fn decode(bytes: &[u8]) -> Result<Self, BondError> {
        if bytes.len() != Self::LEN {
            return Err(BondError::schema_mismatch(
                Self::NAME,
                format!("expected {} bytes, got {}", Self::LEN, bytes.len()),
            ));
        }
        if bytes[..DISCRIMINATOR_LEN] != Self::discriminator() {
            return Err(BondError::schema_mismatch(Self::NAME, "discriminator does not match"));
        }
        let mut r = Reader {
            bytes,
            pos: DISCRIMINATOR_LEN,
        };
        Ok(Self::read_fields(&mut r))
    }
}

pub fn discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("account:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

pub struct Writer(Vec<u8>);

impl Writer {
    fn bytes(&mut self, b: &[u8]) {
        self.0.extend_from_slice(b);
    }

    pub fn address(&mut self, a: &Address) {
        self.bytes(a.as_bytes());
    }

    pub fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    pub fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn u128(&mut self, v: u128) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn decimal(&mut self, d: Decimal) {
        self.u128(d.v);
    }

    pub fn amount(&mut self, t: TokenAmount) {
        self.u64(t.v);
    }
}

/// Reads fields from a buffer whose length `decode` has already checked.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    pub fn address(&mut self) -> Address {
        Address::new(self.take::<ADDRESS_LEN>())
    }

    pub fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    pub fn u128(&mut self) -> u128 {
        u128::from_le_bytes(self.take())
    }

    pub fn decimal(&mut self) -> Decimal {
        Decimal::new(self.u128())
    }

    pub fn amount(&mut self) -> TokenAmount {
        TokenAmount::new(self.u64())
    }
}

impl AccountLayout for SaleState {
    const NAME: &'static str = "SaleState";
    const LEN: usize = DISCRIMINATOR_LEN + 2 * ADDRESS_LEN + 16 + 1 + 1;

    fn write_fields(&self, w: &mut Writer) {
        w.address(&self.admin);
        w.address(&self.authority);
        w.u128(self.next_sale_id);
        w.u8(self.nonce);
        w.u8(self.bump);
    }

    fn read_fields(r: &mut Reader<'_>) -> Self {
        SaleState {
            admin: r.address(),
            authority: r.address(),
            next_sale_id: r.u128(),
            nonce: r.u8(),
            bump: r.u8(),
        }
    }
}

impl AccountLayout for BondSale {
    const NAME: &'static str = "BondSale";
    const LEN: usize = DISCRIMINATOR_LEN + 5 * ADDRESS_LEN + 5 * 16 + 4 * 8 + 4 * 8 + 2 * 16;

    fn write_fields(&self, w: &mut Writer) {
        w.address(&self.token_bond);
        w.address(&self.token_quote);
        w.address(&self.token_bond_vault);
        w.address(&self.token_quote_vault);
        w.address(&self.creator);
        w.decimal(self.fee);
        w.amount(self.fee_amount);
        w.decimal(self.floor_price);
        w.decimal(self.previous_price);
        w.decimal(self.up_bound);
        w.decimal(self.velocity);
        w.amount(self.supply);
        w.amount(self.remaining_amount);
        w.amount(self.quote_amount);
        w.u64(self.end_time);
        w.u64(self.start_time);
        w.u64(self.last_trade);
        w.u64(self.vesting_time);
        w.u128(self.next_bond_id);
        w.u128(self.id);
    }

    fn read_fields(r: &mut Reader<'_>) -> Self {
        BondSale {
            token_bond: r.address(),
            token_quote: r.address(),
            token_bond_vault: r.address(),
            token_quote_vault: r.address(),
            creator: r.address(),
            fee: r.decimal(),
            fee_amount: r.amount(),
            floor_price: r.decimal(),
            previous_price: r.decimal(),
            up_bound: r.decimal(),
            velocity: r.decimal(),
            supply: r.amount(),
            remaining_amount: r.amount(),
            quote_amount: r.amount(),
            end_time: r.u64(),
            start_time: r.u64(),
            last_trade: r.u64(),
            vesting_time: r.u64(),
            next_bond_id: r.u128(),
            id: r.u128(),
        }
    }
}

impl AccountLayout for Bond {
    const NAME: &'static str = "Bond";
    const LEN: usize = DISCRIMINATOR_LEN + 3 * ADDRESS_LEN + 8 + 3 * 8 + 16;

    fn write_fields(&self, w: &mut Writer) {
        w.address(&self.sale);
        w.address(&self.token_bond);
        w.address(&self.owner);
        w.amount(self.bond_amount);
        w.u64(self.last_claim);
        w.u64(self.vesting_start);
        w.u64(self.vesting_end);
        w.u128(self.id);
    }

    fn read_fields(r: &mut Reader<'_>) -> Self {
        Bond {
            sale: r.address(),
            token_bond: r.address(),
            owner: r.address(),
            bond_amount: r.amount(),
            last_claim: r.u64(),
            vesting_start: r.u64(),
            vesting_end: r.u64(),
            id: r.u128(),
        }
    }
}

/// Decodes raw account data, mapping an absent account to `AccountNotFound`.
pub fn decode_account<T: AccountLayout>(
    address: &Address,
    data: Option<&[u8]>,
) -> Result<T, BondError> {
    match data {
        Some(bytes) => T::decode(bytes),
        None => Err(BondError::account_not_found(address)),
    }
}
