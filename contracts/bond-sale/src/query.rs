use cosmwasm_schema::cw_serde;
use cosmwasm_std::Binary;

use crate::address::{derive_sale_address, derive_state_address, Address};
use crate::error::BondError;
use crate::ledger::Ledger;
use crate::state::{
    decode_account, AccountLayout, Bond, BondSale, SaleState, BOND_OWNER_OFFSET, BOND_SALE_OFFSET,
};

/// Server-side predicate over raw account data.
#[cw_serde]
pub enum AccountFilter {
    /// Data at `offset` equals `bytes`.
    Memcmp { offset: u64, bytes: Binary },
    /// Data is exactly this long.
    DataSize(u64),
}

impl AccountFilter {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::Memcmp { offset, bytes } => {
                let start = *offset as usize;
                start
                    .checked_add(bytes.len())
                    .and_then(|end| data.get(start..end))
                    .map_or(false, |window| window == bytes.as_slice())
            }
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

pub fn encode_filter(offset: usize, value: &[u8]) -> AccountFilter {
    AccountFilter::Memcmp {
        offset: offset as u64,
        bytes: Binary::from(value),
    }
}

/// Every account of layout `T`.
pub fn layout_filters<T: AccountLayout>() -> Vec<AccountFilter> {
    vec![
        AccountFilter::DataSize(T::LEN as u64),
        encode_filter(0, &T::discriminator()),
    ]
}

pub fn bonds_for_sale_filters(sale: &Address) -> Vec<AccountFilter> {
    let mut filters = layout_filters::<Bond>();
    filters.push(encode_filter(BOND_SALE_OFFSET, sale.as_bytes()));
    filters
}

pub fn bonds_for_owner_filters(owner: &Address) -> Vec<AccountFilter> {
    let mut filters = layout_filters::<Bond>();
    filters.push(encode_filter(BOND_OWNER_OFFSET, owner.as_bytes()));
    filters
}

pub fn bonds_for_owner_in_sale_filters(sale: &Address, owner: &Address) -> Vec<AccountFilter> {
    let mut filters = bonds_for_sale_filters(sale);
    filters.push(encode_filter(BOND_OWNER_OFFSET, owner.as_bytes()));
    filters
}

fn load<T: AccountLayout, L: Ledger + ?Sized>(
    ledger: &L,
    address: &Address,
) -> Result<T, BondError> {
    let data = ledger.get_account(address)?;
    decode_account(address, data.as_ref().map(|d| d.as_slice()))
}

fn load_all<T: AccountLayout, L: Ledger + ?Sized>(
    ledger: &L,
    filters: &[AccountFilter],
) -> Result<Vec<(Address, T)>, BondError> {
    ledger
        .get_program_accounts(filters)?
        .into_iter()
        .map(|(address, data)| Ok((address, T::decode(data.as_slice())?)))
        .collect()
}

pub fn get_state<L: Ledger + ?Sized>(
    ledger: &L,
    program_id: &Address,
) -> Result<(Address, SaleState), BondError> {
    let (address, _) = derive_state_address(program_id)?;
    Ok((address, load(ledger, &address)?))
}

pub fn get_sale<L: Ledger + ?Sized>(ledger: &L, address: &Address) -> Result<BondSale, BondError> {
    load(ledger, address)
}

pub fn get_bond<L: Ledger + ?Sized>(ledger: &L, address: &Address) -> Result<Bond, BondError> {
    load(ledger, address)
}

pub fn get_sale_by_id<L: Ledger + ?Sized>(
    ledger: &L,
    program_id: &Address,
    id: u128,
) -> Result<(Address, BondSale), BondError> {
    let (address, _) = derive_sale_address(program_id, id)?;
    Ok((address, get_sale(ledger, &address)?))
}

pub fn get_all_sales<L: Ledger + ?Sized>(
    ledger: &L,
) -> Result<Vec<(Address, BondSale)>, BondError> {
    load_all(ledger, &layout_filters::<BondSale>())
}

pub fn get_all_bonds_for_sale<L: Ledger + ?Sized>(
    ledger: &L,
    sale: &Address,
) -> Result<Vec<(Address, Bond)>, BondError> {
    load_all(ledger, &bonds_for_sale_filters(sale))
}

pub fn get_all_bonds_for_owner_in_sale<L: Ledger + ?Sized>(
    ledger: &L,
    sale: &Address,
    owner: &Address,
) -> Result<Vec<(Address, Bond)>, BondError> {
    load_all(ledger, &bonds_for_owner_in_sale_filters(sale, owner))
}

pub fn get_all_bonds_for_owner<L: Ledger + ?Sized>(
    ledger: &L,
    owner: &Address,
) -> Result<Vec<(Address, Bond)>, BondError> {
    load_all(ledger, &bonds_for_owner_filters(owner))
}
