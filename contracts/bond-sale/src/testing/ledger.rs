use std::cell::RefCell;
use std::collections::BTreeMap;

use cosmwasm_std::testing::MockStorage;
use cosmwasm_std::{Binary, Order, Record, Storage, Timestamp};
use cw_storage_plus::Map;

use crate::address::{derive_state_address, derive_token_account, Address};
use crate::config::ClientConfig;
use crate::error::BondError;
use crate::ledger::{authorization_digest, Ledger, TokenAccount};
use crate::math::TokenAmount;
use crate::msg::{Receipt, SignedTransaction};
use crate::query::AccountFilter;
use crate::state::{AccountLayout, SaleState};
use crate::testing::execute::apply_step;

// ---- Storage keys ----

const ACCOUNTS: Map<&[u8], Binary> = Map::new("accounts");
const TOKEN_ACCOUNTS: Map<&[u8], TokenAccount> = Map::new("token_accounts");

/// 2024-01-01T00:00:00Z
pub const GENESIS_SECONDS: u64 = 1_704_067_200;

/// Single-node ledger running the bond sale program in memory.
///
/// Transactions apply atomically against a block clock the test moves
/// forward. With a visibility lag, accounts created by a transaction stay
/// invisible to the next `lag` reads of each.
pub struct MockLedger {
    storage: MockStorage,
    block_time: Timestamp,
    program_id: Address,
    token_program_id: Address,
    visibility_lag: u32,
    hidden: RefCell<BTreeMap<Address, u32>>,
    created: Vec<Address>,
}

impl MockLedger {
    pub fn new(program_id: Address, token_program_id: Address) -> Self {
        MockLedger {
            storage: MockStorage::new(),
            block_time: Timestamp::from_seconds(GENESIS_SECONDS),
            program_id,
            token_program_id,
            visibility_lag: 0,
            hidden: RefCell::new(BTreeMap::new()),
            created: vec![],
        }
    }

    pub fn for_config(config: &ClientConfig) -> Self {
        Self::new(config.program_id, config.token_program_id)
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    pub fn block_time(&self) -> Timestamp {
        self.block_time
    }

    pub fn set_block_time(&mut self, time: Timestamp) {
        self.block_time = time;
    }

    pub fn advance_seconds(&mut self, seconds: u64) {
        self.block_time = self.block_time.plus_seconds(seconds);
    }

    pub fn set_visibility_lag(&mut self, reads: u32) {
        self.visibility_lag = reads;
    }

    /// Credits `amount` of `mint` to the owner's canonical account, opening it if needed.
    pub fn mint_to(
        &mut self,
        owner: &Address,
        mint: &Address,
        amount: u64,
    ) -> Result<Address, BondError> {
        let address = self.canonical_token_account(owner, mint)?;
        let mut account = match self.token_account(&address) {
            Ok(account) => account,
            Err(_) => {
                self.create_token_account(&address, owner, mint)?;
                self.token_account(&address)?
            }
        };
        account.amount = account.amount.checked_add(TokenAmount::new(amount))?;
        self.save_token_account(&address, &account)?;
        Ok(address)
    }

    /// Balance regardless of visibility; zero for a missing account.
    pub fn balance(&self, address: &Address) -> TokenAmount {
        self.token_account(address)
            .map(|account| account.amount)
            .unwrap_or_default()
    }

    /// Raw account data regardless of visibility.
    pub fn raw_account(&self, address: &Address) -> Option<Binary> {
        ACCOUNTS.may_load(&self.storage, address.as_bytes().as_slice()).ok().flatten()
    }

    // ---- program-side access, used while executing ----

    pub(crate) fn now_seconds(&self) -> u64 {
        self.block_time.seconds()
    }

    pub(crate) fn canonical_token_account(
        &self,
        owner: &Address,
        mint: &Address,
    ) -> Result<Address, BondError> {
        derive_token_account(&self.token_program_id, owner, mint)
    }

    fn exists(&self, address: &Address) -> Result<bool, BondError> {
        let key = address.as_bytes().as_slice();
        Ok(ACCOUNTS.has(&self.storage, key) || TOKEN_ACCOUNTS.has(&self.storage, key))
    }

    pub(crate) fn load<T: AccountLayout>(&self, address: &Address) -> Result<T, BondError> {
        let data = ACCOUNTS
            .may_load(&self.storage, address.as_bytes().as_slice())?
            .ok_or_else(|| BondError::account_not_found(address))?;
        T::decode(data.as_slice())
    }

    pub(crate) fn load_state(&self) -> Result<SaleState, BondError> {
        let (address, _) = derive_state_address(&self.program_id)?;
        self.load(&address)
    }

    pub(crate) fn store<T: AccountLayout>(
        &mut self,
        address: &Address,
        account: &T,
    ) -> Result<(), BondError> {
        ACCOUNTS.save(
            &mut self.storage,
            address.as_bytes().as_slice(),
            &Binary::from(account.encode()),
        )?;
        Ok(())
    }

    pub(crate) fn create<T: AccountLayout>(
        &mut self,
        address: &Address,
        account: &T,
    ) -> Result<(), BondError> {
        if self.exists(address)? {
            return Err(BondError::AccountAlreadyExists {
                address: address.to_string(),
            });
        }
        self.store(address, account)?;
        self.created.push(*address);
        Ok(())
    }

    pub(crate) fn close(&mut self, address: &Address) {
        ACCOUNTS.remove(&mut self.storage, address.as_bytes().as_slice());
    }

    pub(crate) fn token_account(&self, address: &Address) -> Result<TokenAccount, BondError> {
        TOKEN_ACCOUNTS
            .may_load(&self.storage, address.as_bytes().as_slice())?
            .ok_or_else(|| BondError::account_not_found(address))
    }

    fn save_token_account(
        &mut self,
        address: &Address,
        account: &TokenAccount,
    ) -> Result<(), BondError> {
        TOKEN_ACCOUNTS.save(&mut self.storage, address.as_bytes().as_slice(), account)?;
        Ok(())
    }

    pub(crate) fn create_token_account(
        &mut self,
        address: &Address,
        owner: &Address,
        mint: &Address,
    ) -> Result<(), BondError> {
        if self.exists(address)? {
            return Err(BondError::AccountAlreadyExists {
                address: address.to_string(),
            });
        }
        let account = TokenAccount {
            mint: *mint,
            owner: *owner,
            amount: TokenAmount::new(0),
        };
        self.save_token_account(address, &account)?;
        self.created.push(*address);
        Ok(())
    }

    /// Loads a token account and checks its mint, and its owner when given.
    pub(crate) fn expect_token_account(
        &self,
        address: &Address,
        mint: &Address,
        owner: Option<&Address>,
    ) -> Result<TokenAccount, BondError> {
        let account = self.token_account(address)?;
        if account.mint != *mint || owner.map_or(false, |owner| account.owner != *owner) {
            return Err(BondError::InvalidTokenAccount {
                account: address.to_string(),
                expected: mint.to_string(),
            });
        }
        Ok(account)
    }

    pub(crate) fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), BondError> {
        let mut source = self.token_account(from)?;
        let mut target = self.token_account(to)?;
        if source.mint != target.mint {
            return Err(BondError::InvalidTokenAccount {
                account: to.to_string(),
                expected: source.mint.to_string(),
            });
        }
        if from == to {
            return Ok(());
        }
        if source.amount < amount {
            return Err(BondError::InsufficientFunds {
                account: from.to_string(),
                need: amount.v,
                have: source.amount.v,
            });
        }
        source.amount = source.amount.checked_sub(amount)?;
        target.amount = target.amount.checked_add(amount)?;
        self.save_token_account(from, &source)?;
        self.save_token_account(to, &target)
    }

    // ---- transaction plumbing ----

    fn snapshot(&self) -> Vec<Record> {
        self.storage.range(None, None, Order::Ascending).collect()
    }

    fn restore(&mut self, snapshot: Vec<Record>) {
        let mut storage = MockStorage::new();
        for (key, value) in snapshot {
            storage.set(&key, &value);
        }
        self.storage = storage;
    }

    /// Signers whose authorization matches the transaction. The payer must be one.
    fn verify(&self, signed: &SignedTransaction) -> Result<Vec<Address>, BondError> {
        let mut signers = Vec::with_capacity(signed.authorizations.len());
        for auth in &signed.authorizations {
            if auth.digest != authorization_digest(&signed.tx, &auth.signer)? {
                return Err(BondError::Unauthorized);
            }
            signers.push(auth.signer);
        }
        if !signers.contains(&signed.tx.payer) {
            return Err(BondError::Unauthorized);
        }
        Ok(signers)
    }

    fn visible(&self, address: &Address) -> bool {
        let mut hidden = self.hidden.borrow_mut();
        match hidden.get_mut(address) {
            Some(reads) if *reads > 0 => {
                *reads -= 1;
                false
            }
            Some(_) => {
                hidden.remove(address);
                true
            }
            None => true,
        }
    }
}

impl Ledger for MockLedger {
    fn now(&self) -> Result<u64, BondError> {
        Ok(self.now_seconds())
    }

    fn get_account(&self, address: &Address) -> Result<Option<Binary>, BondError> {
        let data = ACCOUNTS.may_load(&self.storage, address.as_bytes().as_slice())?;
        Ok(data.filter(|_| self.visible(address)))
    }

    fn get_program_accounts(
        &self,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Address, Binary)>, BondError> {
        let mut accounts = vec![];
        for item in ACCOUNTS.range(&self.storage, None, None, Order::Ascending) {
            let (key, data) = item?;
            if !filters.iter().all(|filter| filter.matches(data.as_slice())) {
                continue;
            }
            let address = Address::try_from(key.as_slice())?;
            if self.visible(&address) {
                accounts.push((address, data));
            }
        }
        Ok(accounts)
    }

    fn get_token_account(&self, address: &Address) -> Result<Option<TokenAccount>, BondError> {
        let account = TOKEN_ACCOUNTS.may_load(&self.storage, address.as_bytes().as_slice())?;
        Ok(account.filter(|_| self.visible(address)))
    }

    fn submit(&mut self, signed: SignedTransaction) -> Result<Receipt, BondError> {
        let signers = self.verify(&signed)?;
        let snapshot = self.snapshot();
        self.created.clear();

        let mut receipt = Receipt {
            created: vec![],
            attributes: vec![],
        };
        for step in &signed.tx.steps {
            match apply_step(self, &signers, step) {
                Ok(response) => receipt.attributes.extend(response.attributes),
                Err(err) => {
                    self.restore(snapshot);
                    self.created.clear();
                    return Err(err);
                }
            }
        }

        receipt.created = std::mem::take(&mut self.created);
        if self.visibility_lag > 0 {
            let mut hidden = self.hidden.borrow_mut();
            for address in &receipt.created {
                hidden.insert(*address, self.visibility_lag);
            }
        }
        Ok(receipt)
    }
}
