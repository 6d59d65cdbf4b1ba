//! Seams to the external ledger and to whoever signs for an identity.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_vec, Binary};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::BondError;
use crate::math::TokenAmount;
use crate::msg::{Authorization, Receipt, SignedTransaction, Transaction};
use crate::query::AccountFilter;

#[cw_serde]
pub struct TokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: TokenAmount,
}

/// Request/response access to the ledger that owns all account state.
///
/// Reads may lag behind submissions: an account created by an applied
/// transaction can be missing from reads for a while.
pub trait Ledger {
    /// The ledger's notion of the current time, in unix seconds.
    fn now(&self) -> Result<u64, BondError>;

    /// Raw data of a program account.
    fn get_account(&self, address: &Address) -> Result<Option<Binary>, BondError>;

    /// Program accounts whose data passes every filter.
    fn get_program_accounts(
        &self,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Address, Binary)>, BondError>;

    fn get_token_account(&self, address: &Address) -> Result<Option<TokenAccount>, BondError>;

    /// Applies every step of the transaction, or none of them.
    fn submit(&mut self, tx: SignedTransaction) -> Result<Receipt, BondError>;
}

/// Capability to authorize transactions for one identity.
pub trait Signer {
    fn address(&self) -> Address;

    fn authorize(&self, tx: &Transaction) -> Result<Authorization, BondError>;
}

/// Digest binding a transaction to the identity authorizing it.
pub fn authorization_digest(tx: &Transaction, signer: &Address) -> Result<Binary, BondError> {
    let mut hasher = Sha256::new();
    hasher.update(to_json_vec(tx)?);
    hasher.update(signer.as_bytes());
    Ok(Binary::from(hasher.finalize().to_vec()))
}

/// Signer for an identity held in-process, such as a local keypair or a
/// test account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalSigner {
    address: Address,
}

impl LocalSigner {
    pub fn new(address: Address) -> Self {
        LocalSigner { address }
    }
}

impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn authorize(&self, tx: &Transaction) -> Result<Authorization, BondError> {
        Ok(Authorization {
            signer: self.address,
            digest: authorization_digest(tx, &self.address)?,
        })
    }
}

/// Signs `tx` with each signer, in order.
pub fn sign(tx: Transaction, signers: &[&dyn Signer]) -> Result<SignedTransaction, BondError> {
    let authorizations = signers
        .iter()
        .map(|signer| signer.authorize(&tx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SignedTransaction { tx, authorizations })
}
