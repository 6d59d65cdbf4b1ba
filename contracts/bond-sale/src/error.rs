use cosmwasm_std::{DivideByZeroError, OverflowError, StdError};
use thiserror::Error;

/// Ledger program error codes, as reported by the bond sale program.
pub const CODE_INVALID_POOL_TOKEN_ADDRESSES: u32 = 6000;
pub const CODE_INSUFFICIENT_TOKEN_AMOUNT: u32 = 6001;
pub const CODE_VESTING_ENDED: u32 = 6002;
pub const CODE_PRICE_LIMIT_EXCEEDED: u32 = 6003;

#[derive(Error, Debug, PartialEq)]
pub enum BondError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    ArithmeticOverflow(#[from] OverflowError),

    #[error("{0}")]
    DivisionByZero(#[from] DivideByZeroError),

    #[error("Account not found: {address}")]
    AccountNotFound { address: String },

    #[error("Account already exists: {address}")]
    AccountAlreadyExists { address: String },

    #[error("Schema mismatch: expected {expected}, {reason}")]
    SchemaMismatch { expected: String, reason: String },

    #[error("Actual price exceeded price limit: price {price}, limit {limit}")]
    PriceLimitExceeded { price: String, limit: String },

    #[error("Buy amount exceeds remaining amount: requested {requested}, remaining {remaining}")]
    InsufficientRemainingSupply { requested: u64, remaining: u64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient funds in {account}: need {need}, have {have}")]
    InsufficientFunds {
        account: String,
        need: u64,
        have: u64,
    },

    #[error("Invalid token account {account}: expected mint {expected}")]
    InvalidTokenAccount { account: String, expected: String },

    #[error("Invalid sale parameters: {reason}")]
    InvalidSaleParameters { reason: String },

    #[error("Invalid slippage: {slippage} would make the price limit negative")]
    InvalidSlippage { slippage: String },

    #[error("Invalid seed: {reason}")]
    InvalidSeed { reason: String },

    #[error("Unable to find a valid program address")]
    AddressDerivationExhausted,

    #[error("Nothing to claim for bond {id}")]
    NothingToClaim { id: u128 },
}

impl BondError {
    pub fn account_not_found(address: impl ToString) -> Self {
        BondError::AccountNotFound {
            address: address.to_string(),
        }
    }

    pub fn schema_mismatch(expected: &str, reason: impl Into<String>) -> Self {
        BondError::SchemaMismatch {
            expected: expected.to_string(),
            reason: reason.into(),
        }
    }

    /// Conditions the caller may act on (retry, re-quote, resize) rather
    /// than bugs or version skew.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BondError::AccountNotFound { .. }
                | BondError::PriceLimitExceeded { .. }
                | BondError::InsufficientRemainingSupply { .. }
                | BondError::NothingToClaim { .. }
        )
    }

    /// Only a missing account can clear up by itself (eventual visibility).
    pub fn is_transient(&self) -> bool {
        matches!(self, BondError::AccountNotFound { .. })
    }

    pub fn ledger_code(&self) -> Option<u32> {
        match self {
            BondError::InvalidTokenAccount { .. } => Some(CODE_INVALID_POOL_TOKEN_ADDRESSES),
            BondError::InsufficientRemainingSupply { .. } => Some(CODE_INSUFFICIENT_TOKEN_AMOUNT),
            BondError::NothingToClaim { .. } => Some(CODE_VESTING_ENDED),
            BondError::PriceLimitExceeded { .. } => Some(CODE_PRICE_LIMIT_EXCEEDED),
            _ => None,
        }
    }
}
