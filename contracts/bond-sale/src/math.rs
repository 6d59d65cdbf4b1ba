//! Fixed-point decimal arithmetic shared by pricing and vesting.
//!
//! `Decimal` is an unsigned magnitude scaled by `10^SCALE`. Products and
//! quotients are computed through a 256-bit intermediate and truncated toward
//! zero unless the `_up` variant is used.

use std::fmt;
use std::str::FromStr;

use cosmwasm_std::{DivideByZeroError, OverflowError, OverflowOperation, Uint128, Uint256};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BondError;

pub const SCALE: u8 = 12;
pub const DENOMINATOR: u128 = 1_000_000_000_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal {
    pub v: u128,
}

#[derive(
    Serialize,
    Deserialize,
    JsonSchema,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct TokenAmount {
    pub v: u64,
}

/// Signed fraction used only for slippage tolerances at the API boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedDecimal {
    pub v: i128,
}

fn pow10(exponent: u8) -> Result<u128, BondError> {
    10u128
        .checked_pow(exponent.into())
        .ok_or_else(|| OverflowError::new(OverflowOperation::Pow, 10u8, exponent).into())
}

fn narrow(value: Uint256) -> Result<u128, BondError> {
    Uint128::try_from(value)
        .map(|v| v.u128())
        .map_err(|_| OverflowError::new(OverflowOperation::Mul, value, Uint128::MAX).into())
}

impl Decimal {
    pub const fn new(v: u128) -> Self {
        Decimal { v }
    }

    pub const fn one() -> Self {
        Decimal { v: DENOMINATOR }
    }

    pub const fn zero() -> Self {
        Decimal { v: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.v == 0
    }

    pub fn from_integer(integer: u128) -> Result<Self, BondError> {
        Ok(Decimal::new(integer.checked_mul(DENOMINATOR).ok_or_else(
            || OverflowError::new(OverflowOperation::Mul, integer, DENOMINATOR),
        )?))
    }

    /// `val * 10^-scale`, e.g. `from_decimal(25, 3)` is 0.025.
    pub fn from_decimal(val: u128, scale: u8) -> Result<Self, BondError> {
        if scale <= SCALE {
            let factor = pow10(SCALE - scale)?;
            Ok(Decimal::new(val.checked_mul(factor).ok_or_else(|| {
                OverflowError::new(OverflowOperation::Mul, val, factor)
            })?))
        } else {
            Ok(Decimal::new(val / pow10(scale - SCALE)?))
        }
    }

    pub fn from_token_amount(amount: TokenAmount) -> Self {
        // u64::MAX * 10^12 fits in u128
        Decimal::new(u128::from(amount.v) * DENOMINATOR)
    }

    pub fn checked_add(self, other: Decimal) -> Result<Self, BondError> {
        Ok(Decimal::new(self.v.checked_add(other.v).ok_or_else(|| {
            OverflowError::new(OverflowOperation::Add, self.v, other.v)
        })?))
    }

    pub fn checked_sub(self, other: Decimal) -> Result<Self, BondError> {
        Ok(Decimal::new(self.v.checked_sub(other.v).ok_or_else(|| {
            OverflowError::new(OverflowOperation::Sub, self.v, other.v)
        })?))
    }

    pub fn checked_mul(self, other: Decimal) -> Result<Self, BondError> {
        let product = Uint256::from(self.v).checked_mul(Uint256::from(other.v))?;
        Ok(Decimal::new(narrow(product.checked_div(Uint256::from(DENOMINATOR))?)?))
    }

    pub fn checked_mul_up(self, other: Decimal) -> Result<Self, BondError> {
        let product = Uint256::from(self.v)
            .checked_mul(Uint256::from(other.v))?
            .checked_add(Uint256::from(DENOMINATOR - 1))?;
        Ok(Decimal::new(narrow(product.checked_div(Uint256::from(DENOMINATOR))?)?))
    }

    pub fn checked_div(self, other: Decimal) -> Result<Self, BondError> {
        if other.is_zero() {
            return Err(DivideByZeroError::new(self.v).into());
        }
        let scaled = Uint256::from(self.v).checked_mul(Uint256::from(DENOMINATOR))?;
        Ok(Decimal::new(narrow(scaled.checked_div(Uint256::from(other.v))?)?))
    }

    pub fn checked_div_up(self, other: Decimal) -> Result<Self, BondError> {
        if other.is_zero() {
            return Err(DivideByZeroError::new(self.v).into());
        }
        let scaled = Uint256::from(self.v)
            .checked_mul(Uint256::from(DENOMINATOR))?
            .checked_add(Uint256::from(other.v - 1))?;
        Ok(Decimal::new(narrow(scaled.checked_div(Uint256::from(other.v))?)?))
    }

    pub fn to_token_floor(self) -> Result<TokenAmount, BondError> {
        let whole = self.v / DENOMINATOR;
        u64::try_from(whole)
            .map(TokenAmount::new)
            .map_err(|_| OverflowError::new(OverflowOperation::Mul, whole, u64::MAX).into())
    }

    pub fn to_token_ceil(self) -> Result<TokenAmount, BondError> {
        let whole = self.v / DENOMINATOR + u128::from(self.v % DENOMINATOR != 0);
        u64::try_from(whole)
            .map(TokenAmount::new)
            .map_err(|_| OverflowError::new(OverflowOperation::Mul, whole, u64::MAX).into())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.v / DENOMINATOR;
        let fraction = self.v % DENOMINATOR;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:012}", fraction);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Decimal {
    type Err = BondError;

    /// Parses the raw scaled magnitude, the same form `Serialize` emits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Decimal::new).map_err(|e| {
            cosmwasm_std::StdError::parse_err("Decimal", e.to_string()).into()
        })
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.v.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Decimal::new)
            .map_err(|e| de::Error::custom(format!("invalid decimal '{raw}': {e}")))
    }
}

impl JsonSchema for Decimal {
    fn schema_name() -> String {
        "Decimal".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

impl TokenAmount {
    pub const fn new(v: u64) -> Self {
        TokenAmount { v }
    }

    pub fn is_zero(&self) -> bool {
        self.v == 0
    }

    pub fn checked_add(self, other: TokenAmount) -> Result<Self, BondError> {
        Ok(TokenAmount::new(self.v.checked_add(other.v).ok_or_else(|| {
            OverflowError::new(OverflowOperation::Add, self.v, other.v)
        })?))
    }

    pub fn checked_sub(self, other: TokenAmount) -> Result<Self, BondError> {
        Ok(TokenAmount::new(self.v.checked_sub(other.v).ok_or_else(|| {
            OverflowError::new(OverflowOperation::Sub, self.v, other.v)
        })?))
    }

    /// `self / total` as a fixed-point fraction.
    pub fn percent(self, total: TokenAmount) -> Result<Decimal, BondError> {
        if total.is_zero() {
            return Err(DivideByZeroError::new(self.v).into());
        }
        Ok(Decimal::new(
            u128::from(self.v) * DENOMINATOR / u128::from(total.v),
        ))
    }

    /// `self * price`, truncated to whole units.
    pub fn mul_floor(self, price: Decimal) -> Result<TokenAmount, BondError> {
        Decimal::from_token_amount(self).checked_mul(price)?.to_token_floor()
    }

    /// `self * price`, rounded up to whole units.
    pub fn mul_ceil(self, price: Decimal) -> Result<TokenAmount, BondError> {
        Decimal::from_token_amount(self)
            .checked_mul_up(price)?
            .to_token_ceil()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.v)
    }
}

impl SignedDecimal {
    pub const fn new(v: i128) -> Self {
        SignedDecimal { v }
    }

    /// `val * 10^-scale`; negative values lower a price ceiling.
    pub fn from_decimal(val: i128, scale: u8) -> Result<Self, BondError> {
        if scale <= SCALE {
            let factor = pow10(SCALE - scale)? as i128;
            Ok(SignedDecimal::new(val.checked_mul(factor).ok_or_else(|| {
                OverflowError::new(OverflowOperation::Mul, val, factor)
            })?))
        } else {
            Ok(SignedDecimal::new(val / pow10(scale - SCALE)? as i128))
        }
    }

    pub fn is_negative(&self) -> bool {
        self.v < 0
    }

    /// `1 + self` as an unsigned factor, or `None` when it would be negative.
    pub fn one_plus(self) -> Option<Decimal> {
        let factor = (DENOMINATOR as i128).checked_add(self.v)?;
        u128::try_from(factor).ok().map(Decimal::new)
    }
}

impl fmt::Display for SignedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.v < 0 { "-" } else { "" };
        write!(f, "{}{}", sign, Decimal::new(self.v.unsigned_abs()))
    }
}

impl Serialize for SignedDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.v.to_string())
    }
}

impl<'de> Deserialize<'de> for SignedDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i128>()
            .map(SignedDecimal::new)
            .map_err(|e| de::Error::custom(format!("invalid signed decimal '{raw}': {e}")))
    }
}

impl JsonSchema for SignedDecimal {
    fn schema_name() -> String {
        "SignedDecimal".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, BondError> {
    a.checked_mul(b)
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, BondError> {
    a.checked_div(b)
}

/// `integer * SCALE / 10^exponent`.
pub fn to_decimal(integer: u128, exponent: u8) -> Result<Decimal, BondError> {
    Decimal::from_decimal(integer, exponent)
}

/// `integer * 10^exponent`; promotes timestamps into fixed point with
/// `exponent = SCALE`.
pub fn to_scale(integer: u64, exponent: u8) -> Result<u128, BondError> {
    let factor = pow10(exponent)?;
    u128::from(integer)
        .checked_mul(factor)
        .ok_or_else(|| OverflowError::new(OverflowOperation::Mul, integer, factor).into())
}
