use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::BondError;

pub const ADDRESS_LEN: usize = 32;
pub const MAX_SEED_LEN: usize = 32;
pub const MAX_SEEDS: usize = 16;

/// Program authority that owns every vault.
pub const AUTHORITY_SEED: &[u8] = b"Bonds";
pub const STATE_SEED: &[u8] = b"statev1";
pub const SALE_SEED: &[u8] = b"salev1";
pub const BOND_SEED: &[u8] = b"bondv1";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// 32-byte account address. Serialized as lowercase hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, BondError> {
        let bytes = hex::decode(s).map_err(|e| BondError::InvalidSeed {
            reason: format!("invalid address hex '{s}': {e}"),
        })?;
        Self::try_from(bytes.as_slice())
    }

    /// Deterministic test/identity address from a label.
    pub fn from_label(label: &str) -> Self {
        Address(Sha256::digest(label.as_bytes()).into())
    }

    pub fn is_default(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = BondError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| BondError::InvalidSeed {
            reason: format!("address must be {ADDRESS_LEN} bytes, got {}", bytes.len()),
        })?;
        Ok(Address(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = BondError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::from_hex(&raw).map_err(de::Error::custom)
    }
}

impl JsonSchema for Address {
    fn schema_name() -> String {
        "Address".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// Hashes `seeds || program_id || marker` into an address. Fails on
/// oversized seeds or when the digest lands on a reserved address.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, BondError> {
    if seeds.len() > MAX_SEEDS {
        return Err(BondError::InvalidSeed {
            reason: format!("at most {MAX_SEEDS} seeds, got {}", seeds.len()),
        });
    }
    let mut hasher = Sha256::new();
    for seed in seeds {
        if seed.len() > MAX_SEED_LEN {
            return Err(BondError::InvalidSeed {
                reason: format!("seed longer than {MAX_SEED_LEN} bytes"),
            });
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let candidate = Address(hasher.finalize().into());

    if candidate.is_default() || candidate == *program_id {
        return Err(BondError::AddressDerivationExhausted);
    }
    Ok(candidate)
}

/// Searches bumps from 255 down and returns the first usable address.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), BondError> {
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(BondError::AddressDerivationExhausted) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(BondError::AddressDerivationExhausted)
}

/// Authority over every sale vault; its bump is the state's `nonce`.
pub fn derive_authority(program_id: &Address) -> Result<(Address, u8), BondError> {
    find_program_address(&[AUTHORITY_SEED], program_id)
}

pub fn derive_state_address(program_id: &Address) -> Result<(Address, u8), BondError> {
    find_program_address(&[STATE_SEED], program_id)
}

pub fn derive_sale_address(
    program_id: &Address,
    sale_id: u128,
) -> Result<(Address, u8), BondError> {
    find_program_address(&[SALE_SEED, &sale_id.to_le_bytes()], program_id)
}

pub fn derive_vault_address(
    program_id: &Address,
    sale: &Address,
    vault_seed: &[u8],
) -> Result<(Address, u8), BondError> {
    find_program_address(&[vault_seed, sale.as_bytes()], program_id)
}

pub fn derive_bond_address(
    program_id: &Address,
    sale: &Address,
    owner: &Address,
    bond_id: u128,
) -> Result<(Address, u8), BondError> {
    find_program_address(
        &[BOND_SEED, sale.as_bytes(), owner.as_bytes(), &bond_id.to_le_bytes()],
        program_id,
    )
}

/// Canonical token account of `owner` for `mint`, addressed under the token program.
pub fn derive_token_account(
    token_program_id: &Address,
    owner: &Address,
    mint: &Address,
) -> Result<Address, BondError> {
    Ok(find_program_address(&[owner.as_bytes(), mint.as_bytes()], token_program_id)?.0)
}
