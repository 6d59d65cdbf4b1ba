use cosmwasm_schema::cw_serde;
use cosmwasm_std::from_json;

use crate::address::Address;
use crate::error::BondError;
use crate::math::SignedDecimal;
use crate::retry::RetryPolicy;

/// Deployed bond sale program, same id on every network.
pub const BONDS_PROGRAM_ID: Address = Address::new([
    0x14, 0x89, 0x47, 0x60, 0x21, 0x8d, 0x0c, 0x61, 0xf8, 0xb1, 0xbd, 0xbe, 0x32, 0xc1, 0x5c, 0xbf,
    0x8e, 0x3a, 0xad, 0x35, 0x41, 0x02, 0x4f, 0x44, 0x1d, 0x60, 0x5f, 0xb2, 0x54, 0xf4, 0x13, 0x39,
]);

pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// 1% in raw 12-digit fixed point.
const DEFAULT_SLIPPAGE: SignedDecimal = SignedDecimal::new(10_000_000_000);

#[cw_serde]
pub enum Network {
    Local,
    Dev,
}

impl Network {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Network::Local => "http://127.0.0.1:8899",
            Network::Dev => "https://api.devnet.solana.com",
        }
    }

    pub fn program_id(&self) -> Address {
        match self {
            Network::Local | Network::Dev => BONDS_PROGRAM_ID,
        }
    }
}

#[cw_serde]
pub struct ClientConfig {
    pub network: Network,
    pub endpoint: String,
    pub program_id: Address,
    pub token_program_id: Address,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Tolerance applied by `buy` when the caller gives none.
    #[serde(default = "default_slippage")]
    pub default_slippage: SignedDecimal,
}

fn default_slippage() -> SignedDecimal {
    DEFAULT_SLIPPAGE
}

impl ClientConfig {
    pub fn for_network(network: Network) -> Self {
        ClientConfig {
            endpoint: network.default_endpoint().to_string(),
            program_id: network.program_id(),
            token_program_id: TOKEN_PROGRAM_ID,
            retry: RetryPolicy::default(),
            default_slippage: DEFAULT_SLIPPAGE,
            network,
        }
    }

    pub fn from_json(data: impl AsRef<[u8]>) -> Result<Self, BondError> {
        let config: ClientConfig = from_json(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BondError> {
        if self.default_slippage.one_plus().is_none() {
            return Err(BondError::InvalidSlippage {
                slippage: self.default_slippage.to_string(),
            });
        }
        if self.program_id == self.token_program_id {
            return Err(BondError::InvalidSaleParameters {
                reason: "program id and token program id must differ".to_string(),
            });
        }
        Ok(())
    }
}
