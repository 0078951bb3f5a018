use crate::address::Address;
use std::fmt;

/// Kind of value held by an escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "borsh", derive(borsh::BorshSerialize, borsh::BorshDeserialize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "kind"))]
pub enum Asset {
    /// The chain's native coin
    #[default]
    Native,
    /// A fungible token identified by its mint
    Token { mint: Address },
}

impl Asset {
    /// Mint of a token asset, `None` for the native coin.
    pub fn mint(&self) -> Option<&Address> {
        match self {
            Asset::Native => None,
            Asset::Token { mint } => Some(mint),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token { mint } => write!(f, "token:{}", mint),
        }
    }
}
