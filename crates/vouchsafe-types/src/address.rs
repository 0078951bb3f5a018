use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// Domain separator for program-derived addresses.
const DERIVE_DOMAIN: &[u8] = b"vouchsafe/pda";

/// 20-byte account address.
/// Display format: Bech32m with "vsf" human-readable prefix.
///
/// # Derivation
/// Program-owned: `address = blake3("vouchsafe/pda" || program_id || seeds...)[0..20]`.
/// No private key exists for a program-derived address; only the program that
/// owns `program_id` can authorize movements out of it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);
    pub const LEN: usize = 20;

    /// Bech32m human-readable prefix
    pub const BECH32_HRP: &'static str = "vsf";

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Create from a byte slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        if slice.len() != Self::LEN {
            return Err(TypesError::InvalidAddressLength(slice.len()));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Derive a program-controlled address from `program_id` and `seeds`.
    ///
    /// The same inputs always produce the same address, so the address of an
    /// escrow or custody account can be recomputed by anyone who knows its
    /// seeds.
    pub fn derive(program_id: &Address, seeds: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DERIVE_DOMAIN);
        hasher.update(program_id.as_bytes());
        for seed in seeds {
            // Length prefix keeps ["ab", "c"] and ["a", "bc"] apart
            hasher.update(&(seed.len() as u32).to_le_bytes());
            hasher.update(seed);
        }
        Self::truncate(hasher.finalize().as_bytes())
    }

    fn truncate(digest: &[u8; 32]) -> Self {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&digest[..20]);
        Self(addr)
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self == &Self::ZERO
    }

    /// Convert to hex string without 0x prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = bech32::Hrp::parse_unchecked(Self::BECH32_HRP);
        match bech32::encode::<bech32::Bech32m>(hrp, &self.0) {
            Ok(encoded) => write!(f, "{}", encoded),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Support both Bech32m ("vsf1...") and hex ("0x...")
        if s.starts_with("vsf1") {
            let (hrp, data) = bech32::decode(s)
                .map_err(|e| TypesError::Bech32Error(e.to_string()))?;

            let expected_hrp = bech32::Hrp::parse_unchecked(Self::BECH32_HRP);
            if hrp != expected_hrp {
                return Err(TypesError::InvalidAddressFormat(format!(
                    "Invalid HRP: expected '{}', got '{}'",
                    Self::BECH32_HRP,
                    hrp
                )));
            }

            let data_len = data.len();
            let bytes: [u8; 20] = data
                .try_into()
                .map_err(|_| TypesError::InvalidAddressLength(data_len))?;

            Ok(Self::from_bytes(bytes))
        } else if let Some(hex_part) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let bytes = hex::decode(hex_part)?;
            Self::from_slice(&bytes)
        } else {
            Err(TypesError::InvalidAddressFormat(s.to_string()))
        }
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
