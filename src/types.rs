//! Ledger-native primitive types.
//!
//! Addresses and monetary amounts as the remote registries encode them.
//! Amounts travel in the chain's smallest indivisible unit; conversion to the
//! human display unit happens only at the formatting boundary.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Decimal places between the smallest ledger unit and the display coin.
pub const DISPLAY_DECIMALS: u32 = 18;

/// Smallest-unit quantity of one display coin.
pub const UNITS_PER_COIN: u128 = 1_000_000_000_000_000_000;

/// A ledger account address: `0x` followed by 40 hex digits.
///
/// Addresses are case-insensitive on chain. The inner string is normalized to
/// lowercase at construction, so equality and hashing are case-insensitive
/// without callers having to remember to fold case themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

/// Why an address string failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address contains non-hex characters")]
    InvalidHex,
    #[error("address must encode 20 bytes, got {0}")]
    BadLength(usize),
}

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressParseError::MissingPrefix)?;
        let bytes = hex::decode(digits).map_err(|_| AddressParseError::InvalidHex)?;
        if bytes.len() != 20 {
            return Err(AddressParseError::BadLength(bytes.len()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A native-currency quantity in the smallest ledger unit.
///
/// On the wire amounts are decimal strings of base units, since they routinely
/// exceed what a JSON number can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(u128);

/// Why a display-unit amount string failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("amount is not a decimal number")]
    NotANumber,
    #[error("amount has more than {DISPLAY_DECIMALS} decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Whole display coins, for literals in tests and defaults.
    pub const fn from_coins(coins: u64) -> Self {
        Self(coins as u128 * UNITS_PER_COIN)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a display-unit decimal string such as `"2.5"` into base units.
    ///
    /// Accepts up to [`DISPLAY_DECIMALS`] fractional digits. The empty string
    /// and a bare `.` are rejected.
    pub fn parse_display(input: &str) -> Result<Self, AmountParseError> {
        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountParseError::NotANumber);
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AmountParseError::NotANumber);
        }
        if frac.len() > DISPLAY_DECIMALS as usize {
            return Err(AmountParseError::TooPrecise);
        }

        let whole_units = if whole.is_empty() {
            0u128
        } else {
            whole.parse::<u128>().map_err(|_| AmountParseError::Overflow)?
        };
        let mut padded = frac.to_string();
        while padded.len() < DISPLAY_DECIMALS as usize {
            padded.push('0');
        }
        let frac_units = padded.parse::<u128>().map_err(|_| AmountParseError::Overflow)?;

        whole_units
            .checked_mul(UNITS_PER_COIN)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or(AmountParseError::Overflow)
    }

    /// Render as a display-unit decimal string with trailing zeros trimmed.
    pub fn to_display_string(&self) -> String {
        let whole = self.0 / UNITS_PER_COIN;
        let frac = self.0 % UNITS_PER_COIN;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:018}");
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Amount)
            .map_err(|_| de::Error::custom(format!("invalid base-unit amount: {raw}")))
    }
}

/// Opaque identifier of a submitted transaction, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
