//! Exact currency amounts in the ledger's smallest unit.

use std::{fmt, ops::Add, str::FromStr};

use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Decimal places between the smallest unit and the display unit (wei -> ether).
pub const ETHER_DECIMALS: u32 = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount `{0}`")]
    Invalid(String),
    #[error("amount `{value}` has more than {decimals} fractional digits")]
    TooPrecise { value: String, decimals: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_sub(&other.0).map(Self)
    }

    /// Exact product of this amount and a unit count.
    pub fn times(&self, quantity: u64) -> Amount {
        Self(&self.0 * BigUint::from(quantity))
    }

    /// Parses a decimal display value such as `"0.05"` into smallest units.
    pub fn parse_units(text: &str, decimals: u32) -> Result<Amount, AmountError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(AmountError::Invalid(text.to_string()));
        }
        if fraction.len() > decimals as usize {
            return Err(AmountError::TooPrecise {
                value: text.to_string(),
                decimals,
            });
        }

        let mut digits = String::with_capacity(whole.len() + decimals as usize);
        digits.push_str(whole);
        digits.push_str(fraction);
        digits.extend(std::iter::repeat('0').take(decimals as usize - fraction.len()));
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Amount::zero());
        }
        BigUint::from_str(digits)
            .map(Self)
            .map_err(|_| AmountError::Invalid(text.to_string()))
    }

    /// Renders the amount in display units without rounding, trimming trailing zeros.
    pub fn format_units(&self, decimals: u32) -> String {
        let raw = self.0.to_str_radix(10);
        let decimals = decimals as usize;
        if decimals == 0 {
            return raw;
        }

        let padded = if raw.len() <= decimals {
            format!("{}{raw}", "0".repeat(decimals + 1 - raw.len()))
        } else {
            raw
        };
        let (whole, fraction) = padded.split_at(padded.len() - decimals);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{fraction}")
        }
    }
}

/// Value to attach when funding `quantity` pledges at `unit_cost` each.
pub fn pledge_total(unit_cost: &Amount, quantity: u64) -> Amount {
    unit_cost.times(quantity)
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Self(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        BigUint::from_str(s)
            .map(Self)
            .map_err(|_| AmountError::Invalid(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Base-10 strings keep values above 2^53 exact across JSON.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(10))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
