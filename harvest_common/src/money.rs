use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "USD";
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount, held as an integer number of currency minor units (e.g. cents).
///
/// Storing minor units means sums and products are exact. Rounding only ever happens at the edges, when a human
/// readable value is parsed.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Value cannot be represented as money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("Value {value} is too large to convert to Money")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / MINOR_UNITS_PER_MAJOR.unsigned_abs();
        let minor = abs % MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}${major}.{minor:02}")
    }
}

/// Parses human-readable amounts such as `12`, `12.5`, `12.50` or `$12.50` into minor units.
/// More than two decimal places is an error rather than a silent rounding.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let unsigned = unsigned.strip_prefix('$').unwrap_or(unsigned);
        let (major, minor) = match unsigned.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (unsigned, ""),
        };
        if major.is_empty() || minor.len() > 2 || !major.chars().all(|c| c.is_ascii_digit()) ||
            !minor.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyConversionError(format!("'{s}' is not a valid amount")));
        }
        let major = major.parse::<i64>().map_err(|e| MoneyConversionError(format!("'{s}': {e}")))?;
        let minor = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|e| MoneyConversionError(format!("'{s}': {e}")))? * 10,
            _ => minor.parse::<i64>().map_err(|e| MoneyConversionError(format!("'{s}': {e}")))?,
        };
        let value = major
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(|| MoneyConversionError(format!("'{s}' is too large")))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Money {
    pub const fn new(minor_units: i64) -> Self {
        Self(minor_units)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS_PER_MAJOR)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_mul(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// True if `other` differs from this amount by no more than `tolerance`.
    pub fn matches_within(&self, other: Money, tolerance: Money) -> bool {
        self.0.abs_diff(other.0) <= tolerance.0.unsigned_abs()
    }
}
