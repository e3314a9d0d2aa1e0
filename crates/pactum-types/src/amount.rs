//! Unit-of-account amounts
//!
//! Balances held in escrow are non-negative integers. All arithmetic is
//! checked; callers turn `None` into `PactumError::AmountOverflow`.

use crate::{PactumError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-negative amount in the smallest unit of account
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub u128);

impl Amount {
    /// Create a new amount
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Create a zero amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Raw value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Checked addition that reports overflow as an engine error
    pub fn try_add(&self, other: Amount) -> Result<Amount> {
        self.checked_add(other).ok_or(PactumError::AmountOverflow)
    }

    /// Checked subtraction that reports underflow as an engine error
    pub fn try_sub(&self, other: Amount) -> Result<Amount> {
        self.checked_sub(other).ok_or(PactumError::AmountOverflow)
    }

    /// Sum an iterator of amounts, failing on overflow
    pub fn try_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Result<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::zero(), |acc, amount| acc.try_add(amount))
    }

    /// Big-endian encoding used for commitment leaves
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::new(100);
        let b = Amount::new(50);
        assert_eq!(a.try_add(b).unwrap(), Amount::new(150));
        assert_eq!(a.try_sub(b).unwrap(), Amount::new(50));
        assert!(matches!(b.try_sub(a), Err(PactumError::AmountOverflow)));
        assert!(Amount::new(u128::MAX).checked_add(Amount::new(1)).is_none());
    }

    #[test]
    fn test_try_sum_overflow() {
        let ok = Amount::try_sum([Amount::new(1), Amount::new(2), Amount::new(3)]).unwrap();
        assert_eq!(ok, Amount::new(6));

        let overflow = Amount::try_sum([Amount::new(u128::MAX), Amount::new(1)]);
        assert!(overflow.is_err());
    }
}
