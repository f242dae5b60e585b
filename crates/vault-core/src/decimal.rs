//! Precision-safe monetary amounts.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Balances are adjusted by
//! many small claims and releases over the life of the process, so binary
//! floating point is never used for stored values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::CoreError;

/// Monetary amount with exact decimal precision.
///
/// Wraps `Decimal` so that balance fields cannot be mixed up with
/// unrelated decimals (rates, fractions) in calculations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    #[inline]
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Clamp at zero, dropping any negative part.
    #[inline]
    pub fn floor_zero(&self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            *self
        }
    }

    /// Lossy view for reporting and metrics. Never feed the result back
    /// into the ledger.
    #[inline]
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Build from a float reported by an external feed.
    ///
    /// Fails for NaN and infinities.
    pub fn try_from_f64(value: f64) -> Result<Self, CoreError> {
        Decimal::from_f64_retain(value)
            .map(|d| Self(d.normalize()))
            .ok_or_else(|| CoreError::InvalidAmount(value.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl From<Amount> for Decimal {
    fn from(a: Amount) -> Self {
        a.0
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + *a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_repeated_small_adjustments_are_exact() {
        let mut free = Amount::new(dec!(1));
        let tick = Amount::new(dec!(0.1));

        for _ in 0..10 {
            free -= tick;
        }
        assert!(free.is_zero());

        for _ in 0..10 {
            free += tick;
        }
        assert_eq!(free, Amount::ONE);
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Amount::new(dec!(-0.5)).floor_zero(), Amount::ZERO);
        assert_eq!(Amount::new(dec!(0.5)).floor_zero(), Amount::new(dec!(0.5)));
    }

    #[test]
    fn test_parse_amount() {
        let amount: Amount = " 12.3400 ".parse().unwrap();
        assert_eq!(amount.inner(), dec!(12.34));
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn test_from_f64() {
        let amount = Amount::try_from_f64(0.25).unwrap();
        assert_eq!(amount.inner(), dec!(0.25));
        assert!(Amount::try_from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_sum() {
        let parts = [Amount::new(dec!(0.1)), Amount::new(dec!(0.2))];
        let total: Amount = parts.iter().sum();
        assert_eq!(total.inner(), dec!(0.3));
    }

    #[test]
    fn test_serde_transparent() {
        let amount = Amount::new(dec!(1.5));
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1.5\"");
    }
}
