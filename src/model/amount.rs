use crate::model::constants::{LOT_EPSILON, VALUE_EPSILON};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Fiat values are printed with this many decimal places in reports.
pub(crate) const VALUE_DISPLAY_DIGITS: u32 = 2;

#[derive(Debug, Error)]
pub enum ConvertAmountError {
    /// Unable to parse decimal string.
    #[error("Unable to parse decimal string")]
    Decimal(#[from] rust_decimal::Error),
}

/// A signed amount of some commodity. Positive quantities increase holdings.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Quantity(Decimal);

/// Fiat-denominated value: consideration, proceeds, fees, cost basis and gains all use it.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Value(Decimal);

/// Fiat value of one unit of a commodity.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Price(Decimal);

macro_rules! impl_math_ops {
    ($name:ident) => {
        impl ::std::ops::Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl ::std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl ::std::ops::Neg for $name {
            type Output = Self;

            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl ::std::ops::Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl ::std::ops::SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl ::std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, |acc, item| acc + item)
            }
        }
    };
}

macro_rules! impl_decimal_newtype {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);

            pub const fn new(value: Decimal) -> Self {
                Self(value)
            }

            pub fn to_decimal(self) -> Decimal {
                self.0
            }

            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            pub fn is_zero(self) -> bool {
                self.0.is_zero()
            }

            pub fn is_positive(self) -> bool {
                self.0 > Decimal::ZERO
            }

            pub fn is_negative(self) -> bool {
                self.0 < Decimal::ZERO
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConvertAmountError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

impl_math_ops!(Quantity);
impl_math_ops!(Value);

impl_decimal_newtype!(Quantity);
impl_decimal_newtype!(Value);
impl_decimal_newtype!(Price);

impl Quantity {
    /// Get the minimum between two [`Quantity`]s.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Lots at or below this size are treated as fully consumed.
    pub fn is_dust(self) -> bool {
        self.0 <= LOT_EPSILON
    }
}

impl Value {
    /// The share of this value attributable to `part` out of `whole`.
    ///
    /// Multiplies before dividing, so exact shares like `300 * 1 / 3` stay exact. Returns zero when
    /// `whole` is zero.
    pub fn prorate(self, part: Quantity, whole: Quantity) -> Self {
        if whole.is_zero() {
            return Self::ZERO;
        }

        Self(self.0 * part.0 / whole.0)
    }

    /// Divide this value evenly over `quantity` units. Zero quantities have zero unit value.
    pub fn per_unit(self, quantity: Quantity) -> Price {
        if quantity.is_zero() {
            return Price::ZERO;
        }

        Price(self.0 / quantity.0.abs())
    }

    /// Compare values while ignoring precision lost to repeated division.
    pub fn is_fuzzy_eq(self, other: Self) -> bool {
        (self.0 - other.0).abs() < VALUE_EPSILON
    }
}

impl Price {
    /// Total value of `quantity` units at this price.
    pub fn value_of(self, quantity: Quantity) -> Value {
        Value(self.0 * quantity.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = VALUE_DISPLAY_DIGITS as usize;
        // Banker's rounding, the `Decimal` default.
        //
        // SEE: https://docs.rs/rust_decimal/latest/rust_decimal/prelude/enum.RoundingStrategy.html
        let amount = self.0.round_dp(VALUE_DISPLAY_DIGITS);

        write!(f, "{amount:.precision$}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbtest::arbtest;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn v(s: &str) -> Value {
        s.parse().unwrap()
    }

    #[test]
    fn test_prorate_exact_shares() {
        assert_eq!(v("300").prorate(q("1"), q("3")), v("100"));
        assert_eq!(v("500").prorate(q("2"), q("5")), v("200"));
        assert_eq!(v("500").prorate(q("3"), q("5")), v("300"));
        assert_eq!(v("500").prorate(q("3"), Quantity::ZERO), Value::ZERO);
    }

    #[test]
    fn test_per_unit() {
        assert_eq!(v("10000").per_unit(q("1.0")), "10000".parse().unwrap());
        assert_eq!(v("450").per_unit(q("-3")), "150".parse().unwrap());
        assert_eq!(v("450").per_unit(Quantity::ZERO), Price::ZERO);

        let price = v("200").per_unit(q("2"));
        assert_eq!(price.value_of(q("0.5")), v("50"));
    }

    #[test]
    fn test_display() {
        assert_eq!(v("1000").to_string(), "1000.00");
        assert_eq!(v("-0.125").to_string(), "-0.12");
        assert_eq!(v("0.135").to_string(), "0.14");
        assert_eq!(q("0.50000000").to_string(), "0.5");
    }

    #[test]
    fn test_dust() {
        assert!(q("0.000000000001").is_dust());
        assert!(q("0").is_dust());
        assert!(!q("0.00000000001").is_dust());
    }

    #[test]
    fn prop_test_prorated_parts_sum_to_whole() {
        arbtest(|u| {
            let total = Value::new(Decimal::new(u.int_in_range(0..=1_000_000_000i64)?, 2));
            let parts = (0..u.int_in_range(1..=8u8)?)
                .map(|_| Ok(Quantity::new(Decimal::new(u.int_in_range(1..=1_000_000i64)?, 6))))
                .collect::<arbtest::arbitrary::Result<Vec<_>>>()?;
            let whole: Quantity = parts.iter().copied().sum();

            let allocated: Value = parts.iter().map(|&part| total.prorate(part, whole)).sum();
            assert!(allocated.is_fuzzy_eq(total), "{allocated} != {total}");
            Ok(())
        });
    }
}
