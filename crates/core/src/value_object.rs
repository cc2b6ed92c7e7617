//! Value objects: equality by value, not identity.
//!
//! Weights and per-kilogram prices are exact decimals. Weights are quantized to
//! whole grams so that subtracting one weight from another can land exactly on
//! zero, which is what lot exhaustion relies on.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Finest weight resolution accepted on input: one gram.
pub const WEIGHT_SCALE: u32 = 3;

/// Finest price resolution accepted on input.
pub const PRICE_SCALE: u32 = 4;

/// Exclusive upper bound on a single weight: eleven integer digits, as in the
/// `NUMERIC(14,3)` weight columns.
pub const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(1_215_752_192, 23, 0, false, 0);

/// Exclusive upper bound on a per-kilogram price: fourteen integer digits, as
/// in the `NUMERIC(18,4)` price columns.
///
/// Together with [`MAX_WEIGHT_KG`] this keeps `price * weight` below 1e25, far
/// inside `Decimal` range.
pub const MAX_PRICE_PER_KG: Decimal = Decimal::from_parts(276_447_232, 23_283, 0, false, 0);

/// A non-negative weight in kilograms with gram resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Kilograms(Decimal);

impl Kilograms {
    pub const ZERO: Kilograms = Kilograms(Decimal::ZERO);

    /// Accepts zero or a positive weight with at most gram precision.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation("weight cannot be negative"));
        }
        if value >= MAX_WEIGHT_KG {
            return Err(DomainError::validation(format!(
                "weight {value} must be below {MAX_WEIGHT_KG} kg"
            )));
        }
        let normalized = value.normalize();
        if normalized.scale() > WEIGHT_SCALE {
            return Err(DomainError::validation(format!(
                "weight {value} is finer than 1 g"
            )));
        }
        Ok(Self(normalized))
    }

    /// Like [`Kilograms::new`] but rejects zero.
    pub fn positive(value: Decimal) -> DomainResult<Self> {
        let kg = Self::new(value)?;
        if kg.is_zero() {
            return Err(DomainError::validation("weight must be greater than zero"));
        }
        Ok(kg)
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Subtract, returning `None` instead of going negative.
    pub fn checked_sub(self, rhs: Kilograms) -> Option<Kilograms> {
        let diff = self.0 - rhs.0;
        if diff.is_sign_negative() && !diff.is_zero() {
            None
        } else {
            Some(Self(diff.normalize()))
        }
    }
}

impl TryFrom<Decimal> for Kilograms {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Kilograms> for Decimal {
    fn from(value: Kilograms) -> Self {
        value.0
    }
}

impl Add for Kilograms {
    type Output = Kilograms;

    fn add(self, rhs: Kilograms) -> Kilograms {
        Kilograms((self.0 + rhs.0).normalize())
    }
}

impl AddAssign for Kilograms {
    fn add_assign(&mut self, rhs: Kilograms) {
        *self = *self + rhs;
    }
}

impl Sum for Kilograms {
    fn sum<I: Iterator<Item = Kilograms>>(iter: I) -> Self {
        iter.fold(Kilograms::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Kilograms> for Kilograms {
    fn sum<I: Iterator<Item = &'a Kilograms>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl core::fmt::Display for Kilograms {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A non-negative price (or cost) per kilogram.
///
/// Input prices are limited to [`PRICE_SCALE`] decimal places; computed cost
/// bases (weighted averages) keep full decimal precision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PricePerKg(Decimal);

impl PricePerKg {
    pub const ZERO: PricePerKg = PricePerKg(Decimal::ZERO);

    /// Validate a user-supplied price.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        let price = Self::computed(value)?;
        if price.0.scale() > PRICE_SCALE {
            return Err(DomainError::validation(format!(
                "price {value} has more than {PRICE_SCALE} decimal places"
            )));
        }
        Ok(price)
    }

    /// Wrap a derived per-kg value (e.g. a weighted average) without the
    /// input precision limit. The range limit still applies.
    pub fn computed(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if value >= MAX_PRICE_PER_KG {
            return Err(DomainError::validation(format!(
                "price {value} must be below {MAX_PRICE_PER_KG} per kg"
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for PricePerKg {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::computed(value)
    }
}

impl From<PricePerKg> for Decimal {
    fn from(value: PricePerKg) -> Self {
        value.0
    }
}

/// `price * weight` is an amount of money. Both operands are range-checked on
/// construction, so the product cannot overflow.
impl Mul<Kilograms> for PricePerKg {
    type Output = Decimal;

    fn mul(self, rhs: Kilograms) -> Decimal {
        self.0 * rhs.0
    }
}

impl core::fmt::Display for PricePerKg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn weight_rejects_sub_gram_precision() {
        assert!(Kilograms::new(dec!(1.2345)).is_err());
        assert_eq!(Kilograms::new(dec!(1.2340)).unwrap().value(), dec!(1.234));
    }

    #[test]
    fn positive_weight_rejects_zero_and_negative() {
        assert!(Kilograms::positive(Decimal::ZERO).is_err());
        assert!(Kilograms::positive(dec!(-1)).is_err());
        assert!(Kilograms::positive(dec!(0.001)).is_ok());
    }

    #[test]
    fn checked_sub_lands_exactly_on_zero() {
        let a = Kilograms::new(dec!(0.3)).unwrap();
        let b = Kilograms::new(dec!(0.1)).unwrap();
        let rest = a.checked_sub(b).unwrap().checked_sub(b).unwrap().checked_sub(b).unwrap();
        assert!(rest.is_zero());
        assert_eq!(rest.checked_sub(b), None);
    }

    #[test]
    fn price_input_precision_is_limited_but_computed_is_not() {
        assert!(PricePerKg::new(dec!(2.12345)).is_err());
        assert!(PricePerKg::computed(dec!(2.1666666666666666666666666667)).is_ok());
        assert!(PricePerKg::new(dec!(-0.5)).is_err());
    }

    #[test]
    fn range_limits_match_the_storage_columns() {
        assert_eq!(MAX_WEIGHT_KG, Decimal::from(10_i64.pow(11)));
        assert_eq!(MAX_PRICE_PER_KG, Decimal::from(10_i64.pow(14)));
        let huge = Decimal::from(10_i64.pow(18));

        assert!(Kilograms::new(dec!(99999999999.999)).is_ok());
        assert!(Kilograms::new(MAX_WEIGHT_KG).is_err());
        assert!(Kilograms::positive(huge).is_err());

        assert!(PricePerKg::new(dec!(99999999999999.9999)).is_ok());
        assert!(PricePerKg::new(MAX_PRICE_PER_KG).is_err());
        assert!(PricePerKg::computed(huge).is_err());
        assert!(serde_json::from_str::<PricePerKg>("\"1000000000000000000\"").is_err());
    }

    #[test]
    fn largest_price_times_largest_weight_does_not_overflow() {
        let price = PricePerKg::new(dec!(99999999999999.9999)).unwrap();
        let weight = Kilograms::new(dec!(99999999999.999)).unwrap();
        let money = price * weight;
        assert!(money > MAX_PRICE_PER_KG * dec!(99999999999));
        assert!(money < MAX_PRICE_PER_KG * MAX_WEIGHT_KG);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Kilograms = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.value(), dec!(12.5));
        assert!(serde_json::from_str::<Kilograms>("\"-3\"").is_err());
    }
}
