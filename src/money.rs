//! Currency amounts in minor units.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// A non-negative amount of money in minor units (cents).
///
/// Arithmetic saturates instead of wrapping. On the wire the amount is a
/// decimal number with two fractional digits (`12.99`), which is the layout
/// the storefront has always persisted; decoding rounds to the nearest cent.
///
/// # Examples
///
/// ```
/// use cartfold::Money;
///
/// let price = Money::from_cents(1299);
/// assert_eq!(price.times(2), Money::from_cents(2598));
/// assert_eq!(price.to_string(), "12.99");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// Build an amount from minor units.
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in minor units.
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Convert a decimal amount (e.g. `12.99`) to minor units.
    ///
    /// Returns `None` for negative, non-finite, or out-of-range values.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    /// The amount as a decimal number of major units.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiply by a quantity.
    pub fn times(self, quantity: u64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// `percent`% of this amount, rounded half-up to the cent.
    pub fn percent(self, percent: u32) -> Self {
        let scaled = (u128::from(self.0) * u128::from(percent) + 50) / 100;
        Self(u64::try_from(scaled).unwrap_or(u64::MAX))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::from_decimal(amount)
            .ok_or_else(|| de::Error::custom(format!("invalid amount: {amount}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_conversion_rounds_to_nearest_cent() {
        assert_eq!(Money::from_decimal(12.99), Some(Money::from_cents(1299)));
        assert_eq!(Money::from_decimal(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_decimal(3.999), Some(Money::from_cents(400)));
    }

    #[test]
    fn decimal_conversion_rejects_invalid_amounts() {
        assert_eq!(Money::from_decimal(-0.01), None);
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_decimal(f64::INFINITY), None);
    }

    #[test]
    fn times_and_sum_are_exact() {
        let total: Money = [Money::from_cents(1299).times(2), Money::from_cents(450)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(3048));
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(Money::from_cents(2598).percent(10), Money::from_cents(260));
        assert_eq!(Money::from_cents(1234).percent(10), Money::from_cents(123));
        assert_eq!(Money::ZERO.percent(10), Money::ZERO);
    }

    #[test]
    fn arithmetic_saturates() {
        let max = Money::from_cents(u64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(max.times(3), max);
    }

    #[test]
    fn display_pads_cents() {
        assert_eq!(Money::from_cents(399).to_string(), "3.99");
        assert_eq!(Money::from_cents(1205).to_string(), "12.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn serializes_as_decimal_number() {
        let json = serde_json::to_string(&Money::from_cents(1299)).unwrap();
        assert_eq!(json, "12.99");

        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_cents(1299));
    }

    #[test]
    fn deserializes_integers_and_rejects_negatives() {
        let whole: Money = serde_json::from_str("12").unwrap();
        assert_eq!(whole, Money::from_cents(1200));

        assert!(serde_json::from_str::<Money>("-1.5").is_err());
        assert!(serde_json::from_str::<Money>("\"12.99\"").is_err());
    }
}
