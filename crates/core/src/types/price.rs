//! Type-safe price representation using decimal arithmetic.
//!
//! All catalog prices are in Indian rupees. Sums and differences are exact,
//! which is what lets the cart keep a running total without drift.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative amount in rupees.
///
/// Serialized as a plain JSON number.
///
/// ## Examples
///
/// ```
/// use instant_meal_core::Price;
/// use rust_decimal::Decimal;
///
/// let thali = Price::from_rupees(250);
/// let lassi = Price::new(Decimal::new(4950, 2)).unwrap();
///
/// assert_eq!((thali + lassi).to_string(), "₹299.50");
/// assert!(Price::new(Decimal::NEGATIVE_ONE).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.normalize()))
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Create a price from paise (1/100 rupee).
    #[must_use]
    pub fn from_paise(paise: u64) -> Self {
        Self(Decimal::from_i128_with_scale(i128::from(paise), 2).normalize())
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this price is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtract, clamping at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(Decimal::new(-1, 2)))
        );
    }

    #[test]
    fn test_accepts_zero() {
        assert!(Price::new(Decimal::ZERO).unwrap().is_zero());
        assert!(Price::new(-Decimal::ZERO).unwrap().is_zero());
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Price::from_rupees(250).to_string(), "₹250.00");
        assert_eq!(Price::from_paise(1999).to_string(), "₹19.99");
    }

    #[test]
    fn test_sum_is_exact() {
        // 0.10 + 0.20 must be 0.30 exactly, unlike binary floating point
        let total: Price = [Price::from_paise(10), Price::from_paise(20)]
            .iter()
            .sum();
        assert_eq!(total, Price::from_paise(30));
    }

    #[test]
    fn test_saturating_sub() {
        let a = Price::from_rupees(400);
        assert_eq!(a.saturating_sub(Price::from_rupees(250)), Price::from_rupees(150));
        assert_eq!(a.saturating_sub(Price::from_rupees(500)), Price::ZERO);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_rupees(250)).unwrap();
        assert_eq!(json, "250.0");
    }

    #[test]
    fn test_deserializes_integers_and_fractions() {
        let whole: Price = serde_json::from_str("150").unwrap();
        assert_eq!(whole, Price::from_rupees(150));

        let half: Price = serde_json::from_str("99.5").unwrap();
        assert_eq!(half, Price::from_paise(9950));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("-5").is_err());
    }
}
