//! Numeric codes handed to users: phone verification codes and order
//! reference numbers.
//!
//! Both are plain integers with a fixed number of decimal digits. Generation
//! lives in the server (it needs a random source); this module only knows the
//! valid ranges.

use core::fmt;
use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// A six-digit phone verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(u32);

impl VerificationCode {
    pub const DIGITS: u32 = 6;
    pub const RANGE: RangeInclusive<u32> = 100_000..=999_999;

    /// Returns `None` if `code` is not a six-digit number.
    #[must_use]
    pub fn new(code: u32) -> Option<Self> {
        Self::RANGE.contains(&code).then_some(Self(code))
    }

    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// The value as stored in an `INTEGER` column.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // at most six digits
    pub const fn as_i32(&self) -> i32 {
        self.0 as i32
    }

    /// Digits separated by spaces, so a voice or SMS reader spells them out.
    #[must_use]
    pub fn spaced(&self) -> String {
        let digits = self.0.to_string();
        let mut out = String::with_capacity(digits.len() * 2);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push(c);
        }
        out
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The human-facing eight-digit order number.
///
/// Distinct from the order's database id: the reference is what a buyer reads
/// out to support, the id is what the API addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(i32);

impl OrderReference {
    pub const DIGITS: u32 = 8;
    pub const RANGE: RangeInclusive<i32> = 10_000_000..=99_999_999;

    /// Returns `None` if `value` is not an eight-digit number.
    #[must_use]
    pub fn new(value: i32) -> Option<Self> {
        Self::RANGE.contains(&value).then_some(Self(value))
    }

    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderReference {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderReference {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Self::new(raw).ok_or_else(|| format!("invalid order reference {raw}").into())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderReference {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_code_range() {
        assert!(VerificationCode::new(99_999).is_none());
        assert!(VerificationCode::new(1_000_000).is_none());
        assert_eq!(VerificationCode::new(123_456).unwrap().get(), 123_456);
    }

    #[test]
    fn test_verification_code_spaced() {
        assert_eq!(
            VerificationCode::new(402_917).unwrap().spaced(),
            "4 0 2 9 1 7"
        );
    }

    #[test]
    fn test_order_reference_has_eight_digits() {
        assert!(OrderReference::new(9_999_999).is_none());
        assert!(OrderReference::new(100_000_000).is_none());
        let reference = OrderReference::new(12_345_678).unwrap();
        assert_eq!(reference.to_string().len(), 8);
    }
}
