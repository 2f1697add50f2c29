//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{
    AddressId, BankAccountId, Email, PhoneNumber, Role, UserId, VerificationCode,
};

/// A marketplace account (domain type).
///
/// The password hash is deliberately not part of this type; it is only read
/// back alongside the user at login.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub phone: PhoneNumber,
    pub role: Role,
    /// Whether the phone number has been verified.
    pub verified: bool,
    /// Outstanding verification code, if one was requested and not yet used.
    pub pending_code: Option<PendingCode>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A verification code waiting to be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCode {
    pub code: VerificationCode,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub phone: PhoneNumber,
}

/// Partial user update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none()
    }
}

/// The single profile address of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub post_code: String,
    pub country: String,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub post_code: String,
    pub country: String,
}

/// Partial address update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct AddressPatch {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub post_code: Option<String>,
    pub country: Option<String>,
}

impl AddressPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line1.is_none()
            && self.line2.is_none()
            && self.city.is_none()
            && self.post_code.is_none()
            && self.country.is_none()
    }
}

/// Settlement details of a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: BankAccountId,
    pub user_id: UserId,
    pub account_number: String,
    pub swift_code: String,
    pub payment_type: String,
}

#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub account_number: String,
    pub swift_code: String,
    pub payment_type: String,
}

/// Names and address written together when a profile is created.
#[derive(Debug, Clone)]
pub struct NewProfileRecord {
    pub first_name: String,
    pub last_name: String,
    pub address: NewAddress,
}

/// Everything written when a buyer becomes a seller.
#[derive(Debug, Clone)]
pub struct SellerUpgrade {
    pub first_name: String,
    pub last_name: String,
    pub phone: PhoneNumber,
    pub bank_account: NewBankAccount,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_code_expiry_is_exclusive() {
        let now = Utc::now();
        let pending = PendingCode {
            code: VerificationCode::new(123_456).unwrap(),
            expires_at: now,
        };
        assert!(!pending.is_expired(now));
        assert!(pending.is_expired(now + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_empty_patches() {
        assert!(UserPatch::default().is_empty());
        assert!(AddressPatch::default().is_empty());
        let patch = AddressPatch {
            city: Some("Lyon".to_string()),
            ..AddressPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
