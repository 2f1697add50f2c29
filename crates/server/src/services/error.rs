//! Service-level error types.

use thiserror::Error;

use bazaar_core::{EmailError, PhoneError, PriceError, ProductId};

use super::credentials::CredentialError;
use crate::db::RepositoryError;

/// Broad classification of a [`ServiceError`], used by the HTTP layer to
/// pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Credentials did not match.
    Authentication,
    /// Entity absent or not visible to the caller.
    NotFound,
    /// Business-rule rejection such as a duplicate or a no-op.
    Conflict,
    /// Role or ownership mismatch.
    Authorization,
    /// Storage or infrastructure failure.
    Persistence,
}

/// Errors returned by the marketplace services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// Any other malformed field.
    #[error("{0}")]
    Validation(String),

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("phone number is already verified")]
    AlreadyVerified,

    #[error("no verification code has been requested")]
    NoPendingCode,

    #[error("verification code has expired")]
    CodeExpired,

    #[error("verification code does not match")]
    CodeMismatch,

    #[error("profile already exists")]
    ProfileExists,

    #[error("profile has not been created yet")]
    ProfileMissing,

    #[error("product not found")]
    ProductNotFound,

    #[error("quantity must be between 1 and {}", bazaar_core::Quantity::MAX)]
    InvalidQuantity,

    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} does not have enough stock")]
    OutOfStock(ProductId),

    #[error("order not found")]
    OrderNotFound,

    /// Every reference drawn for a new order was already taken.
    #[error("could not allocate an order reference")]
    ReferenceUnavailable,

    #[error("user is already a seller")]
    AlreadySeller,

    #[error("phone number must be verified first")]
    NotVerified,

    #[error("bank account is already registered")]
    DuplicateBankAccount,

    #[error("product belongs to another seller")]
    NotOwner,

    #[error("stock is already at that level")]
    NoChange,

    #[error("category not found")]
    CategoryNotFound,

    #[error("category still has products or subcategories")]
    CategoryInUse,

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail(_)
            | Self::InvalidPhone(_)
            | Self::InvalidPrice(_)
            | Self::Validation(_)
            | Self::InvalidQuantity
            | Self::CodeMismatch
            | Self::CodeExpired
            | Self::NoPendingCode
            | Self::EmptyCart => ErrorKind::Validation,

            Self::InvalidCredentials => ErrorKind::Authentication,

            Self::UserNotFound
            | Self::ProductNotFound
            | Self::OrderNotFound
            | Self::CategoryNotFound
            | Self::ProfileMissing
            | Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,

            Self::DuplicateEmail
            | Self::AlreadyVerified
            | Self::ProfileExists
            | Self::OutOfStock(_)
            | Self::AlreadySeller
            | Self::DuplicateBankAccount
            | Self::NoChange
            | Self::CategoryInUse
            | Self::Repository(
                RepositoryError::Conflict(_) | RepositoryError::InsufficientStock(_),
            ) => ErrorKind::Conflict,

            Self::NotVerified | Self::NotOwner => ErrorKind::Authorization,

            Self::ReferenceUnavailable
            | Self::Credential(_)
            | Self::Repository(
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_),
            ) => ErrorKind::Persistence,
        }
    }
}

/// Trim a string and drop it if nothing is left.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Require a non-blank value for `field`.
pub(crate) fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_keep_their_meaning() {
        assert_eq!(
            ServiceError::from(RepositoryError::NotFound).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::from(RepositoryError::Conflict("x".to_string())).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ServiceError::from(RepositoryError::DataCorruption("x".to_string())).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_business_rules_are_classified() {
        assert_eq!(ServiceError::DuplicateEmail.kind(), ErrorKind::Conflict);
        assert_eq!(ServiceError::NoChange.kind(), ErrorKind::Conflict);
        assert_eq!(ServiceError::NotOwner.kind(), ErrorKind::Authorization);
        assert_eq!(ServiceError::CodeMismatch.kind(), ErrorKind::Validation);
        assert_eq!(
            ServiceError::InvalidCredentials.kind(),
            ErrorKind::Authentication
        );
    }

    #[test]
    fn test_blank_helpers() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" Ada ".to_string())), Some("Ada".to_string()));
        assert_eq!(non_blank(None), None);
        assert!(required("name", " ").is_err());
        assert_eq!(required("name", " Ada").unwrap(), "Ada");
    }
}
