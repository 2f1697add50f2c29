//! Buyer to seller upgrade.

use std::sync::Arc;

use bazaar_core::{PhoneNumber, Role, UserId};

use super::credentials::Credentials;
use super::{ServiceError, required};
use crate::db::{RepositoryError, Store};
use crate::models::{NewBankAccount, SellerUpgrade};

/// Fields a buyer submits to become a seller.
#[derive(Debug, Clone)]
pub struct SellerApplication {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub account_number: String,
    pub swift_code: String,
    pub payment_type: String,
}

/// Promotes verified buyers to sellers.
#[derive(Clone)]
pub struct SellerService {
    store: Arc<dyn Store>,
    credentials: Arc<Credentials>,
}

impl SellerService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, credentials: Arc<Credentials>) -> Self {
        Self { store, credentials }
    }

    /// Upgrade the user to a seller and return a token carrying the new role.
    ///
    /// The role change and bank account are written together; the token is
    /// only issued once both are stored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::AlreadySeller`, `ServiceError::NotVerified` or
    /// `ServiceError::DuplicateBankAccount`, plus validation errors for the
    /// submitted fields.
    #[tracing::instrument(skip(self, application))]
    pub async fn become_seller(
        &self,
        user_id: UserId,
        application: SellerApplication,
    ) -> Result<String, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        if user.role.is_seller() {
            return Err(ServiceError::AlreadySeller);
        }
        if !user.verified {
            return Err(ServiceError::NotVerified);
        }

        let upgrade = SellerUpgrade {
            first_name: required("firstName", &application.first_name)?,
            last_name: required("lastName", &application.last_name)?,
            phone: PhoneNumber::parse(&application.phone)?,
            bank_account: NewBankAccount {
                account_number: normalize_account_number(&application.account_number)?,
                swift_code: normalize_swift_code(&application.swift_code)?,
                payment_type: required("paymentType", &application.payment_type)?,
            },
        };

        let seller = match self.store.upgrade_to_seller(user_id, upgrade).await {
            Ok(seller) => seller,
            Err(RepositoryError::Conflict(_)) => return Err(self.explain_conflict(user_id).await),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("user upgraded to seller");
        Ok(self
            .credentials
            .issue_token(seller.id, &seller.email, Role::Seller)?)
    }

    /// A conflicting upgrade is either a concurrent upgrade of the same user
    /// or an account number registered to someone else.
    async fn explain_conflict(&self, user_id: UserId) -> ServiceError {
        match self.store.find_user_by_id(user_id).await {
            Ok(Some(user)) if user.role.is_seller() => ServiceError::AlreadySeller,
            Ok(_) => ServiceError::DuplicateBankAccount,
            Err(e) => e.into(),
        }
    }
}

/// Strip spaces and uppercase; 4 to 34 alphanumeric characters (IBAN size).
fn normalize_account_number(raw: &str) -> Result<String, ServiceError> {
    let value: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    if !(4..=34).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::Validation(
            "bank account number must be 4 to 34 letters or digits".to_string(),
        ));
    }
    Ok(value)
}

/// SWIFT/BIC codes are 8 or 11 alphanumeric characters.
fn normalize_swift_code(raw: &str) -> Result<String, ServiceError> {
    let value = raw.trim().to_ascii_uppercase();

    if !matches!(value.len(), 8 | 11) || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::Validation(
            "SWIFT code must be 8 or 11 letters or digits".to_string(),
        ));
    }
    Ok(value)
}
