//! Identity and phone verification.
//!
//! Owns the account lifecycle: sign-up, login, the verification code
//! workflow and the user's profile (names plus a single address).
//!
//! Verification is one-way: `Unverified -> Unverified(code set) -> Verified`.
//! A verified user can never request or submit a code again.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use bazaar_core::{Email, PhoneNumber, Role, UserId, VerificationCode};

use super::credentials::{self, Credentials};
use super::notification::Notifier;
use super::{ServiceError, non_blank, required};
use crate::db::{RepositoryError, Store};
use crate::models::{
    Address, AddressPatch, CartLine, NewAddress, NewProfileRecord, NewUser, Order, UserPatch,
};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Input for [`IdentityService::create_profile`].
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub first_name: String,
    pub last_name: String,
    pub address: NewAddress,
}

/// Input for [`IdentityService::update_profile`].
///
/// Every field is optional; blank values are ignored.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: AddressPatch,
}

/// Everything the account page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub email: Email,
    pub phone: PhoneNumber,
    pub role: Role,
    pub verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<Address>,
    pub cart: Vec<CartLine>,
    pub orders: Vec<Order>,
}

/// Account and verification workflows.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
    credentials: Arc<Credentials>,
    notifier: Arc<dyn Notifier>,
    code_ttl: Duration,
}

impl IdentityService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        credentials: Arc<Credentials>,
        notifier: Arc<dyn Notifier>,
        code_ttl: Duration,
    ) -> Self {
        Self {
            store,
            credentials,
            notifier,
            code_ttl,
        }
    }

    /// Register a new buyer and return a session token.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email, phone or a short
    /// password, and `ServiceError::DuplicateEmail` if the email is taken.
    #[tracing::instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<String, ServiceError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let phone = PhoneNumber::parse(phone)?;

        let password_hash = self.credentials.hash_password(password)?;

        let user = self
            .store
            .create_user(NewUser {
                email,
                password_hash,
                phone,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::DuplicateEmail,
                other => ServiceError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(self
            .credentials
            .issue_token(user.id, &user.email, user.role)?)
    }

    /// Authenticate with email and password and return a session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UserNotFound` for an unknown email and
    /// `ServiceError::InvalidCredentials` for a wrong password.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if !self.credentials.verify_password(password, &password_hash) {
            return Err(ServiceError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(self
            .credentials
            .issue_token(user.id, &user.email, user.role)?)
    }

    /// Generate, store and send a fresh verification code.
    ///
    /// Any earlier code is replaced. Delivery failures are logged and do not
    /// fail the call; the stored code stays valid.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::AlreadyVerified` if the phone is verified.
    #[tracing::instrument(skip(self))]
    pub async fn request_verification_code(
        &self,
        user_id: UserId,
    ) -> Result<VerificationCode, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        if user.verified {
            return Err(ServiceError::AlreadyVerified);
        }

        let code = credentials::generate_verification_code()?;
        let expires_at = Utc::now() + self.code_ttl;
        self.store
            .set_verification_code(user_id, code, expires_at)
            .await?;

        if let Err(e) = self.notifier.deliver_code(&user.phone, code).await {
            tracing::warn!(error = %e, "failed to deliver verification code");
        }

        Ok(code)
    }

    /// Confirm the pending verification code.
    ///
    /// # Errors
    ///
    /// Fails with `AlreadyVerified`, `NoPendingCode`, `CodeExpired` or
    /// `CodeMismatch`, checked in that order.
    #[tracing::instrument(skip(self, submitted))]
    pub async fn verify_code(&self, user_id: UserId, submitted: u32) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        if user.verified {
            return Err(ServiceError::AlreadyVerified);
        }

        let pending = user.pending_code.ok_or(ServiceError::NoPendingCode)?;
        if pending.is_expired(Utc::now()) {
            return Err(ServiceError::CodeExpired);
        }
        if pending.code.get() != submitted {
            return Err(ServiceError::CodeMismatch);
        }

        self.store.mark_verified(user_id).await?;
        tracing::info!("phone verified");
        Ok(())
    }

    /// Set the user's names and create their address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ProfileExists` if an address already exists.
    #[tracing::instrument(skip(self, profile))]
    pub async fn create_profile(
        &self,
        user_id: UserId,
        profile: NewProfile,
    ) -> Result<Profile, ServiceError> {
        let first_name = required("firstName", &profile.first_name)?;
        let last_name = required("lastName", &profile.last_name)?;
        let address = NewAddress {
            line1: required("line1", &profile.address.line1)?,
            line2: non_blank(profile.address.line2),
            city: required("city", &profile.address.city)?,
            post_code: required("postCode", &profile.address.post_code)?,
            country: required("country", &profile.address.country)?,
        };

        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        self.store
            .create_profile(
                user_id,
                NewProfileRecord {
                    first_name,
                    last_name,
                    address,
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::ProfileExists,
                other => ServiceError::Repository(other),
            })?;
        tracing::info!("profile created");

        self.get_profile(user_id).await
    }

    /// Load the user's profile with their cart and orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UserNotFound` if the user is gone.
    #[tracing::instrument(skip(self))]
    pub async fn get_profile(&self, user_id: UserId) -> Result<Profile, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let address = self.store.find_address(user_id).await?;
        let cart = self.store.list_cart_lines(user_id).await?;
        let orders = self.store.list_orders(user_id).await?;

        Ok(Profile {
            id: user.id,
            email: user.email,
            phone: user.phone,
            role: user.role,
            verified: user.verified,
            first_name: user.first_name,
            last_name: user.last_name,
            address,
            cart,
            orders,
        })
    }

    /// Overwrite the non-blank fields of `update` on the user and address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ProfileMissing` when address fields are given
    /// but no address has been created yet.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, ServiceError> {
        let user_patch = UserPatch {
            first_name: non_blank(update.first_name),
            last_name: non_blank(update.last_name),
        };
        let address_patch = AddressPatch {
            line1: non_blank(update.address.line1),
            line2: non_blank(update.address.line2),
            city: non_blank(update.address.city),
            post_code: non_blank(update.address.post_code),
            country: non_blank(update.address.country),
        };

        if !user_patch.is_empty() {
            self.store
                .update_user(user_id, user_patch)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => ServiceError::UserNotFound,
                    other => ServiceError::Repository(other),
                })?;
        }
        if !address_patch.is_empty() {
            self.store
                .update_address(user_id, address_patch)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => ServiceError::ProfileMissing,
                    other => ServiceError::Repository(other),
                })?;
        }

        self.get_profile(user_id).await
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
