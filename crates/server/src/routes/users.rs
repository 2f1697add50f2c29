//! Account, verification and profile handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::VerificationCode;

use super::extract::{Envelope, JsonBody, TokenData};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{AddressPatch, NewAddress};
use crate::services::identity::{NewProfile, Profile, ProfileUpdate};
use crate::services::seller::SellerApplication;
use crate::state::AppState;

/// Sign-up request body.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: u32,
}

/// `data` of the code request; the code itself only in development setups.
#[derive(Debug, Serialize)]
pub struct CodeSent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<VerificationCode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub post_code: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub address: AddressRequest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressUpdateRequest {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub post_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: AddressUpdateRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BecomeSellerRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub account_number: String,
    pub swift_code: String,
    pub payment_type: String,
}

/// `POST /users/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignUpRequest>,
) -> Result<Envelope<TokenData>> {
    let token = state
        .identity()
        .sign_up(&req.email, &req.password, &req.phone)
        .await?;
    Ok(Envelope::new("sign up successful", TokenData { token }))
}

/// `POST /users/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Envelope<TokenData>> {
    let token = state.identity().login(&req.email, &req.password).await?;
    Ok(Envelope::new("login successful", TokenData { token }))
}

/// `GET /users/verifycode`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn request_code(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Envelope<CodeSent>> {
    let code = state
        .identity()
        .request_verification_code(user.user_id)
        .await?;
    let code = state.config().expose_verification_code.then_some(code);
    Ok(Envelope::new("verification code sent", CodeSent { code }))
}

/// `POST /users/verify`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<Envelope<()>> {
    state.identity().verify_code(user.user_id, req.code).await?;
    Ok(Envelope::new("verification successful", ()))
}

/// `POST /users/profile`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateProfileRequest>,
) -> Result<Envelope<Profile>> {
    let profile = NewProfile {
        first_name: req.first_name,
        last_name: req.last_name,
        address: NewAddress {
            line1: req.address.line1,
            line2: req.address.line2,
            city: req.address.city,
            post_code: req.address.post_code,
            country: req.address.country,
        },
    };
    let profile = state
        .identity()
        .create_profile(user.user_id, profile)
        .await?;
    Ok(Envelope::new("profile created", profile))
}

/// `GET /users/profile`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Envelope<Profile>> {
    let profile = state.identity().get_profile(user.user_id).await?;
    Ok(Envelope::new("profile fetched", profile))
}

/// `PATCH /users/profile`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Envelope<Profile>> {
    let update = ProfileUpdate {
        first_name: req.first_name,
        last_name: req.last_name,
        address: AddressPatch {
            line1: req.address.line1,
            line2: req.address.line2,
            city: req.address.city,
            post_code: req.address.post_code,
            country: req.address.country,
        },
    };
    let profile = state
        .identity()
        .update_profile(user.user_id, update)
        .await?;
    Ok(Envelope::new("profile updated", profile))
}

/// `POST /users/become-seller`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn become_seller(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<BecomeSellerRequest>,
) -> Result<Envelope<TokenData>> {
    let application = SellerApplication {
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        account_number: req.account_number,
        swift_code: req.swift_code,
        payment_type: req.payment_type,
    };
    let token = state
        .seller()
        .become_seller(user.user_id, application)
        .await?;
    Ok(Envelope::new("seller account activated", TokenData { token }))
}
