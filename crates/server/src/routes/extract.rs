//! Request extractors and the success envelope.
//!
//! Axum's own `Json` and `Path` reject with plain-text bodies. These wrappers
//! reject through [`AppError`] so malformed input gets the same JSON error
//! envelope as every other failure.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// JSON request body; malformed bodies become `400 validation`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Path parameters; unparsable segments become `400 validation`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// Success body: `{ "message": ..., "data": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub const fn new(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `data` payload for endpoints that hand out a session token.
#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}
