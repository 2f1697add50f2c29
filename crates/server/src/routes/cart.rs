//! Cart handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ProductId;

use super::extract::{Envelope, JsonBody};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::CartLine;
use crate::state::AppState;

/// Set a product's quantity; `qty < 1` removes the line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    pub product_id: ProductId,
    pub qty: i64,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub removed: u64,
}

/// `POST /users/cart`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn add_or_update(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CartRequest>,
) -> Result<Envelope<Vec<CartLine>>> {
    let lines = state
        .cart()
        .add_or_update(user.user_id, req.product_id, req.qty)
        .await?;
    Ok(Envelope::new("cart updated", lines))
}

/// `GET /users/cart`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Envelope<Vec<CartLine>>> {
    let lines = state.cart().get_lines(user.user_id).await?;
    Ok(Envelope::new("cart fetched", lines))
}

/// `DELETE /users/cart`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn clear(State(state): State<AppState>, user: AuthUser) -> Result<Envelope<Cleared>> {
    let removed = state.cart().clear_cart(user.user_id).await?;
    Ok(Envelope::new("cart cleared", Cleared { removed }))
}
