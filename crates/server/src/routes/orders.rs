//! Checkout and order history handlers.

use axum::extract::State;
use tracing::instrument;

use bazaar_core::OrderId;

use super::extract::{Envelope, PathParam};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::Order;
use crate::state::AppState;

/// `POST /users/order`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn place(State(state): State<AppState>, user: AuthUser) -> Result<Envelope<Order>> {
    let order = state.orders().place_order(user.user_id).await?;
    Ok(Envelope::new("order placed", order))
}

/// `GET /users/order`
#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn index(State(state): State<AppState>, user: AuthUser) -> Result<Envelope<Vec<Order>>> {
    let orders = state.orders().list_orders(user.user_id).await?;
    Ok(Envelope::new("orders fetched", orders))
}

/// `GET /users/order/{id}`
#[instrument(skip_all, fields(user_id = %user.user_id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
    PathParam(id): PathParam<OrderId>,
) -> Result<Envelope<Order>> {
    let order = state.orders().get_order(id, user.user_id).await?;
    Ok(Envelope::new("order fetched", order))
}
