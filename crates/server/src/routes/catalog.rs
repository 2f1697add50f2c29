//! Public catalog reads.

use axum::extract::State;

use bazaar_core::{CategoryId, ProductId};

use super::extract::{Envelope, PathParam};
use crate::error::Result;
use crate::models::{Category, Product};
use crate::state::AppState;

/// `GET /products`
pub async fn products(State(state): State<AppState>) -> Result<Envelope<Vec<Product>>> {
    let products = state.catalog().list_products().await?;
    Ok(Envelope::new("products fetched", products))
}

/// `GET /products/{id}`
pub async fn product(
    State(state): State<AppState>,
    PathParam(id): PathParam<ProductId>,
) -> Result<Envelope<Product>> {
    let product = state.catalog().get_product(id).await?;
    Ok(Envelope::new("product fetched", product))
}

/// `GET /categories`
pub async fn categories(State(state): State<AppState>) -> Result<Envelope<Vec<Category>>> {
    let categories = state.catalog().list_categories().await?;
    Ok(Envelope::new("categories fetched", categories))
}

/// `GET /categories/{id}`
pub async fn category(
    State(state): State<AppState>,
    PathParam(id): PathParam<CategoryId>,
) -> Result<Envelope<Category>> {
    let category = state.catalog().get_category(id).await?;
    Ok(Envelope::new("category fetched", category))
}
