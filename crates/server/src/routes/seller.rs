//! Seller catalog management.
//!
//! Every handler takes a [`SellerUser`], so buyers get `403` before any
//! lookup. Product writes are further restricted to the owning seller.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{CategoryId, ProductId};

use super::extract::{Envelope, JsonBody, PathParam};
use crate::error::Result;
use crate::middleware::SellerUser;
use crate::models::{Category, Product};
use crate::services::catalog::{CategoryInput, CategoryUpdate, ProductInput, ProductUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub stock: u32,
}

// =============================================================================
// Categories
// =============================================================================

/// `POST /seller/categories`
#[instrument(skip_all, fields(user_id = %seller.0.user_id))]
pub async fn create_category(
    State(state): State<AppState>,
    seller: SellerUser,
    JsonBody(req): JsonBody<CreateCategoryRequest>,
) -> Result<Envelope<Category>> {
    let category = state
        .catalog()
        .create_category(CategoryInput {
            name: req.name,
            parent_id: req.parent_id,
            image_url: req.image_url,
            display_order: req.display_order,
        })
        .await?;
    Ok(Envelope::new("category created", category))
}

/// `PATCH /seller/categories/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, category_id = %id))]
pub async fn update_category(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<CategoryId>,
    JsonBody(req): JsonBody<UpdateCategoryRequest>,
) -> Result<Envelope<Category>> {
    let category = state
        .catalog()
        .update_category(
            id,
            CategoryUpdate {
                name: req.name,
                parent_id: req.parent_id,
                image_url: req.image_url,
                display_order: req.display_order,
            },
        )
        .await?;
    Ok(Envelope::new("category updated", category))
}

/// `DELETE /seller/categories/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, category_id = %id))]
pub async fn delete_category(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<CategoryId>,
) -> Result<Envelope<()>> {
    state.catalog().delete_category(id).await?;
    Ok(Envelope::new("category deleted", ()))
}

// =============================================================================
// Products
// =============================================================================

/// `POST /seller/products`
#[instrument(skip_all, fields(user_id = %seller.0.user_id))]
pub async fn create_product(
    State(state): State<AppState>,
    seller: SellerUser,
    JsonBody(req): JsonBody<CreateProductRequest>,
) -> Result<Envelope<Product>> {
    let product = state
        .catalog()
        .create_product(
            seller.0.user_id,
            ProductInput {
                name: req.name,
                description: req.description,
                category_id: req.category_id,
                image_url: req.image_url,
                price: req.price,
                stock: req.stock,
            },
        )
        .await?;
    Ok(Envelope::new("product created", product))
}

/// `GET /seller/products`
#[instrument(skip_all, fields(user_id = %seller.0.user_id))]
pub async fn products(
    State(state): State<AppState>,
    seller: SellerUser,
) -> Result<Envelope<Vec<Product>>> {
    let products = state
        .catalog()
        .list_seller_products(seller.0.user_id)
        .await?;
    Ok(Envelope::new("products fetched", products))
}

/// `GET /seller/products/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, product_id = %id))]
pub async fn product(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<ProductId>,
) -> Result<Envelope<Product>> {
    let product = state.catalog().owned_product(seller.0.user_id, id).await?;
    Ok(Envelope::new("product fetched", product))
}

/// `PATCH /seller/products/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, product_id = %id))]
pub async fn update_product(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<ProductId>,
    JsonBody(req): JsonBody<UpdateProductRequest>,
) -> Result<Envelope<Product>> {
    let product = state
        .catalog()
        .update_product(
            seller.0.user_id,
            id,
            ProductUpdate {
                name: req.name,
                description: req.description,
                category_id: req.category_id,
                image_url: req.image_url,
                price: req.price,
            },
        )
        .await?;
    Ok(Envelope::new("product updated", product))
}

/// `PUT /seller/products/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, product_id = %id))]
pub async fn update_stock(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<ProductId>,
    JsonBody(req): JsonBody<StockRequest>,
) -> Result<Envelope<Product>> {
    let product = state
        .catalog()
        .update_stock(seller.0.user_id, id, req.stock)
        .await?;
    Ok(Envelope::new("stock updated", product))
}

/// `DELETE /seller/products/{id}`
#[instrument(skip_all, fields(user_id = %seller.0.user_id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    seller: SellerUser,
    PathParam(id): PathParam<ProductId>,
) -> Result<Envelope<()>> {
    state.catalog().delete_product(seller.0.user_id, id).await?;
    Ok(Envelope::new("product deleted", ()))
}
