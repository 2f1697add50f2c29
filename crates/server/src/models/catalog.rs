//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{CategoryId, Price, ProductId, UserId};

/// A node in the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// `None` for top-level categories.
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub display_order: i32,
}

/// A seller-owned catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub image_url: Option<String>,
    pub price: Price,
    pub stock: u32,
    /// Owner; the only user allowed to modify the product.
    pub seller_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Largest stock level the `products.stock` column can hold.
    pub const MAX_STOCK: u32 = i32::MAX.unsigned_abs();

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.seller_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: UserId,
    pub name: String,
    pub description: String,
    pub category_id: CategoryId,
    pub image_url: Option<String>,
    pub price: Price,
    pub stock: u32,
}

/// Partial product edit; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub price: Option<Price>,
}
