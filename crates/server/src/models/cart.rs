//! Cart domain types.

use serde::Serialize;

use bazaar_core::{CartLineId, Price, ProductId, Quantity, UserId};

use super::Product;

/// One product in a buyer's cart.
///
/// Name, image, price and seller are copied from the product when the line is
/// first created; later catalog edits do not change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Price,
    #[serde(rename = "qty")]
    pub quantity: Quantity,
    pub seller_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Price,
    pub quantity: Quantity,
    pub seller_id: UserId,
}

impl NewCartLine {
    /// Snapshot the commercial facts of `product` for `user_id`.
    #[must_use]
    pub fn snapshot(user_id: UserId, product: &Product, quantity: Quantity) -> Self {
        Self {
            user_id,
            product_id: product.id,
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            quantity,
            seller_id: product.seller_id,
        }
    }
}
