//! Order domain types.
//!
//! Orders are written once and never updated. Items hold their own copy of
//! the product facts, so catalog changes after checkout cannot alter history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{OrderId, OrderItemId, OrderReference, Price, ProductId, Quantity, UserId};

use super::CartLine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Human-facing order number.
    pub reference: OrderReference,
    /// Sum of item subtotals at placement time.
    pub amount: Decimal,
    pub payment_id: Option<String>,
    pub transaction_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Price,
    #[serde(rename = "qty")]
    pub quantity: Quantity,
    pub seller_id: UserId,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub reference: OrderReference,
    pub amount: Decimal,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: Price,
    pub quantity: Quantity,
    pub seller_id: UserId,
}

impl NewOrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

impl From<&CartLine> for NewOrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            image_url: line.image_url.clone(),
            price: line.price,
            quantity: line.quantity,
            seller_id: line.seller_id,
        }
    }
}
