//! `PostgreSQL` order storage.
//!
//! Checkout runs as a single transaction: guarded stock decrements, the order
//! and its items, then the cart delete. Any failure rolls the whole unit back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bazaar_core::{OrderId, OrderItemId, OrderReference, Price, ProductId, Quantity, UserId};

use super::{OrderStore, PgStore, RepositoryError, map_constraint};
use crate::models::{NewOrder, Order, OrderItem};

macro_rules! order_columns {
    () => {
        "id, user_id, reference, amount, payment_id, transaction_id, created_at"
    };
}

macro_rules! order_item_columns {
    () => {
        "id, order_id, product_id, name, image_url, price, quantity, seller_id"
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    reference: OrderReference,
    amount: Decimal,
    payment_id: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    image_url: Option<String>,
    price: Price,
    quantity: Quantity,
    seller_id: UserId,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            image_url: row.image_url,
            price: row.price,
            quantity: row.quantity,
            seller_id: row.seller_id,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            reference: self.reference,
            amount: self.amount,
            payment_id: self.payment_id,
            transaction_id: self.transaction_id,
            items,
            created_at: self.created_at,
        }
    }
}

impl PgStore {
    /// Load the items of `orders` with one query and attach them.
    async fn attach_items(&self, orders: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let rows = sqlx::query_as::<_, OrderItemRow>(concat!(
            "SELECT ",
            order_item_columns!(),
            " FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = by_order.remove(&o.id).unwrap_or_default();
                o.into_order(items)
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Lock products in id order so concurrent checkouts cannot deadlock.
        let mut reservations: Vec<_> = order.items.iter().collect();
        reservations.sort_by_key(|item| item.product_id);
        for item in reservations {
            let reserved = sqlx::query(
                r"
                UPDATE products
                SET stock = stock - $2, updated_at = now()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                return Err(RepositoryError::InsufficientStock(item.product_id));
            }
        }

        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "INSERT INTO orders (user_id, reference, amount) VALUES ($1, $2, $3) RETURNING ",
            order_columns!()
        ))
        .bind(order.user_id)
        .bind(order.reference)
        .bind(order.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "order reference"))?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let item_row = sqlx::query_as::<_, OrderItemRow>(concat!(
                "INSERT INTO order_items ",
                "(order_id, product_id, name, image_url, price, quantity, seller_id) ",
                "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
                order_item_columns!()
            ))
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.name)
            .bind(item.image_url)
            .bind(item.price)
            .bind(item.quantity)
            .bind(item.seller_id)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item_row));
        }

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into_order(items))
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        self.attach_items(rows).await
    }

    async fn find_order(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.attach_items(vec![row]).await?.pop())
    }
}
