//! `PostgreSQL` cart storage.

use async_trait::async_trait;

use bazaar_core::{CartLineId, Price, ProductId, Quantity, UserId};

use super::{CartStore, PgStore, RepositoryError, map_constraint};
use crate::models::{CartLine, NewCartLine};

macro_rules! cart_line_columns {
    () => {
        "id, user_id, product_id, name, image_url, price, quantity, seller_id"
    };
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    user_id: UserId,
    product_id: ProductId,
    name: String,
    image_url: Option<String>,
    price: Price,
    quantity: Quantity,
    seller_id: UserId,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            name: row.name,
            image_url: row.image_url,
            price: row.price,
            quantity: row.quantity,
            seller_id: row.seller_id,
        }
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(concat!(
            "SELECT ",
            cart_line_columns!(),
            " FROM cart_lines WHERE user_id = $1 AND product_id = $2"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(CartLine::from))
    }

    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(concat!(
            "SELECT ",
            cart_line_columns!(),
            " FROM cart_lines WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn create_cart_line(&self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(concat!(
            "INSERT INTO cart_lines (user_id, product_id, name, image_url, price, quantity, seller_id) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            cart_line_columns!()
        ))
        .bind(line.user_id)
        .bind(line.product_id)
        .bind(line.name)
        .bind(line.image_url)
        .bind(line.price)
        .bind(line.quantity)
        .bind(line.seller_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_constraint(e, "cart line"))?;

        Ok(row.into())
    }

    async fn update_cart_line(
        &self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(concat!(
            "UPDATE cart_lines SET quantity = $2, updated_at = now() WHERE id = $1 RETURNING ",
            cart_line_columns!()
        ))
        .bind(id)
        .bind(quantity)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_cart_line(&self, id: CartLineId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
