//! `PostgreSQL` category and product storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{CategoryId, Price, ProductId, UserId};

use super::{CatalogStore, PgStore, RepositoryError, map_constraint};
use crate::models::{Category, NewCategory, NewProduct, Product, ProductPatch};

macro_rules! category_columns {
    () => {
        "id, name, parent_id, image_url, display_order, created_at, updated_at"
    };
}

macro_rules! product_columns {
    () => {
        "id, name, description, category_id, image_url, price, stock, seller_id, \
         created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    parent_id: Option<CategoryId>,
    image_url: Option<String>,
    display_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    category_id: CategoryId,
    image_url: Option<String>,
    price: Price,
    stock: i32,
    seller_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            image_url: row.image_url,
            display_order: row.display_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.stock, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            image_url: row.image_url,
            price: row.price,
            stock,
            seller_id: row.seller_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn stock_column(stock: u32) -> Result<i32, RepositoryError> {
    i32::try_from(stock).map_err(|_| RepositoryError::Conflict(format!("stock {stock} is too large")))
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            "INSERT INTO categories (name, parent_id, image_url, display_order) ",
            "VALUES ($1, $2, $3, $4) RETURNING ",
            category_columns!()
        ))
        .bind(category.name)
        .bind(category.parent_id)
        .bind(category.image_url)
        .bind(category.display_order)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_constraint(e, "category"))?;

        Ok(row.into())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories ORDER BY display_order, id"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Category::from))
    }

    async fn update_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            "UPDATE categories SET name = $2, parent_id = $3, image_url = $4, ",
            "display_order = $5, updated_at = now() WHERE id = $1 RETURNING ",
            category_columns!()
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(&category.image_url)
        .bind(category.display_order)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_constraint(e, "category"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| map_constraint(e, "category"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "INSERT INTO products ",
            "(name, description, category_id, image_url, price, stock, seller_id) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            product_columns!()
        ))
        .bind(product.name)
        .bind(product.description)
        .bind(product.category_id)
        .bind(product.image_url)
        .bind(product.price)
        .bind(stock_column(product.stock)?)
        .bind(product.seller_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_constraint(e, "product"))?;

        row.try_into()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await?;

        into_products(rows)
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products_by_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE seller_id = $1 ORDER BY id"
        ))
        .bind(seller_id)
        .fetch_all(self.pool())
        .await?;

        into_products(rows)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET name = COALESCE($2, name), ",
            "description = COALESCE($3, description), ",
            "category_id = COALESCE($4, category_id), ",
            "image_url = COALESCE($5, image_url), price = COALESCE($6, price), ",
            "updated_at = now() WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.category_id)
        .bind(patch.image_url)
        .bind(patch.price)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_constraint(e, "product"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn update_stock(&self, id: ProductId, stock: u32) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET stock = $2, updated_at = now() WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(stock_column(stock)?)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        // cart_lines.product_id cascades
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
