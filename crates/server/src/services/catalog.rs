//! Category tree and seller-owned products.
//!
//! Reads are public. Any seller may manage categories; products can only be
//! changed by the seller who owns them.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use bazaar_core::{CategoryId, Price, ProductId, UserId};

use super::{ServiceError, non_blank, required};
use crate::db::{RepositoryError, Store};
use crate::models::{Category, NewCategory, NewProduct, Product, ProductPatch};

/// Input for [`CatalogService::create_category`].
#[derive(Debug, Clone, Default)]
pub struct CategoryInput {
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub display_order: i32,
}

/// Partial category edit; absent or blank fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub display_order: Option<i32>,
}

/// Input for [`CatalogService::create_product`].
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock: u32,
}

/// Partial product edit; absent or blank fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
}

/// Catalog management.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ServiceError::CategoryNotFound` if the parent does not exist.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, ServiceError> {
        let name = required("name", &input.name)?;
        if let Some(parent_id) = input.parent_id {
            self.category(parent_id).await?;
        }

        let category = self
            .store
            .create_category(NewCategory {
                name,
                parent_id: input.parent_id,
                image_url: non_blank(input.image_url),
                display_order: input.display_order,
            })
            .await
            .map_err(category_error)?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::CategoryNotFound` for an unknown id.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, ServiceError> {
        self.category(id).await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::CategoryNotFound` for an unknown category or
    /// parent, and a validation error if the new parent lies below the
    /// category in the tree.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: CategoryUpdate,
    ) -> Result<Category, ServiceError> {
        let mut category = self.category(id).await?;

        if let Some(name) = non_blank(update.name) {
            category.name = name;
        }
        if let Some(parent_id) = update.parent_id {
            self.check_ancestry(id, parent_id).await?;
            category.parent_id = Some(parent_id);
        }
        if let Some(image_url) = non_blank(update.image_url) {
            category.image_url = Some(image_url);
        }
        if let Some(display_order) = update.display_order {
            category.display_order = display_order;
        }

        self.store
            .update_category(&category)
            .await
            .map_err(category_error)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::CategoryInUse` while products or child
    /// categories still reference it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), ServiceError> {
        self.store.delete_category(id).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ServiceError::CategoryInUse,
            other => category_error(other),
        })?;
        tracing::info!("category deleted");
        Ok(())
    }

    /// Walk up from `parent_id` and fail if the chain reaches `id`.
    async fn check_ancestry(
        &self,
        id: CategoryId,
        parent_id: CategoryId,
    ) -> Result<(), ServiceError> {
        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if current == id {
                return Err(ServiceError::Validation(
                    "a category cannot be its own ancestor".to_string(),
                ));
            }
            if !seen.insert(current) {
                break;
            }
            cursor = self.category(current).await?.parent_id;
        }
        Ok(())
    }

    async fn category(&self, id: CategoryId) -> Result<Category, ServiceError> {
        self.store
            .find_category(id)
            .await?
            .ok_or(ServiceError::CategoryNotFound)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns a validation error for a blank name, a non-positive price or
    /// stock above [`Product::MAX_STOCK`], and `ServiceError::CategoryNotFound`
    /// for an unknown category.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        seller_id: UserId,
        input: ProductInput,
    ) -> Result<Product, ServiceError> {
        let name = required("name", &input.name)?;
        let price = Price::new(input.price)?;
        check_stock(input.stock)?;
        self.category(input.category_id).await?;

        let product = self
            .store
            .create_product(NewProduct {
                seller_id,
                name,
                description: non_blank(input.description).unwrap_or_default(),
                category_id: input.category_id,
                image_url: non_blank(input.image_url),
                price,
                stock: input.stock,
            })
            .await
            .map_err(category_error)?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::ProductNotFound` for an unknown id.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .find_product_by_id(id)
            .await?
            .ok_or(ServiceError::ProductNotFound)
    }

    /// Products owned by `seller_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_seller_products(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products_by_seller(seller_id).await?)
    }

    /// Load a product and check that `caller` owns it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ProductNotFound` or `ServiceError::NotOwner`.
    pub async fn owned_product(
        &self,
        caller: UserId,
        id: ProductId,
    ) -> Result<Product, ServiceError> {
        let product = self.get_product(id).await?;
        if !product.is_owned_by(caller) {
            return Err(ServiceError::NotOwner);
        }
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotOwner` if `caller` does not own the product
    /// and a validation error when nothing would change.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        caller: UserId,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ServiceError> {
        self.owned_product(caller, id).await?;

        let patch = ProductPatch {
            name: non_blank(update.name),
            description: non_blank(update.description),
            category_id: update.category_id,
            image_url: non_blank(update.image_url),
            price: update.price.map(Price::new).transpose()?,
        };
        if let Some(category_id) = patch.category_id {
            self.category(category_id).await?;
        }
        if patch.name.is_none()
            && patch.description.is_none()
            && patch.category_id.is_none()
            && patch.image_url.is_none()
            && patch.price.is_none()
        {
            return Err(ServiceError::Validation("no fields to update".to_string()));
        }

        self.store
            .update_product(id, patch)
            .await
            .map_err(product_error)
    }

    /// Replace the stock level.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotOwner` if `caller` does not own the product
    /// and `ServiceError::NoChange` if the stock is already `stock`. Stock
    /// above [`Product::MAX_STOCK`] is a validation error.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock(
        &self,
        caller: UserId,
        id: ProductId,
        stock: u32,
    ) -> Result<Product, ServiceError> {
        check_stock(stock)?;
        let product = self.owned_product(caller, id).await?;
        if product.stock == stock {
            return Err(ServiceError::NoChange);
        }

        let product = self
            .store
            .update_stock(id, stock)
            .await
            .map_err(product_error)?;
        tracing::info!(stock, "stock updated");
        Ok(product)
    }

    /// Delete the product along with any cart lines pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotOwner` if `caller` does not own the product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, caller: UserId, id: ProductId) -> Result<(), ServiceError> {
        self.owned_product(caller, id).await?;
        self.store.delete_product(id).await.map_err(product_error)?;
        tracing::info!("product deleted");
        Ok(())
    }
}

fn check_stock(stock: u32) -> Result<(), ServiceError> {
    if stock > Product::MAX_STOCK {
        return Err(ServiceError::Validation(format!(
            "stock must be at most {}",
            Product::MAX_STOCK
        )));
    }
    Ok(())
}

fn category_error(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::CategoryNotFound,
        other => ServiceError::Repository(other),
    }
}

fn product_error(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::NotFound => ServiceError::ProductNotFound,
        other => ServiceError::Repository(other),
    }
}
