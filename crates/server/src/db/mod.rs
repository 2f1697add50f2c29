//! Persistence gateway.
//!
//! Services talk to storage only through the [`Store`] trait so that the same
//! business rules run against `PostgreSQL` in production ([`PgStore`]) and
//! against in-process tables in tests ([`MemoryStore`]).
//!
//! # Tables
//!
//! - `users` - Accounts, role and phone verification state
//! - `addresses` - One profile address per user
//! - `bank_accounts` - One settlement account per seller
//! - `categories` - Self-referencing category tree
//! - `products` - Seller-owned catalog with stock
//! - `cart_lines` - Per-user cart, unique per `(user_id, product_id)`
//! - `orders` / `order_items` - Immutable order snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

mod carts;
mod catalog;
pub mod memory;
mod orders;
mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{
    CartLineId, CategoryId, Email, OrderId, ProductId, Quantity, UserId, VerificationCode,
};

use crate::models::{
    Address, AddressPatch, BankAccount, CartLine, Category, NewCartLine, NewCategory, NewOrder,
    NewProduct, NewProfileRecord, NewUser, Order, Product, ProductPatch, SellerUpgrade, User,
    UserPatch,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A guarded stock decrement found fewer units than requested.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique and foreign-key violations onto [`RepositoryError::Conflict`].
pub(crate) fn map_constraint(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{what} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(format!("{what} references or is referenced by other rows"));
        }
    }
    RepositoryError::Database(err)
}

// =============================================================================
// Gateway traits
// =============================================================================

/// Users, their profile address and seller bank account.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new buyer. `Conflict` if the email is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError>;

    /// Look up a user together with their password hash.
    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Overwrite the fields present in `patch`. `NotFound` if the user is gone.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, RepositoryError>;

    /// Store a pending verification code, replacing any previous one.
    async fn set_verification_code(
        &self,
        id: UserId,
        code: VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Flag the user as verified and discard the pending code.
    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError>;

    /// Set the user's names and insert their address in one unit.
    ///
    /// `Conflict` if the user already has an address; the names are left
    /// untouched in that case.
    async fn create_profile(
        &self,
        user_id: UserId,
        profile: NewProfileRecord,
    ) -> Result<(User, Address), RepositoryError>;

    async fn find_address(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError>;

    /// `NotFound` if the user has no address yet.
    async fn update_address(
        &self,
        user_id: UserId,
        patch: AddressPatch,
    ) -> Result<Address, RepositoryError>;

    /// Promote a buyer and attach their bank account in one unit.
    ///
    /// `Conflict` if the user is no longer a buyer or the account number is
    /// already registered; nothing is written in either case.
    async fn upgrade_to_seller(
        &self,
        id: UserId,
        upgrade: SellerUpgrade,
    ) -> Result<User, RepositoryError>;

    async fn find_bank_account(
        &self,
        user_id: UserId,
    ) -> Result<Option<BankAccount>, RepositoryError>;
}

/// Cart lines, keyed by `(user, product)`.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Lines in insertion order.
    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// `Conflict` if a line for the same product already exists.
    async fn create_cart_line(&self, line: NewCartLine) -> Result<CartLine, RepositoryError>;

    async fn update_cart_line(
        &self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError>;

    async fn delete_cart_line(&self, id: CartLineId) -> Result<(), RepositoryError>;

    /// Returns the number of lines removed.
    async fn delete_all_cart_lines(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}

/// Orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Reserve stock, insert the order with its items and empty the buyer's
    /// cart as one all-or-nothing unit.
    ///
    /// Fails with `InsufficientStock` if any product cannot cover its line and
    /// with `Conflict` if the order reference is already taken.
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Only returns the order if it belongs to `user_id`.
    async fn find_order(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Write every editable field of `category`.
    async fn update_category(&self, category: &Category) -> Result<Category, RepositoryError>;

    /// `Conflict` while products or child categories reference it.
    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError>;

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find_product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn list_products_by_seller(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Overwrite the fields present in `patch`; stock is not touched.
    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, RepositoryError>;

    async fn update_stock(&self, id: ProductId, stock: u32) -> Result<Product, RepositoryError>;

    /// Also removes cart lines pointing at the product.
    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// The full persistence gateway.
#[async_trait]
pub trait Store: UserStore + CartStore + OrderStore + CatalogStore {
    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// [`Store`] backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
