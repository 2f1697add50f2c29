//! Cart reconciliation.
//!
//! A cart is keyed by `(user, product)`: callers name products, never cart
//! line ids. Every find-then-write runs under a per-user lock from
//! [`CartLocks`], and the store rejects a second line for the same pair, so
//! concurrent requests cannot produce duplicate lines.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{ProductId, Quantity, UserId};

use super::ServiceError;
use crate::db::Store;
use crate::models::{CartLine, NewCartLine};

/// Per-user async locks shared by cart mutations and checkout.
///
/// Locks of idle users expire after ten minutes.
#[derive(Clone)]
pub struct CartLocks {
    locks: Cache<UserId, Arc<Mutex<()>>>,
}

impl CartLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .time_to_idle(Duration::from_secs(600))
                .build(),
        }
    }

    /// Wait for exclusive access to `user_id`'s cart.
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(user_id, || Arc::new(Mutex::new(())));
        lock.lock_owned().await
    }
}

impl Default for CartLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Buyer cart operations.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    locks: CartLocks,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, locks: CartLocks) -> Self {
        Self { store, locks }
    }

    /// Set the quantity of `product_id` in the cart and return all lines.
    ///
    /// An existing line gets its quantity replaced, or is removed when `qty`
    /// is below one. A new line copies the product's current name, image,
    /// price and seller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ProductNotFound` for an unknown product and
    /// `ServiceError::InvalidQuantity` when adding a new line with `qty < 1`.
    #[tracing::instrument(skip(self))]
    pub async fn add_or_update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        qty: i64,
    ) -> Result<Vec<CartLine>, ServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        match self.store.find_cart_line(user_id, product_id).await? {
            Some(line) if qty < 1 => {
                self.store.delete_cart_line(line.id).await?;
                tracing::debug!(line_id = %line.id, "cart line removed");
            }
            Some(line) => {
                let quantity = Quantity::new(qty).ok_or(ServiceError::InvalidQuantity)?;
                self.store.update_cart_line(line.id, quantity).await?;
            }
            None => {
                let product = self
                    .store
                    .find_product_by_id(product_id)
                    .await?
                    .ok_or(ServiceError::ProductNotFound)?;
                let quantity = Quantity::new(qty).ok_or(ServiceError::InvalidQuantity)?;
                self.store
                    .create_cart_line(NewCartLine::snapshot(user_id, &product, quantity))
                    .await?;
            }
        }

        Ok(self.store.list_cart_lines(user_id).await?)
    }

    /// Current cart lines.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn get_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, ServiceError> {
        Ok(self.store.list_cart_lines(user_id).await?)
    }

    /// Remove every line and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<u64, ServiceError> {
        let _guard = self.locks.acquire(user_id).await;
        Ok(self.store.delete_all_cart_lines(user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::MemoryStore;
    use crate::services::testing;

    use super::*;

    fn service(store: &Arc<MemoryStore>) -> CartService {
        CartService::new(store.clone(), CartLocks::new())
    }

    #[tokio::test]
    async fn test_second_add_replaces_quantity() {
        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let product = testing::seed_product(&store, buyer.id, 1000, 10).await;
        let cart = service(&store);

        cart.add_or_update(buyer.id, product.id, 2).await.unwrap();
        let lines = cart.add_or_update(buyer.id, product.id, 5).await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.get(), 5);
        assert_eq!(lines[0].price, product.price);
        assert_eq!(lines[0].seller_id, buyer.id);
    }

    #[tokio::test]
    async fn test_zero_quantity_removes_line() {
        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let keep = testing::seed_product(&store, buyer.id, 500, 10).await;
        let removed = testing::seed_product(&store, buyer.id, 1000, 10).await;
        let cart = service(&store);

        cart.add_or_update(buyer.id, keep.id, 1).await.unwrap();
        cart.add_or_update(buyer.id, removed.id, 3).await.unwrap();
        let lines = cart.add_or_update(buyer.id, removed.id, 0).await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, keep.id);
        assert_eq!(cart.get_lines(buyer.id).await.unwrap(), lines);
    }

    #[tokio::test]
    async fn test_unknown_product_and_bad_quantity() {
        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let product = testing::seed_product(&store, buyer.id, 500, 10).await;
        let cart = service(&store);

        let err = cart
            .add_or_update(buyer.id, ProductId::new(999), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProductNotFound));

        let err = cart.add_or_update(buyer.id, product.id, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity));

        let err = cart
            .add_or_update(buyer.id, product.id, i64::from(u32::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity));

        assert!(cart.get_lines(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_line_keeps_snapshot_after_price_change() {
        use crate::db::CatalogStore;
        use crate::models::ProductPatch;
        use bazaar_core::Price;
        use rust_decimal::Decimal;

        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let product = testing::seed_product(&store, buyer.id, 500, 10).await;
        let cart = service(&store);
        cart.add_or_update(buyer.id, product.id, 1).await.unwrap();

        store
            .update_product(
                product.id,
                ProductPatch {
                    price: Some(Price::new(Decimal::new(900, 2)).unwrap()),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();
        let lines = cart.add_or_update(buyer.id, product.id, 2).await.unwrap();

        assert_eq!(lines[0].price, product.price);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let a = testing::seed_product(&store, buyer.id, 500, 10).await;
        let b = testing::seed_product(&store, buyer.id, 700, 10).await;
        let cart = service(&store);
        cart.add_or_update(buyer.id, a.id, 1).await.unwrap();
        cart.add_or_update(buyer.id, b.id, 1).await.unwrap();

        assert_eq!(cart.clear_cart(buyer.id).await.unwrap(), 2);
        assert!(cart.get_lines(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_never_duplicate_a_line() {
        let store = Arc::new(MemoryStore::new());
        let buyer = testing::seed_user(&store, "buyer@example.com").await;
        let product = testing::seed_product(&store, buyer.id, 500, 10).await;
        let cart = service(&store);
        let (user_id, product_id) = (buyer.id, product.id);

        let mut handles = Vec::new();
        for qty in 1..=16 {
            let cart = cart.clone();
            handles.push(tokio::spawn(async move {
                cart.add_or_update(user_id, product_id, qty).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let lines = cart.get_lines(buyer.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!((1..=16).contains(&lines[0].quantity.get()));
    }
}
