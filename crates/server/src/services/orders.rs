//! Order assembly.
//!
//! Checkout snapshots the cart into an immutable order. Stock reservation,
//! the order insert and emptying the cart happen in one store call, under
//! the same per-user lock the cart uses.

use std::sync::Arc;

use rust_decimal::Decimal;

use bazaar_core::{OrderId, OrderReference, UserId};

use super::cart::CartLocks;
use super::credentials::{self, CredentialError};
use super::ServiceError;
use crate::db::{RepositoryError, Store};
use crate::models::{NewOrder, NewOrderItem, Order};

/// Draws made before giving up on a free order reference.
const MAX_REFERENCE_ATTEMPTS: usize = 5;

type ReferenceSource = fn() -> Result<OrderReference, CredentialError>;

/// Checkout and order history.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    locks: CartLocks,
    next_reference: ReferenceSource,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, locks: CartLocks) -> Self {
        Self {
            store,
            locks,
            next_reference: credentials::generate_order_reference,
        }
    }

    #[cfg(test)]
    fn with_reference_source(mut self, source: ReferenceSource) -> Self {
        self.next_reference = source;
        self
    }

    /// Turn the user's cart into an order.
    ///
    /// The amount is the sum of line subtotals. A reference that is already
    /// taken is redrawn, up to five times.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::EmptyCart` for an empty cart and
    /// `ServiceError::OutOfStock` if any product cannot cover its line; in
    /// both cases nothing is written.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<Order, ServiceError> {
        let _guard = self.locks.acquire(user_id).await;

        let lines = self.store.list_cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let items: Vec<NewOrderItem> = lines.iter().map(NewOrderItem::from).collect();
        let amount: Decimal = items.iter().map(NewOrderItem::subtotal).sum();

        for attempt in 1..=MAX_REFERENCE_ATTEMPTS {
            let reference = (self.next_reference)()?;
            let order = NewOrder {
                user_id,
                reference,
                amount,
                items: items.clone(),
            };

            match self.store.place_order(order).await {
                Ok(order) => {
                    tracing::info!(
                        order_id = %order.id,
                        reference = %order.reference,
                        %amount,
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(RepositoryError::Conflict(_)) => {
                    tracing::warn!(attempt, %reference, "order reference taken, drawing again");
                }
                Err(RepositoryError::InsufficientStock(product_id)) => {
                    return Err(ServiceError::OutOfStock(product_id));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::ReferenceUnavailable)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` on storage failure.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_orders(user_id).await?)
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::OrderNotFound` if the order does not exist or
    /// belongs to someone else.
    pub async fn get_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order, ServiceError> {
        self.store
            .find_order(order_id, user_id)
            .await?
            .ok_or(ServiceError::OrderNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::db::{CatalogStore, MemoryStore};
    use crate::services::cart::CartService;
    use crate::services::testing;

    use super::*;

    struct Fixture {
        store: Arc<MemoryStore>,
        cart: CartService,
        orders: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let locks = CartLocks::new();
        Fixture {
            cart: CartService::new(store.clone(), locks.clone()),
            orders: OrderService::new(store.clone(), locks),
            store,
        }
    }

    #[tokio::test]
    async fn test_amount_is_sum_of_subtotals() {
        let f = fixture();
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let ten = testing::seed_product(&f.store, buyer.id, 1000, 10).await;
        let five = testing::seed_product(&f.store, buyer.id, 500, 10).await;
        f.cart.add_or_update(buyer.id, ten.id, 2).await.unwrap();
        f.cart.add_or_update(buyer.id, five.id, 1).await.unwrap();

        let order = f.orders.place_order(buyer.id).await.unwrap();

        assert_eq!(order.amount, Decimal::new(25, 0));
        assert_eq!(order.items.len(), 2);
        let subtotal: Decimal = order.items.iter().map(|i| i.subtotal()).sum();
        assert_eq!(subtotal, order.amount);
        assert!(OrderReference::RANGE.contains(&order.reference.as_i32()));
        assert!(f.cart.get_lines(buyer.id).await.unwrap().is_empty());

        let stock = f.store.find_product_by_id(ten.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 8);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let f = fixture();
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;

        let err = f.orders.place_order(buyer.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyCart));
        assert!(f.orders.list_orders(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_stock_leaves_everything_untouched() {
        let f = fixture();
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let plenty = testing::seed_product(&f.store, buyer.id, 1000, 10).await;
        let scarce = testing::seed_product(&f.store, buyer.id, 500, 1).await;
        f.cart.add_or_update(buyer.id, plenty.id, 2).await.unwrap();
        f.cart.add_or_update(buyer.id, scarce.id, 3).await.unwrap();

        let err = f.orders.place_order(buyer.id).await.unwrap_err();

        assert!(matches!(err, ServiceError::OutOfStock(id) if id == scarce.id));
        assert_eq!(f.cart.get_lines(buyer.id).await.unwrap().len(), 2);
        assert!(f.orders.list_orders(buyer.id).await.unwrap().is_empty());
        let stock = f.store.find_product_by_id(plenty.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 10);
    }

    #[tokio::test]
    async fn test_items_survive_catalog_changes() {
        let f = fixture();
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let product = testing::seed_product(&f.store, buyer.id, 1000, 10).await;
        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
        let order = f.orders.place_order(buyer.id).await.unwrap();

        f.store.delete_product(product.id).await.unwrap();

        let stored = f.orders.get_order(order.id, buyer.id).await.unwrap();
        assert_eq!(stored.items[0].name, product.name);
        assert_eq!(stored.items[0].price, product.price);
    }

    #[tokio::test]
    async fn test_orders_are_private() {
        let f = fixture();
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let other = testing::seed_user(&f.store, "other@example.com").await;
        let product = testing::seed_product(&f.store, buyer.id, 1000, 10).await;
        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
        let order = f.orders.place_order(buyer.id).await.unwrap();

        let err = f.orders.get_order(order.id, other.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::OrderNotFound));
        assert!(f.orders.list_orders(other.id).await.unwrap().is_empty());
        assert_eq!(f.orders.list_orders(buyer.id).await.unwrap(), vec![order]);
    }

    static DRAWS: AtomicUsize = AtomicUsize::new(0);

    /// First two draws collide with an existing order, then a fresh value.
    fn colliding_source() -> Result<OrderReference, CredentialError> {
        let draw = DRAWS.fetch_add(1, Ordering::SeqCst);
        let value = if draw < 3 { 11_111_111 } else { 22_222_222 };
        Ok(OrderReference::new(value).unwrap())
    }

    #[tokio::test]
    async fn test_taken_reference_is_redrawn() {
        let f = fixture();
        let orders = f.orders.clone().with_reference_source(colliding_source);
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let product = testing::seed_product(&f.store, buyer.id, 1000, 10).await;

        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
        let first = orders.place_order(buyer.id).await.unwrap();
        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
        let second = orders.place_order(buyer.id).await.unwrap();

        assert_eq!(first.reference.as_i32(), 11_111_111);
        assert_eq!(second.reference.as_i32(), 22_222_222);
        assert_eq!(DRAWS.load(Ordering::SeqCst), 4);
    }

    fn constant_source() -> Result<OrderReference, CredentialError> {
        Ok(OrderReference::new(33_333_333).unwrap())
    }

    #[tokio::test]
    async fn test_gives_up_after_repeated_collisions() {
        let f = fixture();
        let orders = f.orders.clone().with_reference_source(constant_source);
        let buyer = testing::seed_user(&f.store, "buyer@example.com").await;
        let product = testing::seed_product(&f.store, buyer.id, 1000, 10).await;

        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
        orders.place_order(buyer.id).await.unwrap();
        f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();

        let err = orders.place_order(buyer.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ReferenceUnavailable));
        assert_eq!(f.cart.get_lines(buyer.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let f = fixture();
        let seller = testing::seed_user(&f.store, "seller@example.com").await;
        let product = testing::seed_product(&f.store, seller.id, 1000, 3).await;

        let mut buyers = Vec::new();
        for i in 0..8 {
            let buyer = testing::seed_user(&f.store, &format!("buyer{i}@example.com")).await;
            f.cart.add_or_update(buyer.id, product.id, 1).await.unwrap();
            buyers.push(buyer.id);
        }

        let mut handles = Vec::new();
        for buyer_id in buyers {
            let orders = f.orders.clone();
            handles.push(tokio::spawn(async move { orders.place_order(buyer_id).await }));
        }

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(ServiceError::OutOfStock(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(placed, 3);
        let stock = f.store.find_product_by_id(product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 0);
    }
}
