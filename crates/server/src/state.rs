//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::{
    CartLocks, CartService, CatalogService, CredentialError, Credentials, IdentityService,
    Notifier, OrderService, SellerService,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Every service is built once here from the
/// configuration and the persistence gateway.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    credentials: Arc<Credentials>,
    identity: IdentityService,
    cart: CartService,
    orders: OrderService,
    seller: SellerService,
    catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Persistence gateway
    /// * `notifier` - Verification code delivery channel
    ///
    /// # Errors
    ///
    /// Returns an error if the password hashing parameters are invalid.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, CredentialError> {
        let credentials = Arc::new(Credentials::new(&config)?);
        let locks = CartLocks::new();

        let identity = IdentityService::new(
            store.clone(),
            credentials.clone(),
            notifier,
            config.verification_code_ttl(),
        );
        let cart = CartService::new(store.clone(), locks.clone());
        let orders = OrderService::new(store.clone(), locks);
        let seller = SellerService::new(store.clone(), credentials.clone());
        let catalog = CatalogService::new(store.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                credentials,
                identity,
                cart,
                orders,
                seller,
                catalog,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence gateway.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Token issuing and decoding.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityService {
        &self.inner.identity
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn seller(&self) -> &SellerService {
        &self.inner.seller
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
