//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `identity` - Sign-up, login, phone verification and profile
//! - `cart` - Per-user cart reconciliation
//! - `orders` - Checkout and order history
//! - `seller` - Buyer to seller upgrade
//! - `catalog` - Seller-managed categories and products
//! - `credentials` - Password hashing, session tokens and random codes
//! - `notification` - Verification code delivery
//!
//! Services hold an `Arc<dyn Store>` and are cheap to clone. They return
//! [`ServiceError`], which the HTTP layer maps onto status codes through
//! [`ServiceError::kind`].

pub mod cart;
pub mod catalog;
pub mod credentials;
mod error;
pub mod identity;
pub mod notification;
pub mod orders;
pub mod seller;

pub use cart::{CartLocks, CartService};
pub use catalog::CatalogService;
pub use credentials::{Claims, CredentialError, Credentials};
pub use error::{ErrorKind, ServiceError};
pub use identity::IdentityService;
pub use notification::{LogNotifier, Notifier, NotifyError, TwilioNotifier};
pub use orders::OrderService;
pub use seller::SellerService;

pub(crate) use error::{non_blank, required};

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for the service unit tests.

    #![allow(clippy::unwrap_used)]

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use bazaar_core::{Email, PhoneNumber, Price, UserId, VerificationCode};

    use super::notification::{Notifier, NotifyError};
    use crate::config::{PasswordHashingConfig, ServerConfig};
    use crate::db::{CatalogStore, MemoryStore, UserStore};
    use crate::models::{NewCategory, NewProduct, NewUser, Product, User};

    /// Configuration with cheap password hashing.
    pub fn config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/bazaar_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            app_secret: SecretString::from("k9$Xq2!vLm7#pR4@tZ8&wB1*nC5^hJ3"),
            token_ttl_hours: 24,
            verification_code_ttl_minutes: 30,
            expose_verification_code: true,
            password_hashing: PasswordHashingConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
            twilio: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Notifier that records every delivery, optionally failing each one.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(PhoneNumber, VerificationCode)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn deliver_code(
            &self,
            phone: &PhoneNumber,
            code: VerificationCode,
        ) -> Result<(), NotifyError> {
            self.sent.lock().push((phone.clone(), code));
            if self.fail {
                return Err(NotifyError::Api {
                    status: 503,
                    message: "provider unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    pub async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: "unused".to_string(),
                phone: PhoneNumber::parse("+15550100").unwrap(),
            })
            .await
            .unwrap()
    }

    /// Create a product (in a fresh category) priced at `cents / 100`.
    pub async fn seed_product(
        store: &MemoryStore,
        seller_id: UserId,
        cents: i64,
        stock: u32,
    ) -> Product {
        let category = store
            .create_category(NewCategory {
                name: "General".to_string(),
                parent_id: None,
                image_url: None,
                display_order: 0,
            })
            .await
            .unwrap();

        store
            .create_product(NewProduct {
                seller_id,
                name: format!("Item {cents}"),
                description: String::new(),
                category_id: category.id,
                image_url: None,
                price: Price::new(Decimal::new(cents, 2)).unwrap(),
                stock,
            })
            .await
            .unwrap()
    }
}
