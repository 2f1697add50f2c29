//! Integration tests for Bazaar.
//!
//! The tests drive the complete router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory store, so they need
//! no database or network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `accounts` - Sign-up, login, phone verification and profiles
//! - `cart_orders` - Cart reconciliation and checkout
//! - `seller` - Seller upgrade and catalog ownership
//! - `platform` - Health probes, request ids and error envelopes

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use parking_lot::Mutex;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_core::{PhoneNumber, UserId, VerificationCode};
use bazaar_server::config::{PasswordHashingConfig, ServerConfig};
use bazaar_server::db::MemoryStore;
use bazaar_server::routes;
use bazaar_server::services::{Credentials, Notifier, NotifyError};
use bazaar_server::state::AppState;

/// Configuration with cheap password hashing and exposed verification codes.
#[must_use]
pub fn test_config() -> ServerConfig {
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

/// Notifier that keeps every delivered code.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(PhoneNumber, VerificationCode)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver_code(
        &self,
        phone: &PhoneNumber,
        code: VerificationCode,
    ) -> Result<(), NotifyError> {
        self.sent.lock().push((phone.clone(), code));
        Ok(())
    }
}

/// A response split into status and JSON body (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// The router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub credentials: Credentials,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let credentials = Credentials::new(&config).unwrap();
        let state = AppState::new(config, store.clone(), notifier.clone()).unwrap();

        Self {
            router: routes::app(state),
            store,
            notifier,
            credentials,
        }
    }

    /// Send one request; `body` is sent as JSON when present.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register a buyer and return their token.
    pub async fn sign_up(&self, email: &str) -> String {
        let response = self
            .post(
                "/users/register",
                None,
                json!({ "email": email, "password": "correct horse", "phone": "+1 555 010 0100" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Register and verify a buyer; returns their token.
    pub async fn verified_buyer(&self, email: &str) -> String {
        let token = self.sign_up(email).await;
        let code = self.get("/users/verifycode", Some(&token)).await.body["data"]["code"]
            .as_u64()
            .unwrap();
        let response = self
            .post("/users/verify", Some(&token), json!({ "code": code }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        token
    }

    /// A verified user upgraded to seller; returns the seller token.
    pub async fn seller(&self, email: &str, account_number: &str) -> String {
        let token = self.verified_buyer(email).await;
        let response = self
            .post(
                "/users/become-seller",
                Some(&token),
                seller_application(account_number),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Create a category and a product priced `price` with `stock` units.
    /// Returns the product id.
    pub async fn product(&self, seller_token: &str, name: &str, price: &str, stock: u32) -> i64 {
        let category = self
            .post(
                "/seller/categories",
                Some(seller_token),
                json!({ "name": format!("{name} category") }),
            )
            .await;
        assert_eq!(category.status, StatusCode::OK, "{}", category.body);

        let product = self
            .post(
                "/seller/products",
                Some(seller_token),
                json!({
                    "name": name,
                    "description": "integration test product",
                    "categoryId": category.body["data"]["id"],
                    "price": price,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(product.status, StatusCode::OK, "{}", product.body);
        product.body["data"]["id"].as_i64().unwrap()
    }

    /// The user id a token was issued for.
    #[must_use]
    pub fn user_id(&self, token: &str) -> UserId {
        self.credentials.decode_token(token).unwrap().sub
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid become-seller body.
#[must_use]
pub fn seller_application(account_number: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "phone": "+44 20 7946 0000",
        "accountNumber": account_number,
        "swiftCode": "DEUTDEFF",
        "paymentType": "wire",
    })
}
