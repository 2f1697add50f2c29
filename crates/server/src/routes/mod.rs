//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (store ping)
//!
//! # Accounts
//! POST   /users/register             - Sign up, returns a token
//! POST   /users/login                - Log in, returns a token
//! GET    /users/verifycode           - Send a phone verification code
//! POST   /users/verify               - Confirm the code
//! POST   /users/profile              - Create profile (names + address)
//! GET    /users/profile              - Profile with cart and orders
//! PATCH  /users/profile              - Partial profile update
//! POST   /users/become-seller        - Upgrade to seller, returns a token
//!
//! # Cart and orders
//! POST   /users/cart                 - Set a product's quantity
//! GET    /users/cart                 - Cart lines
//! DELETE /users/cart                 - Empty the cart
//! POST   /users/order                - Check out
//! GET    /users/order                - Order history
//! GET    /users/order/{id}           - One order
//!
//! # Public catalog
//! GET    /products, /products/{id}
//! GET    /categories, /categories/{id}
//!
//! # Seller (requires seller role)
//! POST   /seller/categories
//! PATCH  /seller/categories/{id}
//! DELETE /seller/categories/{id}
//! POST   /seller/products
//! GET    /seller/products            - Own products
//! GET    /seller/products/{id}
//! PATCH  /seller/products/{id}       - Edit (owner only)
//! PUT    /seller/products/{id}       - Stock update (owner only)
//! DELETE /seller/products/{id}       - Delete (owner only)
//! ```

pub mod cart;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod seller;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
};

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the account, cart and order routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/verifycode", get(users::request_code))
        .route("/verify", post(users::verify))
        .route(
            "/profile",
            post(users::create_profile)
                .get(users::get_profile)
                .patch(users::update_profile),
        )
        .route("/become-seller", post(users::become_seller))
        .route(
            "/cart",
            post(cart::add_or_update).get(cart::show).delete(cart::clear),
        )
        .route("/order", post(orders::place).get(orders::index))
        .route("/order/{id}", get(orders::show))
}

/// Create the seller catalog routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", post(seller::create_category))
        .route(
            "/categories/{id}",
            patch(seller::update_category).delete(seller::delete_category),
        )
        .route(
            "/products",
            post(seller::create_product).get(seller::products),
        )
        .route(
            "/products/{id}",
            get(seller::product)
                .patch(seller::update_product)
                .put(seller::update_stock)
                .delete(seller::delete_product),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/users", user_routes())
        .nest("/seller", seller_routes())
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/categories", get(catalog::categories))
        .route("/categories/{id}", get(catalog::category))
        .fallback(not_found)
}

/// The routed application with request ids, ready to serve.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Returns 503 Service Unavailable if the store cannot be reached.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("route not found".to_string())
}
