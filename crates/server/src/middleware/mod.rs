//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (new hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is not a layer: handlers opt in by taking an [`AuthUser`]
//! or [`SellerUser`] argument.

pub mod auth;
pub mod request_id;

pub use auth::{AuthUser, SellerUser};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
