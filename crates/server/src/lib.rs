//! Bazaar marketplace server library.
//!
//! The HTTP API is built as a library so the integration tests can drive the
//! full router in-process. The `bazaar-server` binary adds configuration,
//! the `PostgreSQL` store, tracing and Sentry on top.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
