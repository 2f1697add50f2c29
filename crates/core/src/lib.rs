//! Bazaar Core - Shared domain types.
//!
//! This crate provides the value types used across all Bazaar components:
//! - `server` - The marketplace HTTP API (buyers and sellers)
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Database encoding is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, phone numbers, prices,
//!   quantities, roles and the numeric codes handed out to users

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
