//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod role;

pub use code::{OrderReference, VerificationCode};
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::{Price, PriceError, Quantity};
pub use role::Role;
