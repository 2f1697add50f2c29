//! Marketplace roles.

use serde::{Deserialize, Serialize};

/// What a user is allowed to do in the marketplace.
///
/// Every account starts as a [`Role::Buyer`]. Upgrading to [`Role::Seller`] is
/// one-way: nothing moves a seller back to buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can manage a profile, a cart and orders.
    #[default]
    Buyer,
    /// Can additionally manage categories and their own products.
    Seller,
}

impl Role {
    #[must_use]
    pub const fn is_seller(self) -> bool {
        matches!(self, Self::Seller)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
