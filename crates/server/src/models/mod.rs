//! Domain types for the marketplace.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Types that leave the API derive `Serialize` with
//! camelCase field names.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::{CartLine, NewCartLine};
pub use catalog::{Category, NewCategory, NewProduct, Product, ProductPatch};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use user::{
    Address, AddressPatch, BankAccount, NewAddress, NewBankAccount, NewProfileRecord, NewUser,
    PendingCode, SellerUpgrade, User, UserPatch,
};
