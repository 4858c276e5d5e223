//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database
//! row types. Repositories convert rows into them and reject rows that no
//! longer satisfy the domain rules.

pub mod account;
pub mod order;
pub mod session;

pub use account::Account;
pub use order::{NewOrder, Order};
pub use session::CurrentUser;
