//! Session-related types.
//!
//! Types stored in the session for authentication state and the cart.

use serde::{Deserialize, Serialize};

use musmus_core::{AccountId, Username};

/// Session-stored account identity.
///
/// Minimal data stored in the session to identify the logged-in account.
/// Admin rights are not cached here; they are re-read from the database on
/// every admin request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account database ID.
    pub id: AccountId,
    /// Account username.
    pub username: Username,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in account.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the session's shopping cart.
    pub const CART: &str = "cart";
}
