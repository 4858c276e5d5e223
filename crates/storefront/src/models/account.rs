//! Account domain types.

use chrono::{DateTime, Utc};

use musmus_core::{AccountId, Username};

/// A registered store account.
///
/// The password hash is deliberately not part of this type; it is only
/// loaded by the login path.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Unique login name.
    pub username: Username,
    /// Whether this account may use the admin console.
    pub is_admin: bool,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}
