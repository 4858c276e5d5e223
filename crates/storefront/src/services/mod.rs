//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Account registration and password login
//! - `cart` - Session-backed shopping cart
//! - `orders` - Checkout and the order status lifecycle

pub mod auth;
pub mod cart;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use cart::{CartSession, CartSessionError};
pub use orders::{CheckoutError, OrderService, RejectReason, TransitionOutcome};
