//! Core types for Musmus.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod order_code;
pub mod price;
pub mod status;
pub mod username;

pub use cart::{Cart, CartError, CartLine};
pub use id::*;
pub use order_code::{OrderCode, OrderCodeGenerator};
pub use price::{Price, PriceError};
pub use status::*;
pub use username::{Username, UsernameError};
