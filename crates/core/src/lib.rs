//! Musmus Core - Shared domain types.
//!
//! This crate provides the types shared by all Musmus components:
//! - `storefront` - Public store, cart, checkout and the admin console
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. The order status state machine and the cart arithmetic
//! live here so they can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, usernames, carts, order codes and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
