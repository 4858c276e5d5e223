//! Session-backed shopping cart.
//!
//! The cart lives under a single session key and is written back on every
//! mutation. tower-sessions persists the session at the end of the request,
//! so a cart survives across requests but not logout or expiry.

use thiserror::Error;
use tower_sessions::Session;

use musmus_core::{Cart, CartError, CartLine, Price};

use crate::models::session::keys;

/// Errors that can occur while reading or writing the session cart.
#[derive(Debug, Error)]
pub enum CartSessionError {
    /// The line was rejected by the cart.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Session store failure (including an undecodable stored cart).
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// The cart of the session's principal.
pub struct CartSession<'a> {
    session: &'a Session,
}

impl<'a> CartSession<'a> {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Load the cart; a session without one has an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartSessionError::Session` if the session cannot be read.
    pub async fn load(&self) -> Result<Cart, CartSessionError> {
        Ok(self
            .session
            .get::<Cart>(keys::CART)
            .await?
            .unwrap_or_default())
    }

    /// Append a line, creating the cart if needed. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `CartSessionError::Cart` if a label is blank or the total would
    /// overflow, and `CartSessionError::Session` on session failures.
    pub async fn add_line(
        &self,
        product_label: &str,
        item_label: &str,
        unit_price: Price,
    ) -> Result<Cart, CartSessionError> {
        let line = CartLine::new(product_label, item_label, unit_price)?;
        let mut cart = self.load().await?;
        cart.add_line(line)?;
        self.session.insert(keys::CART, &cart).await?;
        Ok(cart)
    }

    /// Remove the cart from the session.
    ///
    /// # Errors
    ///
    /// Returns `CartSessionError::Session` if the session cannot be written.
    pub async fn clear(&self) -> Result<(), CartSessionError> {
        self.session.remove::<Cart>(keys::CART).await?;
        Ok(())
    }
}
