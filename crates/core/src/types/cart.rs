//! Shopping cart held in a principal's session.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s. It has no identity of its
//! own: the storefront stores it under a single session key, so it lives and
//! dies with the session that owns it.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Errors that can occur when modifying a [`Cart`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The product (game) label is blank.
    #[error("product label cannot be empty")]
    EmptyProductLabel,
    /// The item label is blank.
    #[error("item label cannot be empty")]
    EmptyItemLabel,
    /// Adding the line would overflow the cart total.
    #[error("cart total would overflow")]
    TotalOverflow,
}

/// One selected purchase: an item of a game at a unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product label, e.g. the game name.
    #[serde(rename = "game")]
    pub product_label: String,
    /// Item label, e.g. "6480 crystals".
    #[serde(rename = "item")]
    pub item_label: String,
    /// Price of this line.
    #[serde(rename = "price")]
    pub unit_price: Price,
}

impl CartLine {
    /// Create a cart line, trimming and validating the labels.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EmptyProductLabel` or `CartError::EmptyItemLabel`
    /// if a label is blank.
    pub fn new(
        product_label: &str,
        item_label: &str,
        unit_price: Price,
    ) -> Result<Self, CartError> {
        let product_label = product_label.trim();
        let item_label = item_label.trim();

        if product_label.is_empty() {
            return Err(CartError::EmptyProductLabel);
        }
        if item_label.is_empty() {
            return Err(CartError::EmptyItemLabel);
        }

        Ok(Self {
            product_label: product_label.to_owned(),
            item_label: item_label.to_owned(),
            unit_price,
        })
    }
}

/// An ordered, non-deduplicated sequence of cart lines.
///
/// The total of a cart never overflows: [`Cart::add_line`] rejects a line
/// that would push it past `i64::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Append a line. Repeated additions of the same item yield repeated lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::TotalOverflow` if the new total would not fit.
    pub fn add_line(&mut self, line: CartLine) -> Result<(), CartError> {
        self.total()
            .checked_add(line.unit_price)
            .ok_or(CartError::TotalOverflow)?;
        self.lines.push(line);
        Ok(())
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Sum of unit prices; zero for an empty cart.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(|line| line.unit_price).sum()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(game: &str, item: &str, price: i64) -> CartLine {
        CartLine::new(game, item, Price::new(price).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_cart_total_is_zero() {
        let cart = Cart::new();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_add_line_preserves_order_and_duplicates() {
        let mut cart = Cart::new();
        cart.add_line(line("Genshin", "60 crystals", 30)).unwrap();
        cart.add_line(line("Arknights", "Monthly card", 120)).unwrap();
        cart.add_line(line("Genshin", "60 crystals", 30)).unwrap();

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.lines()[0].product_label, "Genshin");
        assert_eq!(cart.lines()[1].product_label, "Arknights");
        assert_eq!(cart.lines()[2], cart.lines()[0]);
        assert_eq!(cart.total().amount(), 180);
    }

    #[test]
    fn test_add_line_rejects_overflow() {
        let mut cart = Cart::new();
        cart.add_line(line("A", "big", i64::MAX)).unwrap();
        assert_eq!(
            cart.add_line(line("A", "one more", 1)),
            Err(CartError::TotalOverflow)
        );
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_line_rejects_blank_labels() {
        let price = Price::new(1).unwrap();
        assert_eq!(
            CartLine::new("  ", "item", price),
            Err(CartError::EmptyProductLabel)
        );
        assert_eq!(
            CartLine::new("game", "", price),
            Err(CartError::EmptyItemLabel)
        );
    }

    #[test]
    fn test_serialized_form_uses_short_keys() {
        let mut cart = Cart::new();
        cart.add_line(line("Genshin", "Welkin", 90)).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json, r#"[{"game":"Genshin","item":"Welkin","price":90}]"#);

        let parsed: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cart);
    }
}
