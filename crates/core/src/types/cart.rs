//! Cart lines submitted with an order.
//!
//! The cart lives with the caller; the gateway only consumes its lines once
//! when an order is placed.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Cart`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The SKU is empty or whitespace.
    #[error("sku cannot be empty")]
    EmptySku,
    /// Quantities must be at least one.
    #[error("quantity for {sku} must be greater than zero")]
    ZeroQuantity {
        /// SKU of the rejected line.
        sku: String,
    },
}

/// One line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Stock keeping unit of the item.
    pub sku: String,
    /// Number of units, always greater than zero.
    pub quantity: u32,
}

impl CartLine {
    /// Create a validated cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the SKU is blank or the quantity is zero.
    pub fn new(sku: impl Into<String>, quantity: u32) -> Result<Self, CartError> {
        let sku = sku.into();
        if sku.trim().is_empty() {
            return Err(CartError::EmptySku);
        }
        if quantity == 0 {
            return Err(CartError::ZeroQuantity { sku });
        }
        Ok(Self { sku, quantity })
    }
}

/// A collection of cart lines, unique by SKU.
///
/// Adding a SKU that is already present increases its quantity instead of
/// creating a second line. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of `sku`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SKU is blank or the quantity is zero.
    pub fn add(&mut self, sku: impl Into<String>, quantity: u32) -> Result<(), CartError> {
        let line = CartLine::new(sku, quantity)?;
        if let Some(existing) = self.lines.iter_mut().find(|l| l.sku == line.sku) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
        Ok(())
    }

    /// Remove a SKU entirely. Returns `true` if it was present.
    pub fn remove(&mut self, sku: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.sku != sku);
        self.lines.len() != before
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Consume the cart, yielding its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }
}
