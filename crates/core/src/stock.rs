//! Stock Ledger
//!
//! The ledger is the only place stock levels change. It is seeded with the levels read (and locked)
//! inside the enclosing transaction, applies reservations and releases in memory, and yields the
//! set of absolute levels to write back in a single bulk statement.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::Key;

/// Net signed stock change per product. Negative values consume stock, positive values return it.
pub type StockDeltas<P> = BTreeMap<P, i64>;

/// Errors raised while moving stock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError<P: Key> {
    /// The product was not part of the snapshot the ledger was seeded with.
    #[error("product {0} is not tracked by this ledger")]
    UnknownProduct(P),

    /// Reserving would take the product's stock below zero.
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product being reserved.
        product: P,

        /// Units requested.
        requested: u64,

        /// Units on hand when the reservation was attempted.
        available: u64,
    },
}

/// A product's new absolute stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockWrite<P> {
    /// Product to update.
    pub product: P,

    /// Stock level after this ledger's movements.
    pub stock: u64,
}

/// In-memory view of product stock for one transaction.
#[derive(Debug, Clone)]
pub struct StockLedger<P: Key> {
    opening: FxHashMap<P, u64>,
    levels: FxHashMap<P, u64>,
}

impl<P: Key> StockLedger<P> {
    /// Seed a ledger with the stock levels read inside the current transaction.
    pub fn new(levels: impl IntoIterator<Item = (P, u64)>) -> Self {
        let opening: FxHashMap<P, u64> = levels.into_iter().collect();

        Self {
            levels: opening.clone(),
            opening,
        }
    }

    /// Stock currently available for `product`.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::UnknownProduct`] when the product was not seeded.
    pub fn available(&self, product: P) -> Result<u64, StockError<P>> {
        self.levels
            .get(&product)
            .copied()
            .ok_or(StockError::UnknownProduct(product))
    }

    /// Whether the ledger tracks `product`.
    pub fn contains(&self, product: P) -> bool {
        self.levels.contains_key(&product)
    }

    /// Take `amount` units of `product`, returning the remaining stock.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::InsufficientStock`] if fewer than `amount` units are available, and
    /// [`StockError::UnknownProduct`] when the product was not seeded.
    pub fn reserve(&mut self, product: P, amount: u64) -> Result<u64, StockError<P>> {
        let level = self
            .levels
            .get_mut(&product)
            .ok_or(StockError::UnknownProduct(product))?;

        let remaining = level
            .checked_sub(amount)
            .ok_or(StockError::InsufficientStock {
                product,
                requested: amount,
                available: *level,
            })?;

        *level = remaining;

        Ok(remaining)
    }

    /// Return `amount` units of `product`, returning the new stock.
    ///
    /// Releases have no upper bound; a catalogue maximum is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns [`StockError::UnknownProduct`] when the product was not seeded.
    pub fn release(&mut self, product: P, amount: u64) -> Result<u64, StockError<P>> {
        let level = self
            .levels
            .get_mut(&product)
            .ok_or(StockError::UnknownProduct(product))?;

        *level = level.saturating_add(amount);

        Ok(*level)
    }

    /// Apply one signed delta.
    ///
    /// # Errors
    ///
    /// See [`StockLedger::reserve`] and [`StockLedger::release`].
    pub fn apply(&mut self, product: P, delta: i64) -> Result<u64, StockError<P>> {
        if delta < 0 {
            self.reserve(product, delta.unsigned_abs())
        } else {
            self.release(product, delta.unsigned_abs())
        }
    }

    /// Apply every net delta of a reconciliation. Stops at the first failure; the caller is
    /// expected to abandon the ledger (and its transaction) in that case.
    ///
    /// # Errors
    ///
    /// See [`StockLedger::apply`].
    pub fn apply_all(&mut self, deltas: &StockDeltas<P>) -> Result<(), StockError<P>> {
        deltas
            .iter()
            .try_for_each(|(product, delta)| self.apply(*product, *delta).map(|_| ()))
    }

    /// Absolute levels for every product whose stock moved, ordered by product.
    pub fn writes(&self) -> Vec<StockWrite<P>> {
        let mut writes: Vec<StockWrite<P>> = self
            .levels
            .iter()
            .filter(|(product, stock)| self.opening.get(product) != Some(stock))
            .map(|(product, stock)| StockWrite {
                product: *product,
                stock: *stock,
            })
            .collect();

        writes.sort_unstable_by_key(|write| write.product);

        writes
    }
}
