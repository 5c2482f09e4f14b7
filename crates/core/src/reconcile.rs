//! Line Item Reconciliation
//!
//! Diffs a submitted set of `(product, quantity)` pairs against the persisted line items of a cart
//! or order and produces disjoint create, update and delete batches together with the net stock
//! delta per product. Reconciliation never moves stock itself: the deltas are handed to a
//! [`StockLedger`] in a second phase, inside the same transaction.
//!
//! How a quantity change affects stock is decided by a [`StockPolicy`]. Orders use [`Reserve`],
//! which consumes stock the moment a line is committed. Carts use [`Advisory`], which only checks
//! that the requested quantity is currently on hand.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    Key,
    stock::{StockDeltas, StockError, StockLedger},
};

/// A line the caller wants to exist after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredLine<P> {
    /// Product the line refers to.
    pub product: P,

    /// Requested quantity. Zero is rejected.
    pub quantity: u32,
}

/// A persisted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingLine<P, L> {
    /// Line identifier.
    pub line: L,

    /// Product the line refers to.
    pub product: P,

    /// Persisted quantity.
    pub quantity: u32,
}

/// A line to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCreate<P> {
    /// Product the new line refers to.
    pub product: P,

    /// Quantity of the new line.
    pub quantity: u32,
}

/// A quantity change to an existing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineUpdate<P, L> {
    /// Line being changed.
    pub line: L,

    /// Product of the line.
    pub product: P,

    /// Quantity before the change.
    pub previous: u32,

    /// Quantity after the change.
    pub quantity: u32,
}

/// Errors raised while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError<P: Key> {
    /// A quantity of zero was submitted.
    #[error("quantity for product {0} must be at least 1")]
    InvalidQuantity(P),

    /// The same product appeared more than once in the submitted lines.
    #[error("product {0} was submitted more than once")]
    DuplicateProduct(P),

    /// A submitted product does not exist.
    #[error("product {0} not found")]
    UnknownProduct(P),

    /// Not enough stock to satisfy the request.
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that ran short.
        product: P,

        /// Units that needed to be available.
        requested: u64,

        /// Units on hand.
        available: u64,
    },
}

impl<P: Key> From<StockError<P>> for ReconcileError<P> {
    fn from(error: StockError<P>) -> Self {
        match error {
            StockError::UnknownProduct(product) => Self::UnknownProduct(product),
            StockError::InsufficientStock {
                product,
                requested,
                available,
            } => Self::InsufficientStock {
                product,
                requested,
                available,
            },
        }
    }
}

/// Decides how a quantity change interacts with stock.
pub trait StockPolicy {
    /// Units that must be on hand for a line to move from `previous` to `desired`.
    fn required(&self, previous: u32, desired: u32) -> u32;

    /// Signed stock movement caused by a line moving from `previous` to `desired`.
    fn delta(&self, previous: u32, desired: u32) -> i64;

    /// Whether any plan under this policy can carry a non-zero stock delta. Callers that only read
    /// stock may skip row locks when this is `false`.
    fn moves_stock(&self) -> bool;
}

/// Consume stock on commit and return it on shrink or removal. Used by orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reserve;

impl StockPolicy for Reserve {
    fn required(&self, previous: u32, desired: u32) -> u32 {
        desired.saturating_sub(previous)
    }

    fn delta(&self, previous: u32, desired: u32) -> i64 {
        i64::from(previous) - i64::from(desired)
    }

    fn moves_stock(&self) -> bool {
        true
    }
}

/// Check availability on growth but never move stock. Used by carts.
///
/// Carts hold no reservation, so a growing line must fit entirely within current stock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Advisory;

impl StockPolicy for Advisory {
    fn required(&self, previous: u32, desired: u32) -> u32 {
        if desired > previous { desired } else { 0 }
    }

    fn delta(&self, _previous: u32, _desired: u32) -> i64 {
        0
    }

    fn moves_stock(&self) -> bool {
        false
    }
}

/// The outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan<P, L> {
    /// Lines to insert.
    pub creates: Vec<LineCreate<P>>,

    /// Lines whose quantity changes.
    pub updates: Vec<LineUpdate<P, L>>,

    /// Lines to delete.
    pub deletes: Vec<L>,

    /// Net stock movement per product; zero deltas are omitted.
    pub stock_deltas: StockDeltas<P>,
}

impl<P: Key, L> ReconciliationPlan<P, L> {
    /// Whether applying the plan would write nothing.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
            && self.stock_deltas.is_empty()
    }

    /// Products whose stock the plan moves.
    pub fn touched_products(&self) -> SmallVec<[P; 8]> {
        self.stock_deltas.keys().copied().collect()
    }

    fn add_delta(&mut self, product: P, delta: i64) {
        if delta == 0 {
            return;
        }

        let net = self.stock_deltas.entry(product).or_insert(0);
        *net += delta;

        if *net == 0 {
            self.stock_deltas.remove(&product);
        }
    }
}

/// Diff `desired` against `existing`, checking availability against `stock`.
///
/// `stock` must hold every product in `desired` and, for policies that return stock, every
/// product in `existing`. Equal quantities are dropped entirely, so reconciling the same set twice
/// yields an empty plan.
///
/// # Errors
///
/// - [`ReconcileError::InvalidQuantity`]: a desired quantity is zero.
/// - [`ReconcileError::DuplicateProduct`]: a product appears twice in `desired`.
/// - [`ReconcileError::UnknownProduct`]: a desired product is missing from `stock`.
/// - [`ReconcileError::InsufficientStock`]: a create or growth needs more than is on hand.
pub fn reconcile<P, L, S>(
    desired: &[DesiredLine<P>],
    existing: &[ExistingLine<P, L>],
    stock: &StockLedger<P>,
    policy: &S,
) -> Result<ReconciliationPlan<P, L>, ReconcileError<P>>
where
    P: Key,
    L: Copy,
    S: StockPolicy + ?Sized,
{
    let mut unconsumed: FxHashMap<P, &ExistingLine<P, L>> =
        existing.iter().map(|line| (line.product, line)).collect();

    let mut seen = FxHashSet::default();

    let mut plan = ReconciliationPlan {
        creates: Vec::new(),
        updates: Vec::new(),
        deletes: Vec::new(),
        stock_deltas: StockDeltas::new(),
    };

    for line in desired {
        if line.quantity == 0 {
            return Err(ReconcileError::InvalidQuantity(line.product));
        }

        if !seen.insert(line.product) {
            return Err(ReconcileError::DuplicateProduct(line.product));
        }

        let available = stock.available(line.product)?;
        let current = unconsumed.remove(&line.product);
        let previous = current.map_or(0, |current| current.quantity);

        if previous == line.quantity {
            continue;
        }

        let required = u64::from(policy.required(previous, line.quantity));

        if required > available {
            return Err(ReconcileError::InsufficientStock {
                product: line.product,
                requested: required,
                available,
            });
        }

        plan.add_delta(line.product, policy.delta(previous, line.quantity));

        match current {
            Some(current) => plan.updates.push(LineUpdate {
                line: current.line,
                product: line.product,
                previous,
                quantity: line.quantity,
            }),
            None => plan.creates.push(LineCreate {
                product: line.product,
                quantity: line.quantity,
            }),
        }
    }

    // Walk `existing` rather than the map so deletes come out in a stable order.
    for line in existing {
        if unconsumed.remove(&line.product).is_none() {
            continue;
        }

        plan.add_delta(line.product, policy.delta(line.quantity, 0));
        plan.deletes.push(line.line);
    }

    Ok(plan)
}
