//! Stockroom
//!
//! Stockroom is the inventory reconciliation and order lifecycle engine behind a commerce backend.
//! This crate is pure: it diffs line items, accounts for stock and drives order state without
//! touching storage. Persistence and services live in `stockroom-app`.

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

pub mod lifecycle;
pub mod prelude;
pub mod pricing;
pub mod reconcile;
pub mod stock;

/// Identifier usable as a product or line item key.
pub trait Key: Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> Key for T where T: Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}
