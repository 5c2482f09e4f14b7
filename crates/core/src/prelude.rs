//! Stockroom prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    Key,
    lifecycle::{LifecycleError, OrderState, OrderStatus, PaymentStatus, Transition},
    pricing::{PricingError, line_subtotal, render_amount, total},
    reconcile::{
        Advisory, DesiredLine, ExistingLine, LineCreate, LineUpdate, ReconcileError,
        ReconciliationPlan, Reserve, StockPolicy, reconcile,
    },
    stock::{StockDeltas, StockError, StockLedger, StockWrite},
};
