//! Line item errors.

use stockroom::{pricing::PricingError, reconcile::ReconcileError, stock::StockError};
use thiserror::Error;

use crate::{domain::products::records::ProductUuid, store::StoreError};

#[derive(Debug, Error)]
pub enum LinesError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError<ProductUuid>),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StockError<ProductUuid>> for LinesError {
    fn from(error: StockError<ProductUuid>) -> Self {
        Self::Reconcile(error.into())
    }
}
