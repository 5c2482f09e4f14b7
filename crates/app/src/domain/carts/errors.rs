//! Carts service errors.

use stockroom::{pricing::PricingError, reconcile::ReconcileError};
use thiserror::Error;

use crate::{
    domain::{lines::LinesError, products::records::ProductUuid},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart already exists")]
    AlreadyExists,

    #[error("cart not found")]
    NotFound,

    #[error("quantity for product {0} must be positive")]
    InvalidQuantity(ProductUuid),

    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductUuid),

    #[error("product {0} not found")]
    UnknownProduct(ProductUuid),

    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductUuid,
        requested: u64,
        available: u64,
    },

    #[error("cart total is out of range")]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Store(#[source] StoreError),
}

impl From<StoreError> for CartsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::NotFound => Self::NotFound,
            error => Self::Store(error),
        }
    }
}

impl From<LinesError> for CartsServiceError {
    fn from(error: LinesError) -> Self {
        match error {
            LinesError::Reconcile(error) => match error {
                ReconcileError::InvalidQuantity(product) => Self::InvalidQuantity(product),
                ReconcileError::DuplicateProduct(product) => Self::DuplicateProduct(product),
                ReconcileError::UnknownProduct(product) => Self::UnknownProduct(product),
                ReconcileError::InsufficientStock {
                    product,
                    requested,
                    available,
                } => Self::InsufficientStock {
                    product,
                    requested,
                    available,
                },
            },
            LinesError::Pricing(error) => Self::Pricing(error),
            LinesError::Store(error) => error.into(),
        }
    }
}
