//! Checkout service errors.

use stockroom::{pricing::PricingError, reconcile::ReconcileError};
use thiserror::Error;

use crate::{
    domain::{lines::LinesError, products::records::ProductUuid},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    #[error("cart not found")]
    NotFound,

    #[error("cart has no items")]
    EmptyCart,

    #[error("product {0} is no longer available")]
    UnknownProduct(ProductUuid),

    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductUuid,
        requested: u64,
        available: u64,
    },

    #[error("cart items are invalid")]
    InvalidItems(#[source] ReconcileError<ProductUuid>),

    #[error("order total is out of range")]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Store(#[source] StoreError),
}

impl From<StoreError> for CheckoutServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            error => Self::Store(error),
        }
    }
}

impl From<LinesError> for CheckoutServiceError {
    fn from(error: LinesError) -> Self {
        match error {
            LinesError::Reconcile(ReconcileError::UnknownProduct(product)) => {
                Self::UnknownProduct(product)
            }
            LinesError::Reconcile(ReconcileError::InsufficientStock {
                product,
                requested,
                available,
            }) => Self::InsufficientStock {
                product,
                requested,
                available,
            },
            LinesError::Reconcile(error) => Self::InvalidItems(error),
            LinesError::Pricing(error) => Self::Pricing(error),
            LinesError::Store(error) => error.into(),
        }
    }
}
