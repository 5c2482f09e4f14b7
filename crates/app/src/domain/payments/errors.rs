//! Payments service errors.

use stockroom::{lifecycle::LifecycleError, pricing::PricingError};
use thiserror::Error;

use crate::{
    domain::{lines::LinesError, payments::gateway::GatewayError},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum PaymentsServiceError {
    #[error("order not found")]
    NotFound,

    #[error("order is already paid or has a payment pending")]
    AlreadyPaidOrPending,

    #[error(transparent)]
    Lifecycle(LifecycleError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("order total is out of range")]
    Pricing(#[from] PricingError),

    #[error("failed to load order items")]
    Lines(#[source] LinesError),

    #[error("storage error")]
    Store(#[source] StoreError),
}

impl From<LifecycleError> for PaymentsServiceError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::AlreadyPaidOrPending => Self::AlreadyPaidOrPending,
            error => Self::Lifecycle(error),
        }
    }
}

impl From<StoreError> for PaymentsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            error => Self::Store(error),
        }
    }
}

impl From<LinesError> for PaymentsServiceError {
    fn from(error: LinesError) -> Self {
        match error {
            LinesError::Store(error) => error.into(),
            LinesError::Pricing(error) => Self::Pricing(error),
            error @ LinesError::Reconcile(_) => Self::Lines(error),
        }
    }
}
