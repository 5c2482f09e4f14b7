//! Order Lifecycle
//!
//! Pure transition rules for an order's fulfilment `status` and its `payment_status`. Transitions
//! that are already satisfied return [`Transition::Unchanged`] instead of failing, so duplicate or
//! late callbacks can be acknowledged without side effects.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    /// Placed and holding stock, awaiting confirmation.
    #[default]
    Pending,

    /// Confirmed by staff or by a completed payment.
    Confirmed,

    /// Cancelled; its stock has been returned.
    Cancelled,
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaymentStatus {
    /// No payment has been started.
    #[default]
    Unpaid,

    /// A payment intent exists and awaits payer approval.
    PaymentPending,

    /// The payment has been captured.
    Paid,
}

/// Errors raised by invalid transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The order is cancelled and can no longer change.
    #[error("order is cancelled")]
    OrderCancelled,

    /// A payment is already pending or captured.
    #[error("order is already paid or has a payment pending")]
    AlreadyPaidOrPending,

    /// There is no pending payment to complete.
    #[error("order has no pending payment")]
    PaymentNotPending,

    /// The callback refers to a different payment than the one pending on the order.
    #[error("payment reference does not match the order")]
    ReferenceMismatch,

    /// A stored status value was not recognised.
    #[error("unknown status value: {0}")]
    UnknownStatus(String),
}

/// Result of applying a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<S> {
    /// The state moved.
    Changed {
        /// State before the transition.
        from: S,

        /// State after the transition.
        to: S,
    },

    /// The state already satisfied the transition.
    Unchanged(S),
}

impl<S> Transition<S> {
    /// The state after the transition.
    pub fn into_state(self) -> S {
        match self {
            Self::Changed { to, .. } => to,
            Self::Unchanged(state) => state,
        }
    }

    /// Whether the state moved.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

impl OrderStatus {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Move to `Confirmed`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::OrderCancelled`] for cancelled orders.
    pub fn confirm(self) -> Result<Transition<Self>, LifecycleError> {
        match self {
            Self::Pending => Ok(Transition::Changed {
                from: self,
                to: Self::Confirmed,
            }),
            Self::Confirmed => Ok(Transition::Unchanged(self)),
            Self::Cancelled => Err(LifecycleError::OrderCancelled),
        }
    }

    /// Move to `Cancelled`. A `Changed` result means the order's stock must be released; an
    /// `Unchanged` result means it already was.
    pub fn cancel(self) -> Transition<Self> {
        match self {
            Self::Pending | Self::Confirmed => Transition::Changed {
                from: self,
                to: Self::Cancelled,
            },
            Self::Cancelled => Transition::Unchanged(self),
        }
    }

    /// Whether the order still holds stock for its line items.
    pub fn holds_stock(self) -> bool {
        self != Self::Cancelled
    }
}

impl PaymentStatus {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::PaymentPending => "payment_pending",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = LifecycleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = LifecycleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "payment_pending" => Ok(Self::PaymentPending),
            "paid" => Ok(Self::Paid),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

/// The mutable state of an order, as one value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderState {
    /// Fulfilment status.
    pub status: OrderStatus,

    /// Payment status.
    pub payment_status: PaymentStatus,

    /// Gateway reference of the current payment, if any.
    pub payment_reference: Option<String>,
}

impl OrderState {
    /// Confirm the order.
    ///
    /// # Errors
    ///
    /// See [`OrderStatus::confirm`].
    pub fn confirm(&self) -> Result<Transition<Self>, LifecycleError> {
        Ok(self.with_status(self.status.confirm()?))
    }

    /// Cancel the order.
    pub fn cancel(&self) -> Transition<Self> {
        self.with_status(self.status.cancel())
    }

    /// Check that a payment may be started.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyPaidOrPending`]: a payment is pending or captured.
    /// - [`LifecycleError::OrderCancelled`]: the order is cancelled.
    pub fn can_begin_payment(&self) -> Result<(), LifecycleError> {
        if self.payment_status != PaymentStatus::Unpaid {
            return Err(LifecycleError::AlreadyPaidOrPending);
        }

        if self.status == OrderStatus::Cancelled {
            return Err(LifecycleError::OrderCancelled);
        }

        Ok(())
    }

    /// Record a freshly created payment intent.
    ///
    /// # Errors
    ///
    /// See [`OrderState::can_begin_payment`].
    pub fn begin_payment(&self, reference: &str) -> Result<Self, LifecycleError> {
        self.can_begin_payment()?;

        Ok(Self {
            status: self.status,
            payment_status: PaymentStatus::PaymentPending,
            payment_reference: Some(reference.to_string()),
        })
    }

    /// Check whether a capture for `reference` is still needed. `Ok(false)` means the payment was
    /// already captured and the callback is a replay.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::ReferenceMismatch`]: `reference` is not the order's payment.
    /// - [`LifecycleError::PaymentNotPending`]: no payment was started.
    /// - [`LifecycleError::OrderCancelled`]: the order is cancelled.
    pub fn needs_capture(&self, reference: &str) -> Result<bool, LifecycleError> {
        if self.payment_reference.as_deref() != Some(reference) {
            return Err(match self.payment_status {
                PaymentStatus::Unpaid => LifecycleError::PaymentNotPending,
                PaymentStatus::PaymentPending | PaymentStatus::Paid => {
                    LifecycleError::ReferenceMismatch
                }
            });
        }

        match self.payment_status {
            PaymentStatus::Paid => Ok(false),
            PaymentStatus::Unpaid => Err(LifecycleError::PaymentNotPending),
            PaymentStatus::PaymentPending if self.status == OrderStatus::Cancelled => {
                Err(LifecycleError::OrderCancelled)
            }
            PaymentStatus::PaymentPending => Ok(true),
        }
    }

    /// Mark the payment for `reference` as captured and confirm the order.
    ///
    /// # Errors
    ///
    /// See [`OrderState::needs_capture`].
    pub fn complete_payment(&self, reference: &str) -> Result<Transition<Self>, LifecycleError> {
        if !self.needs_capture(reference)? {
            return Ok(Transition::Unchanged(self.clone()));
        }

        let status = self.status.confirm()?.into_state();

        Ok(Transition::Changed {
            from: self.clone(),
            to: Self {
                status,
                payment_status: PaymentStatus::Paid,
                payment_reference: self.payment_reference.clone(),
            },
        })
    }

    /// Abandon a pending payment. Any other state is left alone.
    pub fn cancel_pending_payment(&self) -> Transition<Self> {
        if self.payment_status != PaymentStatus::PaymentPending {
            return Transition::Unchanged(self.clone());
        }

        Transition::Changed {
            from: self.clone(),
            to: Self {
                status: self.status,
                payment_status: PaymentStatus::Unpaid,
                payment_reference: None,
            },
        }
    }

    fn with_status(&self, transition: Transition<OrderStatus>) -> Transition<Self> {
        match transition {
            Transition::Changed { to, .. } => Transition::Changed {
                from: self.clone(),
                to: Self {
                    status: to,
                    ..self.clone()
                },
            },
            Transition::Unchanged(_) => Transition::Unchanged(self.clone()),
        }
    }
}
