//! Order Records

use jiff::Timestamp;
use stockroom::lifecycle::{OrderState, OrderStatus, PaymentStatus};

use crate::{domain::principal::UserUuid, uuids::TypedUuid};

/// Order UUID
///
/// Orders are identified by random (v4) ids so that ids reveal nothing about order volume.
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Order Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub owner: UserUuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub created_at: Timestamp,
}

impl OrderRecord {
    /// The order's mutable state.
    #[must_use]
    pub fn state(&self) -> OrderState {
        OrderState {
            status: self.status,
            payment_status: self.payment_status,
            payment_reference: self.payment_reference.clone(),
        }
    }
}
