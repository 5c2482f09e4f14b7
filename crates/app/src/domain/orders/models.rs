//! Order Models

use jiff::Timestamp;
use stockroom::lifecycle::{OrderStatus, PaymentStatus};

use crate::domain::{lines::models::LineItem, orders::records::OrderUuid, principal::UserUuid};

/// Order Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub uuid: OrderUuid,
    pub owner: UserUuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub items: Vec<LineItem>,

    /// Sum of item subtotals at current prices, in minor units.
    pub total: u64,

    pub created_at: Timestamp,
}
