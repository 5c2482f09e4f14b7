//! Cart Models

use jiff::Timestamp;

use crate::domain::{carts::records::CartUuid, lines::models::LineItem, principal::UserUuid};

/// Cart Model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub uuid: CartUuid,
    pub owner: UserUuid,
    pub items: Vec<LineItem>,

    /// Sum of item subtotals at current prices, in minor units.
    pub total: u64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
