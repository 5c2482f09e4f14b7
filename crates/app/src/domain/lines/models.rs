//! Line Item Models

use crate::domain::{lines::records::LineItemUuid, products::records::ProductRecord};

/// Line item with its product resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub uuid: LineItemUuid,
    pub product: ProductRecord,
    pub quantity: u32,

    /// Current unit price times quantity, in minor units.
    pub subtotal: u64,
}
