//! Line Item Records

use jiff::Timestamp;

use crate::{domain::products::records::ProductUuid, uuids::TypedUuid};

/// Line Item UUID
pub type LineItemUuid = TypedUuid<LineItemRecord>;

/// Line Item Record, shared by cart and order items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRecord {
    pub uuid: LineItemUuid,
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
