//! Line Item Data

use stockroom::reconcile::DesiredLine;

use crate::domain::{lines::records::LineItemUuid, products::records::ProductUuid};

/// A requested `(product, quantity)` pair.
pub type DesiredItem = DesiredLine<ProductUuid>;

/// New Line Item Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub uuid: LineItemUuid,
    pub product_uuid: ProductUuid,
    pub quantity: u32,
}

/// Line Item Quantity Update Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemUpdate {
    pub uuid: LineItemUuid,
    pub quantity: u32,
}
