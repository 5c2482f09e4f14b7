//! Products Data

use crate::domain::products::records::ProductUuid;

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: u64,
    pub stock: u64,
}

/// Product Update Data
///
/// Stock only moves through the stock ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub name: String,
    pub price: u64,
}
