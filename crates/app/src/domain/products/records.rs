//! Product Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,

    /// Unit price in minor units.
    pub price: u64,

    /// Units on hand, net of every committed order reservation.
    pub stock: u64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl ProductRecord {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
