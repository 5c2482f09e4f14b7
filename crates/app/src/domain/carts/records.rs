//! Cart Records

use jiff::Timestamp;

use crate::{domain::principal::UserUuid, uuids::TypedUuid};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub owner: UserUuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
