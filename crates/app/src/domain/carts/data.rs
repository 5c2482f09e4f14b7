//! Cart Data

use crate::domain::{carts::records::CartUuid, lines::data::DesiredItem};

/// New Cart Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCart {
    pub uuid: CartUuid,
    pub items: Vec<DesiredItem>,
}
