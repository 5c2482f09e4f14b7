//! Order Data

use crate::domain::lines::data::DesiredItem;

/// New Order Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub items: Vec<DesiredItem>,
}
