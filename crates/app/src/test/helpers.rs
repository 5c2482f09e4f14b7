//! Test Helpers

use crate::domain::{lines::data::DesiredItem, products::records::ProductUuid};

/// A desired `(product, quantity)` line.
pub(crate) fn item(product: ProductUuid, quantity: u32) -> DesiredItem {
    DesiredItem { product, quantity }
}
