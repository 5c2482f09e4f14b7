//! Checkout
//!
//! Converts a cart into an order in a single transaction. The order reserves stock exactly as a
//! directly placed order would, and the cart is only deleted once that has succeeded.

pub mod errors;
pub mod service;

pub use errors::CheckoutServiceError;
pub use service::*;
