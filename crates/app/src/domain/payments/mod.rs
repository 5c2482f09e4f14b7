//! Payments
//!
//! Drives an order's payment status from an external gateway's create and execute calls. Gateway
//! calls never run inside a store transaction; the order is re-read and re-checked after each one.

pub mod errors;
pub mod gateway;
pub mod paypal;
pub mod service;

pub use errors::PaymentsServiceError;
pub use gateway::{GatewayError, PaymentGateway};
pub use service::*;
