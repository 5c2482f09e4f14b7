//! Carts

pub mod data;
pub mod errors;
pub mod models;
pub mod records;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;
