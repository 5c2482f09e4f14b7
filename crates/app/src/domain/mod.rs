//! Stockroom Domain Concerns

pub mod carts;
pub mod checkout;
pub mod lines;
pub mod orders;
pub mod payments;
pub mod principal;
pub mod products;
