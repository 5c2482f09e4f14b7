//! Payment gateway collaborator.

use async_trait::async_trait;
use mockall::automock;
use rusty_money::iso::Currency;
use serde_json::Value;
use stockroom::pricing::PricingError;
use thiserror::Error;

use crate::domain::orders::records::OrderUuid;

/// One line of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentLine {
    /// Product name shown to the payer.
    pub name: String,

    /// Stock keeping unit; the product id.
    pub sku: String,

    /// Unit price in minor units.
    pub unit_price: u64,

    pub quantity: u32,
}

/// A request to create a payment intent for an order.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub order: OrderUuid,

    /// Amount to charge in minor units.
    pub total: u64,

    pub currency: &'static Currency,
    pub lines: Vec<IntentLine>,

    /// Where the payer is sent after approving.
    pub return_url: String,

    /// Where the payer is sent after abandoning.
    pub cancel_url: String,
}

/// A payment intent created by the gateway, awaiting payer approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Gateway id of the intent, stored as the order's payment reference.
    pub reference: String,

    /// URL the payer must visit to approve the payment.
    pub approval_url: String,
}

/// Errors reported by a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the request. `details` carries its full error payload.
    #[error("payment gateway rejected the request: {name}: {message}")]
    Rejected {
        name: String,
        message: String,
        details: Value,
    },

    /// Transport or decoding failure.
    #[error("payment gateway http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with something that could not be understood.
    #[error("unexpected response from payment gateway: {0}")]
    UnexpectedResponse(String),

    /// An amount could not be rendered for the gateway.
    #[error("amount cannot be sent to the payment gateway")]
    Amount(#[from] PricingError),
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Capture an approved intent.
    async fn execute(&self, reference: &str, payer: &str) -> Result<(), GatewayError>;
}
