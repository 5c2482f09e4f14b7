//! PayPal REST client for the payments v1 API.

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use reqwest::{Client, Response, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use stockroom::pricing::render_amount;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::domain::payments::gateway::{
    GatewayError, IntentRequest, PaymentGateway, PaymentIntent,
};

/// Sandbox API base used when none is configured.
pub const SANDBOX_API_BASE: &str = "https://api-m.sandbox.paypal.com";

/// Configuration for connecting to PayPal.
#[derive(Debug, Clone)]
pub struct PayPalConfig {
    /// API base, e.g. `"https://api-m.sandbox.paypal.com"`.
    pub api_base: String,

    pub client_id: String,
    pub client_secret: String,
}

/// HTTP client for PayPal payment creation and execution.
#[derive(Debug)]
pub struct PayPalClient {
    config: PayPalConfig,
    http: Client,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Timestamp,
}

impl PayPalClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            config,
            http: Client::new(),
            token: Mutex::new(None),
        }
    }

    /// A bearer token, fetched with the client credentials grant and reused until shortly before
    /// it expires.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Timestamp::now()) {
            return Ok(token.value.clone());
        }

        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let parsed: TokenResponse = checked(response).await?.json().await?;

        let lifetime = SignedDuration::from_secs(parsed.expires_in.saturating_sub(60));

        let expires_at = Timestamp::now()
            .checked_add(lifetime)
            .map_err(|source| GatewayError::UnexpectedResponse(source.to_string()))?;

        debug!(%expires_at, "fetched paypal access token");

        *cached = Some(AccessToken {
            value: parsed.access_token.clone(),
            expires_at,
        });

        Ok(parsed.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let currency = request.currency.iso_alpha_code;

        let items = request
            .lines
            .iter()
            .map(|line| {
                Ok(json!({
                    "name": line.name,
                    "price": render_amount(line.unit_price, request.currency)?,
                    "currency": currency,
                    "quantity": line.quantity,
                    "sku": line.sku,
                }))
            })
            .collect::<Result<Vec<Value>, GatewayError>>()?;

        let body = json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "redirect_urls": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            },
            "transactions": [{
                "item_list": { "items": items },
                "amount": {
                    "total": render_amount(request.total, request.currency)?,
                    "currency": currency,
                },
                "description": format!("Payment for order {}", request.order),
            }],
        });

        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!("{}/v1/payments/payment", self.config.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let payment: PaymentResponse = checked(response).await?.json().await?;

        let approval_url = payment
            .links
            .into_iter()
            .find(|link| link.rel == "approval_url")
            .map(|link| link.href)
            .ok_or_else(|| {
                GatewayError::UnexpectedResponse(format!(
                    "payment {} has no approval_url link",
                    payment.id
                ))
            })?;

        Ok(PaymentIntent {
            reference: payment.id,
            approval_url,
        })
    }

    async fn execute(&self, reference: &str, payer: &str) -> Result<(), GatewayError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v1/payments/payment/{reference}/execute",
                self.config.api_base
            ))
            .bearer_auth(token)
            .json(&json!({ "payer_id": payer }))
            .send()
            .await?;

        checked(response).await?;

        Ok(())
    }
}

/// Pass 2xx responses through; turn anything else into a [`GatewayError`] carrying PayPal's error
/// payload.
async fn checked(response: Response) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let Ok(details) = serde_json::from_str::<Value>(&text) else {
        return Err(GatewayError::UnexpectedResponse(format!(
            "request failed with status {status}: {text}"
        )));
    };

    error!(%status, %details, "paypal rejected request");

    Err(rejection(&details, status.as_str()))
}

fn rejection(details: &Value, fallback: &str) -> GatewayError {
    let field = |key: &str| details.get(key).and_then(Value::as_str).map(str::to_string);

    GatewayError::Rejected {
        name: field("name")
            .or_else(|| field("error"))
            .unwrap_or_else(|| fallback.to_string()),
        message: field("message")
            .or_else(|| field("error_description"))
            .unwrap_or_default(),
        details: details.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,

    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}
