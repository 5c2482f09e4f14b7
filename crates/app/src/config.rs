//! Configuration
//!
//! Settings are read from CLI flags with environment fallbacks. A `.env` file, if present, is
//! loaded before parsing.

use clap::{Args, ValueEnum};
use rusty_money::iso::{self, Currency};
use thiserror::Error;

use crate::domain::payments::{
    PaymentSettings,
    paypal::{PayPalConfig, SANDBOX_API_BASE},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// Database settings.
#[derive(Debug, Args)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

/// Payment gateway settings.
#[derive(Debug, Args)]
pub struct PaymentConfig {
    /// PayPal REST API base URL
    #[arg(long, env = "PAYPAL_API_BASE", default_value = SANDBOX_API_BASE)]
    pub paypal_api_base: String,

    /// PayPal REST client id
    #[arg(long, env = "PAYPAL_CLIENT_ID")]
    pub paypal_client_id: String,

    /// PayPal REST client secret
    #[arg(long, env = "PAYPAL_CLIENT_SECRET", hide_env_values = true)]
    pub paypal_client_secret: String,

    /// Base URL payers are sent back to after approving or cancelling
    #[arg(long, env = "PAYMENT_RETURN_BASE_URL")]
    pub payment_return_base_url: String,

    /// ISO 4217 currency every order is charged in
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = "USD")]
    pub payment_currency: String,
}

impl PaymentConfig {
    #[must_use]
    pub fn paypal(&self) -> PayPalConfig {
        PayPalConfig {
            api_base: self.paypal_api_base.trim_end_matches('/').to_string(),
            client_id: self.paypal_client_id.clone(),
            client_secret: self.paypal_client_secret.clone(),
        }
    }

    /// Settings for the payments service.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured currency is not an ISO 4217 code.
    pub fn settings(&self) -> Result<PaymentSettings, ConfigError> {
        Ok(PaymentSettings {
            return_base_url: self.payment_return_base_url.trim_end_matches('/').to_string(),
            currency: currency(&self.payment_currency)?,
        })
    }
}

fn currency(code: &str) -> Result<&'static Currency, ConfigError> {
    iso::find(&code.trim().to_ascii_uppercase())
        .ok_or_else(|| ConfigError::UnknownCurrency(code.to_string()))
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn payment_config(currency: &str) -> PaymentConfig {
        PaymentConfig {
            paypal_api_base: "https://api-m.sandbox.paypal.com/".to_string(),
            paypal_client_id: "client".to_string(),
            paypal_client_secret: "secret".to_string(),
            payment_return_base_url: "https://shop.example/".to_string(),
            payment_currency: currency.to_string(),
        }
    }

    #[test]
    fn settings_resolve_currency_and_trim_urls() -> TestResult {
        let config = payment_config("usd");

        let settings = config.settings()?;

        assert_eq!(settings.currency.iso_alpha_code, "USD");
        assert_eq!(settings.return_base_url, "https://shop.example");
        assert_eq!(config.paypal().api_base, "https://api-m.sandbox.paypal.com");

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let result = payment_config("XXY").settings();

        assert!(
            matches!(&result, Err(ConfigError::UnknownCurrency(code)) if code == "XXY"),
            "expected UnknownCurrency, got {result:?}"
        );
    }
}
