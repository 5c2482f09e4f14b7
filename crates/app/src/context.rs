//! App Context

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::{
    config::{ConfigError, PaymentConfig},
    database,
    domain::{
        carts::{CartsService, PgCartsService},
        checkout::{CheckoutService, PgCheckoutService},
        orders::{OrdersService, PgOrdersService},
        payments::{PaymentsService, PgPaymentsService, paypal::PayPalClient},
        products::{PgProductsService, ProductsService},
    },
    store::PgStore,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("invalid payment configuration")]
    Payments(#[from] ConfigError),
}

/// Every service, wired to one PostgreSQL store.
#[derive(Clone)]
pub struct AppContext {
    pub products: Arc<dyn ProductsService>,
    pub carts: Arc<dyn CartsService>,
    pub orders: Arc<dyn OrdersService>,
    pub checkout: Arc<dyn CheckoutService>,
    store: PgStore,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_pool(pool))
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        let store = PgStore::new(pool);

        Self {
            products: Arc::new(PgProductsService::new(store.clone())),
            carts: Arc::new(PgCartsService::new(store.clone())),
            orders: Arc::new(PgOrdersService::new(store.clone())),
            checkout: Arc::new(PgCheckoutService::new(store.clone())),
            store,
        }
    }

    /// Payments service talking to PayPal.
    ///
    /// # Errors
    ///
    /// Returns an error when the payment settings are invalid.
    pub fn payments(
        &self,
        config: &PaymentConfig,
    ) -> Result<Arc<dyn PaymentsService>, AppInitError> {
        let settings = config.settings()?;

        Ok(Arc::new(PgPaymentsService::new(
            self.store.clone(),
            Arc::new(PayPalClient::new(config.paypal())),
            settings,
        )))
    }
}
