//! Payments service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use rusty_money::iso::Currency;
use stockroom::lifecycle::{LifecycleError, Transition};
use tracing::{info, warn};

use crate::{
    domain::{
        orders::{
            models::Order,
            records::OrderUuid,
            service::{load_order, visible_order},
        },
        payments::{
            errors::PaymentsServiceError,
            gateway::{IntentLine, IntentRequest, PaymentGateway},
        },
        principal::Principal,
    },
    store::{PgStore, Store, StoreTransaction},
};

/// Settings shared by every payment.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Base URL the payer returns to, e.g. `"https://shop.example"`.
    pub return_base_url: String,

    pub currency: &'static Currency,
}

impl PaymentSettings {
    fn return_url(&self, order: OrderUuid) -> String {
        format!("{}/paypal/success/?order_id={order}", self.return_base_url)
    }

    fn cancel_url(&self, order: OrderUuid) -> String {
        format!("{}/paypal/cancel/?order_id={order}", self.return_base_url)
    }
}

/// A payment that now awaits payer approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStarted {
    pub order: OrderUuid,
    pub reference: String,
    pub approval_url: String,
}

/// Payments service over any [`Store`].
#[derive(Clone)]
pub struct StorePaymentsService<S> {
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentSettings,
}

/// Payments service backed by PostgreSQL.
pub type PgPaymentsService = StorePaymentsService<PgStore>;

impl<S: Store> StorePaymentsService<S> {
    #[must_use]
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>, settings: PaymentSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }
}

#[async_trait]
impl<S: Store> PaymentsService for StorePaymentsService<S> {
    #[tracing::instrument(
        name = "payments.service.begin_payment",
        skip(self),
        fields(order_uuid = %order, user_uuid = %principal.user),
        err
    )]
    async fn begin_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<PaymentStarted, PaymentsServiceError> {
        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, false).await?;

        record.state().can_begin_payment()?;

        let snapshot = load_order(&mut tx, record).await?;

        tx.commit().await?;

        let request = IntentRequest {
            order,
            total: snapshot.total,
            currency: self.settings.currency,
            lines: snapshot
                .items
                .iter()
                .map(|item| IntentLine {
                    name: item.product.name.clone(),
                    sku: item.product.uuid.to_string(),
                    unit_price: item.product.price,
                    quantity: item.quantity,
                })
                .collect(),
            return_url: self.settings.return_url(order),
            cancel_url: self.settings.cancel_url(order),
        };

        let intent = self.gateway.create_intent(&request).await?;

        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, true).await?;

        let pending = match record.state().begin_payment(&intent.reference) {
            Ok(pending) => pending,
            Err(error) => {
                warn!(
                    reference = %intent.reference,
                    %error,
                    "order changed while creating payment intent; intent left unused"
                );

                return Err(error.into());
            }
        };

        tx.update_order_state(order, &pending).await?;

        tx.commit().await?;

        info!(reference = %intent.reference, total = snapshot.total, "payment pending");

        Ok(PaymentStarted {
            order,
            reference: intent.reference,
            approval_url: intent.approval_url,
        })
    }

    #[tracing::instrument(
        name = "payments.service.complete_payment",
        skip(self, reference, payer),
        fields(order_uuid = %order, user_uuid = %principal.user, reference = %reference),
        err
    )]
    async fn complete_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
        reference: String,
        payer: String,
    ) -> Result<Order, PaymentsServiceError> {
        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, false).await?;

        if !record.state().needs_capture(&reference)? {
            let order = load_order(&mut tx, record).await?;

            tx.commit().await?;

            info!("payment already captured; ignoring repeated callback");

            return Ok(order);
        }

        tx.commit().await?;

        self.gateway.execute(&reference, &payer).await?;

        let mut tx = self.store.begin().await?;

        let mut record = visible_order(&mut tx, &principal, order, true).await?;

        match record.state().complete_payment(&reference) {
            Ok(Transition::Changed { to, .. }) => {
                record = tx.update_order_state(order, &to).await?;

                info!("payment captured");
            }
            Ok(Transition::Unchanged(_)) => {
                info!("payment captured concurrently by another callback");
            }
            Err(error @ LifecycleError::OrderCancelled) => {
                warn!(%error, "payment captured for an order cancelled in the meantime");

                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        }

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "payments.service.cancel_payment",
        skip(self),
        fields(order_uuid = %order, user_uuid = %principal.user),
        err
    )]
    async fn cancel_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, PaymentsServiceError> {
        let mut tx = self.store.begin().await?;

        let mut record = visible_order(&mut tx, &principal, order, true).await?;

        match record.state().cancel_pending_payment() {
            Transition::Changed { to, .. } => {
                record = tx.update_order_state(order, &to).await?;

                info!("pending payment abandoned");
            }
            Transition::Unchanged(state) => {
                info!(
                    payment_status = %state.payment_status,
                    "no pending payment; ignoring cancel callback"
                );
            }
        }

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Create a payment intent for an unpaid order and mark it as pending.
    async fn begin_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<PaymentStarted, PaymentsServiceError>;

    /// Capture an approved payment and confirm the order. Repeated callbacks for a payment that
    /// was already captured succeed without effect.
    async fn complete_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
        reference: String,
        payer: String,
    ) -> Result<Order, PaymentsServiceError>;

    /// Abandon a pending payment. Callbacks for orders without one succeed without effect.
    async fn cancel_payment(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, PaymentsServiceError>;
}
