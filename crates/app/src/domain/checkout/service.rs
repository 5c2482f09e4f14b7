//! Checkout service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    domain::{
        carts::{records::CartUuid, service::owned_cart},
        checkout::errors::CheckoutServiceError,
        lines::data::DesiredItem,
        orders::{
            models::Order,
            service::{insert_order, load_order},
        },
        principal::Principal,
    },
    store::{LineParent, PgStore, Store, StoreTransaction},
};

/// Checkout service over any [`Store`].
#[derive(Debug, Clone)]
pub struct StoreCheckoutService<S> {
    store: S,
}

/// Checkout service backed by PostgreSQL.
pub type PgCheckoutService = StoreCheckoutService<PgStore>;

impl<S: Store> StoreCheckoutService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> CheckoutService for StoreCheckoutService<S> {
    #[tracing::instrument(
        name = "checkout.service.checkout",
        skip(self),
        fields(cart_uuid = %cart, user_uuid = %principal.user),
        err
    )]
    async fn checkout(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<Order, CheckoutServiceError> {
        let mut tx = self.store.begin().await?;

        let record = owned_cart(&mut tx, &principal, cart, true).await?;

        let items: Vec<DesiredItem> = tx
            .get_line_items(LineParent::Cart(record.uuid))
            .await?
            .into_iter()
            .map(|item| DesiredItem {
                product: item.product_uuid,
                quantity: item.quantity,
            })
            .collect();

        if items.is_empty() {
            return Err(CheckoutServiceError::EmptyCart);
        }

        let order = insert_order(&mut tx, record.owner, &items).await?;

        let order = load_order(&mut tx, order).await?;

        tx.delete_cart(cart).await?;

        tx.commit().await?;

        info!(order_uuid = %order.uuid, total = order.total, "checked out cart");

        Ok(order)
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Turn one of the principal's carts into an order and delete the cart. Nothing changes if
    /// the order cannot be placed.
    async fn checkout(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<Order, CheckoutServiceError>;
}
