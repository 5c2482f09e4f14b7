//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use stockroom::reconcile::Advisory;
use tracing::info;

use crate::{
    domain::{
        carts::{
            data::NewCart,
            errors::CartsServiceError,
            models::Cart,
            records::{CartRecord, CartUuid},
        },
        lines::{self, data::DesiredItem},
        principal::Principal,
    },
    store::{LineParent, PgStore, Store, StoreError, StoreTransaction},
};

/// Carts service over any [`Store`].
///
/// Carts never hold stock. Item changes are checked against current stock for the caller's
/// benefit only; the reservation happens at checkout.
#[derive(Debug, Clone)]
pub struct StoreCartsService<S> {
    store: S,
}

/// Carts service backed by PostgreSQL.
pub type PgCartsService = StoreCartsService<PgStore>;

impl<S: Store> StoreCartsService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// A cart the principal owns. Other owners' carts read as missing.
pub(crate) async fn owned_cart<T: StoreTransaction>(
    tx: &mut T,
    principal: &Principal,
    cart: CartUuid,
    lock: bool,
) -> Result<CartRecord, StoreError> {
    let record = if lock {
        tx.lock_cart(cart).await?
    } else {
        tx.get_cart(cart).await?
    };

    if !principal.owns(record.owner) {
        return Err(StoreError::NotFound);
    }

    Ok(record)
}

async fn load_cart<T: StoreTransaction>(
    tx: &mut T,
    record: CartRecord,
) -> Result<Cart, CartsServiceError> {
    let items = tx.get_line_items(LineParent::Cart(record.uuid)).await?;

    let (items, total) = lines::resolve_items(tx, items).await?;

    Ok(Cart {
        uuid: record.uuid,
        owner: record.owner,
        items,
        total,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[async_trait]
impl<S: Store> CartsService for StoreCartsService<S> {
    async fn get_cart(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        let record = owned_cart(&mut tx, &principal, cart, false).await?;

        let cart = load_cart(&mut tx, record).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.create_cart",
        skip(self, cart),
        fields(cart_uuid = %cart.uuid, user_uuid = %principal.user, items = cart.items.len()),
        err
    )]
    async fn create_cart(
        &self,
        principal: Principal,
        cart: NewCart,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        let record = tx.create_cart(cart.uuid, principal.user).await?;

        lines::apply_items(&mut tx, LineParent::Cart(record.uuid), &cart.items, &Advisory).await?;

        let cart = load_cart(&mut tx, record).await?;

        tx.commit().await?;

        info!("created cart");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.update_items",
        skip(self, items),
        fields(cart_uuid = %cart, user_uuid = %principal.user, items = items.len()),
        err
    )]
    async fn update_items(
        &self,
        principal: Principal,
        cart: CartUuid,
        items: Vec<DesiredItem>,
    ) -> Result<Cart, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        owned_cart(&mut tx, &principal, cart, true).await?;

        lines::apply_items(&mut tx, LineParent::Cart(cart), &items, &Advisory).await?;

        // Even an unchanged item list counts as activity on the cart.
        let record = tx.touch_cart(cart).await?;

        let cart = load_cart(&mut tx, record).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.delete_cart",
        skip(self),
        fields(cart_uuid = %cart, user_uuid = %principal.user),
        err
    )]
    async fn delete_cart(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.store.begin().await?;

        owned_cart(&mut tx, &principal, cart, true).await?;

        let rows_affected = tx.delete_cart(cart).await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        tx.commit().await?;

        info!("deleted cart");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve one of the principal's carts with its items resolved.
    async fn get_cart(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<Cart, CartsServiceError>;

    /// Creates a cart for the principal with an initial item list.
    async fn create_cart(
        &self,
        principal: Principal,
        cart: NewCart,
    ) -> Result<Cart, CartsServiceError>;

    /// Replace the cart's item list.
    async fn update_items(
        &self,
        principal: Principal,
        cart: CartUuid,
        items: Vec<DesiredItem>,
    ) -> Result<Cart, CartsServiceError>;

    /// Deletes a cart and its items.
    async fn delete_cart(
        &self,
        principal: Principal,
        cart: CartUuid,
    ) -> Result<(), CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::{
            principal::UserUuid,
            products::{ProductsService, records::ProductUuid},
        },
        test::{TestContext, helpers::item},
    };

    use super::*;

    #[tokio::test]
    async fn create_cart_resolves_items_and_total() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(250, 10).await?;
        let b = ctx.product(1_000, 10).await?;

        let cart = ctx
            .carts
            .create_cart(
                ctx.customer,
                NewCart {
                    uuid: CartUuid::new(),
                    items: vec![item(a, 2), item(b, 1)],
                },
            )
            .await?;

        assert_eq!(cart.owner, ctx.customer.user);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total, 1_500);

        let subtotal_a = cart.items.iter().find(|i| i.product.uuid == a).map(|i| i.subtotal);

        assert_eq!(subtotal_a, Some(500));

        Ok(())
    }

    #[tokio::test]
    async fn carts_never_reserve_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 5).await?;

        let cart = ctx.cart(&[item(product, 4)]).await?;

        ctx.carts
            .update_items(ctx.customer, cart.uuid, vec![item(product, 5)])
            .await?;

        ctx.carts.update_items(ctx.customer, cart.uuid, vec![]).await?;

        assert_eq!(ctx.stock(product).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn create_cart_rejects_quantity_above_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 2).await?;

        let result = ctx.cart(&[item(product, 3)]).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock {
                    requested: 3,
                    available: 2,
                    ..
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn create_cart_rejects_zero_and_duplicates() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 2).await?;

        let zero = ctx.cart(&[item(product, 0)]).await;

        assert!(
            matches!(zero, Err(CartsServiceError::InvalidQuantity(p)) if p == product),
            "expected InvalidQuantity, got {zero:?}"
        );

        let duplicate = ctx.cart(&[item(product, 1), item(product, 1)]).await;

        assert!(
            matches!(duplicate, Err(CartsServiceError::DuplicateProduct(p)) if p == product),
            "expected DuplicateProduct, got {duplicate:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_products_are_rejected() {
        let ctx = TestContext::new().await;
        let missing = ProductUuid::new();

        let result = ctx.cart(&[item(missing, 1)]).await;

        assert!(
            matches!(result, Err(CartsServiceError::UnknownProduct(p)) if p == missing),
            "expected UnknownProduct, got {result:?}"
        );
    }

    #[tokio::test]
    async fn update_items_bumps_updated_at_even_when_unchanged() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 5).await?;

        let cart = ctx.cart(&[item(product, 1)]).await?;

        let updated = ctx
            .carts
            .update_items(ctx.customer, cart.uuid, vec![item(product, 1)])
            .await?;

        assert!(updated.updated_at > cart.updated_at, "updated_at should move forward");
        assert_eq!(updated.created_at, cart.created_at);
        assert_eq!(updated.items, cart.items);

        Ok(())
    }

    #[tokio::test]
    async fn update_items_shrinks_and_removes() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 5).await?;
        let b = ctx.product(100, 5).await?;

        let cart = ctx.cart(&[item(a, 3), item(b, 1)]).await?;

        let updated = ctx
            .carts
            .update_items(ctx.customer, cart.uuid, vec![item(a, 1)])
            .await?;

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items.first().map(|i| (i.product.uuid, i.quantity)), Some((a, 1)));
        assert_eq!(updated.total, 100);

        Ok(())
    }

    #[tokio::test]
    async fn other_users_carts_read_as_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 5).await?;
        let cart = ctx.cart(&[item(product, 1)]).await?;

        let stranger = Principal::customer(UserUuid::new());

        let read = ctx.carts.get_cart(stranger, cart.uuid).await;

        assert!(
            matches!(read, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {read:?}"
        );

        let staff_read = ctx.carts.get_cart(ctx.staff, cart.uuid).await;

        assert!(
            matches!(staff_read, Err(CartsServiceError::NotFound)),
            "staff do not see other users' carts, got {staff_read:?}"
        );

        let delete = ctx.carts.delete_cart(stranger, cart.uuid).await;

        assert!(
            matches!(delete, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {delete:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delete_cart_removes_it() -> TestResult {
        let ctx = TestContext::new().await;
        let cart = ctx.cart(&[]).await?;

        ctx.carts.delete_cart(ctx.customer, cart.uuid).await?;

        let result = ctx.carts.get_cart(ctx.customer, cart.uuid).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn deleted_products_stay_visible_in_carts_but_cannot_be_added() -> TestResult {
        let ctx = TestContext::new().await;
        let product = ctx.product(100, 5).await?;
        let cart = ctx.cart(&[item(product, 1)]).await?;

        ctx.products.delete_product(ctx.staff, product).await?;

        let read = ctx.carts.get_cart(ctx.customer, cart.uuid).await?;

        assert_eq!(read.items.len(), 1);

        let grow = ctx
            .carts
            .update_items(ctx.customer, cart.uuid, vec![item(product, 2)])
            .await;

        assert!(
            matches!(grow, Err(CartsServiceError::UnknownProduct(p)) if p == product),
            "expected UnknownProduct, got {grow:?}"
        );

        let kept = ctx
            .carts
            .update_items(ctx.customer, cart.uuid, vec![item(product, 1)])
            .await?;

        assert_eq!(kept.items.len(), 1);

        let emptied = ctx
            .carts
            .update_items(ctx.customer, cart.uuid, vec![])
            .await?;

        assert!(emptied.items.is_empty());

        Ok(())
    }
}
