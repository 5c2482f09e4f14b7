//! Orders service.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use stockroom::{lifecycle::Transition, reconcile::Reserve};
use tracing::info;

use crate::{
    domain::{
        lines::{self, LinesError, data::DesiredItem, models::LineItem, records::LineItemRecord},
        orders::{
            data::NewOrder,
            errors::OrdersServiceError,
            models::Order,
            records::{OrderRecord, OrderUuid},
        },
        principal::{Principal, UserUuid},
    },
    store::{LineParent, PgStore, Store, StoreError, StoreTransaction},
};

/// Orders service over any [`Store`].
///
/// Orders reserve stock for their items the moment they are committed and give it back when
/// items shrink or go away, or when the order is cancelled or deleted.
#[derive(Debug, Clone)]
pub struct StoreOrdersService<S> {
    store: S,
}

/// Orders service backed by PostgreSQL.
pub type PgOrdersService = StoreOrdersService<PgStore>;

impl<S: Store> StoreOrdersService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

/// An order the principal may see. Anything else reads as missing.
pub(crate) async fn visible_order<T: StoreTransaction>(
    tx: &mut T,
    principal: &Principal,
    order: OrderUuid,
    lock: bool,
) -> Result<OrderRecord, StoreError> {
    let record = if lock {
        tx.lock_order(order).await?
    } else {
        tx.get_order(order).await?
    };

    if !principal.can_see(record.owner) {
        return Err(StoreError::NotFound);
    }

    Ok(record)
}

/// Insert an order for `owner` and reserve stock for its items.
pub(crate) async fn insert_order<T: StoreTransaction>(
    tx: &mut T,
    owner: UserUuid,
    items: &[DesiredItem],
) -> Result<OrderRecord, LinesError> {
    let record = tx.create_order(OrderUuid::random(), owner).await?;

    lines::apply_items(tx, LineParent::Order(record.uuid), items, &Reserve).await?;

    Ok(record)
}

/// Resolve an order's items and total.
pub(crate) async fn load_order<T: StoreTransaction>(
    tx: &mut T,
    record: OrderRecord,
) -> Result<Order, LinesError> {
    let items = tx.get_line_items(LineParent::Order(record.uuid)).await?;

    let (items, total) = lines::resolve_items(tx, items).await?;

    Ok(assemble(record, items, total))
}

/// Resolve the items of many orders with one line item read and one product read.
async fn load_orders<T: StoreTransaction>(
    tx: &mut T,
    records: Vec<OrderRecord>,
) -> Result<Vec<Order>, LinesError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let uuids: Vec<OrderUuid> = records.iter().map(|record| record.uuid).collect();

    let mut grouped: FxHashMap<OrderUuid, Vec<LineItemRecord>> = FxHashMap::default();

    for (order, item) in tx.get_order_line_items(&uuids).await? {
        grouped.entry(order).or_default().push(item);
    }

    let sets = records
        .iter()
        .map(|record| grouped.remove(&record.uuid).unwrap_or_default())
        .collect();

    let resolved = lines::resolve_item_sets(tx, sets).await?;

    Ok(records
        .into_iter()
        .zip(resolved)
        .map(|(record, (items, total))| assemble(record, items, total))
        .collect())
}

fn assemble(record: OrderRecord, items: Vec<LineItem>, total: u64) -> Order {
    Order {
        uuid: record.uuid,
        owner: record.owner,
        status: record.status,
        payment_status: record.payment_status,
        payment_reference: record.payment_reference,
        items,
        total,
        created_at: record.created_at,
    }
}

fn ensure_staff(principal: &Principal) -> Result<(), OrdersServiceError> {
    if principal.is_staff() {
        Ok(())
    } else {
        Err(OrdersServiceError::Forbidden)
    }
}

#[async_trait]
impl<S: Store> OrdersService for StoreOrdersService<S> {
    async fn list_orders(&self, principal: Principal) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let owner = (!principal.is_staff()).then_some(principal.user);

        let records = tx.list_orders(owner).await?;

        let orders = load_orders(&mut tx, records).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn get_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, false).await?;

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.create_order",
        skip(self, order),
        fields(user_uuid = %principal.user, items = order.items.len()),
        err
    )]
    async fn create_order(
        &self,
        principal: Principal,
        order: NewOrder,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let record = insert_order(&mut tx, principal.user, &order.items).await?;

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        info!(order_uuid = %order.uuid, total = order.total, "created order");

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.update_items",
        skip(self, items),
        fields(order_uuid = %order, user_uuid = %principal.user, items = items.len()),
        err
    )]
    async fn update_items(
        &self,
        principal: Principal,
        order: OrderUuid,
        items: Vec<DesiredItem>,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, true).await?;

        if !record.status.holds_stock() {
            return Err(OrdersServiceError::OrderClosed);
        }

        let plan = lines::apply_items(&mut tx, LineParent::Order(order), &items, &Reserve).await?;

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        if !plan.is_empty() {
            info!(
                products = ?plan.touched_products(),
                "updated order items"
            );
        }

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.confirm_order",
        skip(self),
        fields(order_uuid = %order, user_uuid = %principal.user),
        err
    )]
    async fn confirm_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let mut record = visible_order(&mut tx, &principal, order, true).await?;

        ensure_staff(&principal)?;

        if let Transition::Changed { to, .. } = record.state().confirm()? {
            record = tx.update_order_state(order, &to).await?;

            info!("confirmed order");
        }

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order",
        skip(self),
        fields(order_uuid = %order, user_uuid = %principal.user),
        err
    )]
    async fn cancel_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let mut record = visible_order(&mut tx, &principal, order, true).await?;

        if let Transition::Changed { to, .. } = record.state().cancel() {
            let items = tx.get_line_items(LineParent::Order(order)).await?;

            let released = lines::release_items(&mut tx, &items).await?;

            record = tx.update_order_state(order, &to).await?;

            info!(products = released.len(), "cancelled order and released stock");
        }

        let order = load_order(&mut tx, record).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.delete_order",
        skip(self),
        fields(order_uuid = %order, user_uuid = %principal.user),
        err
    )]
    async fn delete_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<(), OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let record = visible_order(&mut tx, &principal, order, true).await?;

        ensure_staff(&principal)?;

        if record.status.holds_stock() {
            let items = tx.get_line_items(LineParent::Order(order)).await?;

            lines::release_items(&mut tx, &items).await?;
        }

        let rows_affected = tx.delete_order(order).await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        tx.commit().await?;

        info!("deleted order");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// The principal's orders, or every order for staff. Newest first.
    async fn list_orders(&self, principal: Principal) -> Result<Vec<Order>, OrdersServiceError>;

    /// Retrieve a single order with its items resolved.
    async fn get_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Place an order for the principal, reserving stock for every item.
    async fn create_order(
        &self,
        principal: Principal,
        order: NewOrder,
    ) -> Result<Order, OrdersServiceError>;

    /// Replace the order's item list, reserving or releasing the difference.
    async fn update_items(
        &self,
        principal: Principal,
        order: OrderUuid,
        items: Vec<DesiredItem>,
    ) -> Result<Order, OrdersServiceError>;

    /// Confirm a pending order. Staff only.
    async fn confirm_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Cancel an order and return its stock. Cancelling twice is a no-op.
    async fn cancel_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Delete an order, returning any stock it still holds. Staff only.
    async fn delete_order(
        &self,
        principal: Principal,
        order: OrderUuid,
    ) -> Result<(), OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockroom::lifecycle::{LifecycleError, OrderStatus, PaymentStatus};
    use testresult::TestResult;

    use crate::{
        domain::products::{ProductsService, records::ProductUuid},
        test::{TestContext, helpers::item},
    };

    use super::*;

    fn lines_of(order: &Order) -> Vec<(ProductUuid, u32, u64)> {
        order
            .items
            .iter()
            .map(|line| (line.product.uuid, line.quantity, line.subtotal))
            .collect()
    }

    #[tokio::test]
    async fn create_order_reserves_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(1_000, 10).await?;
        let b = ctx.product(250, 3).await?;

        let order = ctx.order(&[item(a, 4), item(b, 3)]).await?;

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.total, 4_750);
        assert_eq!(ctx.stock(a).await?, 6);
        assert_eq!(ctx.stock(b).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn order_ids_are_random() -> TestResult {
        let ctx = TestContext::new().await;

        let order = ctx.order(&[]).await?;

        assert_eq!(order.uuid.into_uuid().get_version_num(), 4);

        Ok(())
    }

    #[tokio::test]
    async fn create_order_beyond_stock_changes_nothing() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;
        let b = ctx.product(100, 1).await?;

        let result = ctx.order(&[item(a, 5), item(b, 2)]).await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::InsufficientStock { product, requested: 2, available: 1 })
                    if product == b
            ),
            "expected InsufficientStock, got {result:?}"
        );
        assert_eq!(ctx.stock(a).await?, 10);
        assert!(ctx.orders.list_orders(ctx.customer).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn update_items_is_idempotent() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;

        let order = ctx.order(&[item(a, 2)]).await?;

        let first = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 5)])
            .await?;

        let second = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 5)])
            .await?;

        assert_eq!(first.items, second.items);
        assert_eq!(ctx.stock(a).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn lines_of_a_deleted_product_can_be_kept_or_shrunk() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;
        let b = ctx.product(50, 10).await?;

        let order = ctx.order(&[item(a, 2), item(b, 1)]).await?;

        ctx.products.delete_product(ctx.staff, a).await?;

        let unchanged = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 2), item(b, 1)])
            .await?;

        assert_eq!(lines_of(&unchanged), lines_of(&order));
        assert_eq!(ctx.stock(a).await?, 8);
        assert_eq!(ctx.stock(b).await?, 9);

        let grow = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 3), item(b, 1)])
            .await;

        assert!(
            matches!(grow, Err(OrdersServiceError::UnknownProduct(p)) if p == a),
            "expected UnknownProduct, got {grow:?}"
        );

        let shrunk = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 1), item(b, 1)])
            .await?;

        assert_eq!(shrunk.total, 150);
        assert_eq!(ctx.stock(a).await?, 9);

        ctx.orders
            .update_items(ctx.customer, order.uuid, vec![item(b, 1)])
            .await?;

        assert_eq!(ctx.stock(a).await?, 10);

        Ok(())
    }

    #[tokio::test]
    async fn list_orders_resolves_each_orders_items() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;
        let b = ctx.product(250, 10).await?;

        let first = ctx.order(&[item(a, 1)]).await?;
        let second = ctx.order(&[item(a, 2), item(b, 2)]).await?;
        let empty = ctx.order(&[]).await?;
        let foreign = ctx
            .order_as(Principal::customer(UserUuid::new()), &[item(b, 1)])
            .await?;

        let listed = ctx.orders.list_orders(ctx.customer).await?;

        assert_eq!(listed.len(), 3);

        for expected in [&first, &second, &empty] {
            let found = listed
                .iter()
                .find(|order| order.uuid == expected.uuid)
                .ok_or("order missing from listing")?;

            assert_eq!(lines_of(found), lines_of(expected));
            assert_eq!(found.total, expected.total);
        }

        assert_eq!(
            listed.iter().map(|order| order.total).sum::<u64>(),
            100 + 700
        );

        let all = ctx.orders.list_orders(ctx.staff).await?;

        assert_eq!(all.len(), 4);
        assert!(all.iter().any(|order| order.uuid == foreign.uuid && order.total == 250));

        Ok(())
    }

    #[tokio::test]
    async fn grow_then_shrink_restores_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;

        let order = ctx.order(&[item(a, 2)]).await?;

        ctx.orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 7)])
            .await?;

        assert_eq!(ctx.stock(a).await?, 3);

        let restored = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 2)])
            .await?;

        assert_eq!(ctx.stock(a).await?, 8);
        assert_eq!(restored.items.first().map(|i| i.quantity), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn growth_checks_only_the_increment() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 5).await?;

        let order = ctx.order(&[item(a, 4)]).await?;

        // One unit left on the shelf: growing 4 -> 5 fits, 4 -> 6 does not.
        let too_many = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 6)])
            .await;

        assert!(
            matches!(
                too_many,
                Err(OrdersServiceError::InsufficientStock {
                    requested: 2,
                    available: 1,
                    ..
                })
            ),
            "expected InsufficientStock, got {too_many:?}"
        );

        ctx.orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 5)])
            .await?;

        assert_eq!(ctx.stock(a).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn removing_items_releases_their_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;
        let b = ctx.product(100, 10).await?;

        let order = ctx.order(&[item(a, 3), item(b, 4)]).await?;

        let updated = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(b, 4)])
            .await?;

        assert_eq!(updated.items.len(), 1);
        assert_eq!(ctx.stock(a).await?, 10);
        assert_eq!(ctx.stock(b).await?, 6);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_releases_stock_once() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 8).await?;

        let order = ctx.order(&[item(a, 3)]).await?;

        ctx.orders.confirm_order(ctx.staff, order.uuid).await?;

        assert_eq!(ctx.stock(a).await?, 5);

        let cancelled = ctx.orders.cancel_order(ctx.customer, order.uuid).await?;

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(ctx.stock(a).await?, 8);

        let again = ctx.orders.cancel_order(ctx.staff, order.uuid).await?;

        assert_eq!(again.status, OrderStatus::Cancelled);
        assert_eq!(ctx.stock(a).await?, 8);

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_orders_reject_item_updates_and_confirmation() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 8).await?;

        let order = ctx.order(&[item(a, 3)]).await?;

        ctx.orders.cancel_order(ctx.customer, order.uuid).await?;

        let update = ctx
            .orders
            .update_items(ctx.customer, order.uuid, vec![item(a, 1)])
            .await;

        assert!(
            matches!(update, Err(OrdersServiceError::OrderClosed)),
            "expected OrderClosed, got {update:?}"
        );

        let confirm = ctx.orders.confirm_order(ctx.staff, order.uuid).await;

        assert!(
            matches!(
                confirm,
                Err(OrdersServiceError::Lifecycle(LifecycleError::OrderCancelled))
            ),
            "expected OrderCancelled, got {confirm:?}"
        );
        assert_eq!(ctx.stock(a).await?, 8);

        Ok(())
    }

    #[tokio::test]
    async fn only_staff_confirm_and_delete() -> TestResult {
        let ctx = TestContext::new().await;
        let order = ctx.order(&[]).await?;

        let confirm = ctx.orders.confirm_order(ctx.customer, order.uuid).await;

        assert!(
            matches!(confirm, Err(OrdersServiceError::Forbidden)),
            "expected Forbidden, got {confirm:?}"
        );

        let delete = ctx.orders.delete_order(ctx.customer, order.uuid).await;

        assert!(
            matches!(delete, Err(OrdersServiceError::Forbidden)),
            "expected Forbidden, got {delete:?}"
        );

        let confirmed = ctx.orders.confirm_order(ctx.staff, order.uuid).await?;

        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        Ok(())
    }

    #[tokio::test]
    async fn other_customers_see_not_found() -> TestResult {
        let ctx = TestContext::new().await;
        let order = ctx.order(&[]).await?;
        let stranger = Principal::customer(UserUuid::new());

        let read = ctx.orders.get_order(stranger, order.uuid).await;

        assert!(
            matches!(read, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {read:?}"
        );

        let cancel = ctx.orders.cancel_order(stranger, order.uuid).await;

        assert!(
            matches!(cancel, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {cancel:?}"
        );

        assert!(ctx.orders.list_orders(stranger).await?.is_empty());
        assert_eq!(ctx.orders.list_orders(ctx.staff).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn delete_order_releases_held_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;

        let order = ctx.order(&[item(a, 4)]).await?;

        ctx.orders.delete_order(ctx.staff, order.uuid).await?;

        assert_eq!(ctx.stock(a).await?, 10);

        let read = ctx.orders.get_order(ctx.staff, order.uuid).await;

        assert!(
            matches!(read, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {read:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delete_cancelled_order_does_not_release_twice() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;

        let order = ctx.order(&[item(a, 4)]).await?;

        ctx.orders.cancel_order(ctx.customer, order.uuid).await?;
        ctx.orders.delete_order(ctx.staff, order.uuid).await?;

        assert_eq!(ctx.stock(a).await?, 10);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_never_oversell() -> TestResult {
        let ctx = TestContext::new().await;
        let a = ctx.product(100, 10).await?;

        let orders = Arc::new(ctx.orders.clone());

        let first = tokio::spawn({
            let orders = Arc::clone(&orders);
            let principal = ctx.customer;

            async move {
                orders
                    .create_order(principal, NewOrder { items: vec![item(a, 6)] })
                    .await
            }
        });

        let second = tokio::spawn({
            let orders = Arc::clone(&orders);
            let principal = Principal::customer(UserUuid::new());

            async move {
                orders
                    .create_order(principal, NewOrder { items: vec![item(a, 6)] })
                    .await
            }
        });

        let results = [first.await?, second.await?];

        let succeeded = results.iter().filter(|result| result.is_ok()).count();

        let short = results
            .iter()
            .filter(|result| matches!(result, Err(OrdersServiceError::InsufficientStock { .. })))
            .count();

        assert_eq!(succeeded, 1, "exactly one order should win: {results:?}");
        assert_eq!(short, 1, "the loser should see InsufficientStock: {results:?}");
        assert_eq!(ctx.stock(a).await?, 4);

        Ok(())
    }
}
