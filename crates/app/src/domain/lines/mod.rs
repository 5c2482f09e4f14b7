//! Line Items
//!
//! Shared handling of cart and order line items. Reconciliation runs in two phases inside the
//! caller's transaction: the plan is computed purely against freshly locked stock, then the stock
//! ledger and the line item batches are written with one bulk statement each.

use rustc_hash::{FxHashMap, FxHashSet};
use stockroom::{
    pricing,
    reconcile::{ExistingLine, ReconcileError, ReconciliationPlan, StockPolicy, reconcile},
    stock::{StockLedger, StockWrite},
};
use tracing::debug;

use crate::{
    domain::{
        lines::{
            data::{DesiredItem, LineItemUpdate, NewLineItem},
            models::LineItem,
            records::{LineItemRecord, LineItemUuid},
        },
        products::records::{ProductRecord, ProductUuid},
    },
    store::{LineParent, StoreError, StoreTransaction},
};

pub mod data;
pub mod errors;
pub mod models;
pub mod records;

pub use errors::LinesError;

/// Reconcile the items of `parent` with `desired` and write the result.
///
/// When `policy` moves stock, every product referenced by `desired` or by the current items is
/// locked before the plan is computed, so availability is checked against stock no concurrent
/// transaction can change. Otherwise the products are only read.
///
/// A product that has been deleted may no longer be added or grown, but lines that already hold it
/// can be kept as they are, shrunk or removed.
pub(crate) async fn apply_items<T, P>(
    tx: &mut T,
    parent: LineParent,
    desired: &[DesiredItem],
    policy: &P,
) -> Result<ReconciliationPlan<ProductUuid, LineItemUuid>, LinesError>
where
    T: StoreTransaction,
    P: StockPolicy + Sync + ?Sized,
{
    let existing = tx.get_line_items(parent).await?;

    let mut products: Vec<ProductUuid> = desired
        .iter()
        .map(|line| line.product)
        .chain(existing.iter().map(|item| item.product_uuid))
        .collect();

    products.sort_unstable();
    products.dedup();

    let locked = if policy.moves_stock() {
        tx.lock_products(&products).await?
    } else {
        tx.get_products(&products).await?
    };

    let live: FxHashSet<ProductUuid> = locked
        .iter()
        .filter(|product| !product.is_deleted())
        .map(|product| product.uuid)
        .collect();

    let held: FxHashMap<ProductUuid, u32> = existing
        .iter()
        .map(|item| (item.product_uuid, item.quantity))
        .collect();

    let retired = desired.iter().find(|line| {
        !live.contains(&line.product)
            && line.quantity > held.get(&line.product).copied().unwrap_or(0)
    });

    if let Some(line) = retired {
        return Err(ReconcileError::UnknownProduct(line.product).into());
    }

    let mut ledger = StockLedger::new(locked.iter().map(|product| (product.uuid, product.stock)));

    let existing: Vec<ExistingLine<ProductUuid, LineItemUuid>> = existing
        .iter()
        .map(|item| ExistingLine {
            line: item.uuid,
            product: item.product_uuid,
            quantity: item.quantity,
        })
        .collect();

    let plan = reconcile(desired, &existing, &ledger, policy)?;

    ledger.apply_all(&plan.stock_deltas)?;

    write_stock(tx, &ledger.writes()).await?;

    if !plan.creates.is_empty() {
        let creates: Vec<NewLineItem> = plan
            .creates
            .iter()
            .map(|create| NewLineItem {
                uuid: LineItemUuid::new(),
                product_uuid: create.product,
                quantity: create.quantity,
            })
            .collect();

        tx.insert_line_items(parent, &creates).await?;
    }

    if !plan.updates.is_empty() {
        let updates: Vec<LineItemUpdate> = plan
            .updates
            .iter()
            .map(|update| LineItemUpdate {
                uuid: update.line,
                quantity: update.quantity,
            })
            .collect();

        tx.update_line_items(parent, &updates).await?;
    }

    if !plan.deletes.is_empty() {
        tx.delete_line_items(parent, &plan.deletes).await?;
    }

    debug!(
        ?parent,
        creates = plan.creates.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        stock_deltas = plan.stock_deltas.len(),
        "reconciled line items"
    );

    Ok(plan)
}

/// Return the full quantity of every item to stock. The items themselves are left in place.
pub(crate) async fn release_items<T>(
    tx: &mut T,
    items: &[LineItemRecord],
) -> Result<Vec<StockWrite<ProductUuid>>, LinesError>
where
    T: StoreTransaction,
{
    let mut products: Vec<ProductUuid> = items.iter().map(|item| item.product_uuid).collect();

    products.sort_unstable();
    products.dedup();

    let locked = tx.lock_products(&products).await?;

    let mut ledger = StockLedger::new(locked.iter().map(|product| (product.uuid, product.stock)));

    for item in items {
        ledger.release(item.product_uuid, u64::from(item.quantity))?;
    }

    let writes = ledger.writes();

    write_stock(tx, &writes).await?;

    Ok(writes)
}

/// Resolve the products of `items` with one batched read and price them.
///
/// Returns the resolved items and their total in minor units.
pub(crate) async fn resolve_items<T>(
    tx: &mut T,
    items: Vec<LineItemRecord>,
) -> Result<(Vec<LineItem>, u64), LinesError>
where
    T: StoreTransaction,
{
    let mut resolved = resolve_item_sets(tx, vec![items]).await?;

    Ok(resolved.pop().unwrap_or_default())
}

/// Resolve several item lists at once, reading every referenced product in a single batch.
///
/// The output keeps the order of `sets`.
pub(crate) async fn resolve_item_sets<T>(
    tx: &mut T,
    sets: Vec<Vec<LineItemRecord>>,
) -> Result<Vec<(Vec<LineItem>, u64)>, LinesError>
where
    T: StoreTransaction,
{
    let mut uuids: Vec<ProductUuid> = sets
        .iter()
        .flatten()
        .map(|item| item.product_uuid)
        .collect();

    uuids.sort_unstable();
    uuids.dedup();

    let products: FxHashMap<ProductUuid, ProductRecord> = if uuids.is_empty() {
        FxHashMap::default()
    } else {
        tx.get_products(&uuids)
            .await?
            .into_iter()
            .map(|product| (product.uuid, product))
            .collect()
    };

    sets.into_iter()
        .map(|items| price_items(&products, items))
        .collect()
}

fn price_items(
    products: &FxHashMap<ProductUuid, ProductRecord>,
    items: Vec<LineItemRecord>,
) -> Result<(Vec<LineItem>, u64), LinesError> {
    let resolved = items
        .into_iter()
        .map(|item| {
            let product = products
                .get(&item.product_uuid)
                .cloned()
                .ok_or(StoreError::InvalidReference)?;

            let subtotal = pricing::line_subtotal(product.price, item.quantity)?;

            Ok(LineItem {
                uuid: item.uuid,
                product,
                quantity: item.quantity,
                subtotal,
            })
        })
        .collect::<Result<Vec<_>, LinesError>>()?;

    let total = pricing::total(resolved.iter().map(|item| (item.product.price, item.quantity)))?;

    Ok((resolved, total))
}

async fn write_stock<T>(tx: &mut T, writes: &[StockWrite<ProductUuid>]) -> Result<(), StoreError>
where
    T: StoreTransaction,
{
    if writes.is_empty() {
        return Ok(());
    }

    tx.write_stock(writes).await?;

    Ok(())
}
