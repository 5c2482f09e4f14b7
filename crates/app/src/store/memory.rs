//! In-memory store.
//!
//! Transactions take an exclusive lock on the whole state and work on a private copy that replaces
//! the shared state on commit. Dropping a transaction discards the copy. Every transaction is
//! serialized, which is stricter than the row locks the PostgreSQL store takes.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use rustc_hash::{FxHashMap, FxHashSet};
use stockroom::{lifecycle::OrderState, stock::StockWrite};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{
        carts::records::{CartRecord, CartUuid},
        lines::{
            data::{LineItemUpdate, NewLineItem},
            records::{LineItemRecord, LineItemUuid},
        },
        orders::records::{OrderRecord, OrderUuid},
        principal::UserUuid,
        products::{
            data::{NewProduct, ProductUpdate},
            records::{ProductRecord, ProductUuid},
        },
    },
    store::{LineParent, Store, StoreError, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductUuid, ProductRecord>,
    carts: BTreeMap<CartUuid, CartRecord>,
    orders: BTreeMap<OrderUuid, OrderRecord>,
    lines: FxHashMap<LineParent, Vec<LineItemRecord>>,
}

impl MemoryState {
    fn parent_exists(&self, parent: LineParent) -> bool {
        match parent {
            LineParent::Cart(cart) => self.carts.contains_key(&cart),
            LineParent::Order(order) => self.orders.contains_key(&order),
        }
    }

    fn find_products(&self, products: &[ProductUuid]) -> Vec<ProductRecord> {
        let mut found: Vec<ProductRecord> = products
            .iter()
            .collect::<FxHashSet<_>>()
            .into_iter()
            .filter_map(|uuid| self.products.get(uuid).cloned())
            .collect();

        found.sort_unstable_by_key(|product| product.uuid);

        found
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl Store for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();

        Ok(MemoryTransaction { guard, working })
    }
}

/// A timestamp strictly after `previous`, so successive writes are always ordered.
fn after(previous: Timestamp) -> Timestamp {
    let now = Timestamp::now();

    previous
        .checked_add(SignedDuration::from_nanos(1))
        .map_or(now, |next| next.max(now))
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn list_products(&mut self) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self
            .working
            .products
            .values()
            .filter(|product| !product.is_deleted())
            .cloned()
            .collect())
    }

    async fn get_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self.working.find_products(products))
    }

    async fn lock_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self.working.find_products(products))
    }

    async fn create_product(&mut self, product: &NewProduct) -> Result<ProductRecord, StoreError> {
        if self.working.products.contains_key(&product.uuid) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();

        let record = ProductRecord {
            uuid: product.uuid,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.working.products.insert(record.uuid, record.clone());

        Ok(record)
    }

    async fn update_product(
        &mut self,
        product: ProductUuid,
        update: &ProductUpdate,
    ) -> Result<ProductRecord, StoreError> {
        let record = self
            .working
            .products
            .get_mut(&product)
            .filter(|record| !record.is_deleted())
            .ok_or(StoreError::NotFound)?;

        record.name.clone_from(&update.name);
        record.price = update.price;
        record.updated_at = after(record.updated_at);

        Ok(record.clone())
    }

    async fn delete_product(&mut self, product: ProductUuid) -> Result<u64, StoreError> {
        let Some(record) = self
            .working
            .products
            .get_mut(&product)
            .filter(|record| !record.is_deleted())
        else {
            return Ok(0);
        };

        let now = after(record.updated_at);

        record.deleted_at = Some(now);
        record.updated_at = now;

        Ok(1)
    }

    async fn write_stock(&mut self, writes: &[StockWrite<ProductUuid>]) -> Result<u64, StoreError> {
        let mut rows_affected = 0;

        for write in writes {
            if let Some(record) = self.working.products.get_mut(&write.product) {
                record.stock = write.stock;
                record.updated_at = after(record.updated_at);
                rows_affected += 1;
            }
        }

        Ok(rows_affected)
    }

    async fn get_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        self.working
            .carts
            .get(&cart)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn lock_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        self.get_cart(cart).await
    }

    async fn create_cart(
        &mut self,
        cart: CartUuid,
        owner: UserUuid,
    ) -> Result<CartRecord, StoreError> {
        if self.working.carts.contains_key(&cart) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();

        let record = CartRecord {
            uuid: cart,
            owner,
            created_at: now,
            updated_at: now,
        };

        self.working.carts.insert(cart, record.clone());

        Ok(record)
    }

    async fn touch_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        let record = self
            .working
            .carts
            .get_mut(&cart)
            .ok_or(StoreError::NotFound)?;

        record.updated_at = after(record.updated_at);

        Ok(record.clone())
    }

    async fn delete_cart(&mut self, cart: CartUuid) -> Result<u64, StoreError> {
        self.working.lines.remove(&LineParent::Cart(cart));

        Ok(u64::from(self.working.carts.remove(&cart).is_some()))
    }

    async fn list_orders(
        &mut self,
        owner: Option<UserUuid>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let mut orders: Vec<OrderRecord> = self
            .working
            .orders
            .values()
            .filter(|order| owner.is_none_or(|owner| order.owner == owner))
            .cloned()
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.uuid.cmp(&b.uuid)));

        Ok(orders)
    }

    async fn get_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        self.working
            .orders
            .get(&order)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn lock_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        self.get_order(order).await
    }

    async fn create_order(
        &mut self,
        order: OrderUuid,
        owner: UserUuid,
    ) -> Result<OrderRecord, StoreError> {
        if self.working.orders.contains_key(&order) {
            return Err(StoreError::AlreadyExists);
        }

        let record = OrderRecord {
            uuid: order,
            owner,
            status: OrderState::default().status,
            payment_status: OrderState::default().payment_status,
            payment_reference: None,
            created_at: Timestamp::now(),
        };

        self.working.orders.insert(order, record.clone());

        Ok(record)
    }

    async fn update_order_state(
        &mut self,
        order: OrderUuid,
        state: &OrderState,
    ) -> Result<OrderRecord, StoreError> {
        let record = self
            .working
            .orders
            .get_mut(&order)
            .ok_or(StoreError::NotFound)?;

        record.status = state.status;
        record.payment_status = state.payment_status;
        record.payment_reference.clone_from(&state.payment_reference);

        Ok(record.clone())
    }

    async fn delete_order(&mut self, order: OrderUuid) -> Result<u64, StoreError> {
        self.working.lines.remove(&LineParent::Order(order));

        Ok(u64::from(self.working.orders.remove(&order).is_some()))
    }

    async fn get_line_items(
        &mut self,
        parent: LineParent,
    ) -> Result<Vec<LineItemRecord>, StoreError> {
        Ok(self.working.lines.get(&parent).cloned().unwrap_or_default())
    }

    async fn get_order_line_items(
        &mut self,
        orders: &[OrderUuid],
    ) -> Result<Vec<(OrderUuid, LineItemRecord)>, StoreError> {
        let items = orders
            .iter()
            .flat_map(|&order| {
                self.working
                    .lines
                    .get(&LineParent::Order(order))
                    .into_iter()
                    .flatten()
                    .map(move |item| (order, item.clone()))
            })
            .collect();

        Ok(items)
    }

    async fn insert_line_items(
        &mut self,
        parent: LineParent,
        items: &[NewLineItem],
    ) -> Result<u64, StoreError> {
        if !self.working.parent_exists(parent) {
            return Err(StoreError::InvalidReference);
        }

        if items
            .iter()
            .any(|item| !self.working.products.contains_key(&item.product_uuid))
        {
            return Err(StoreError::InvalidReference);
        }

        if items.iter().any(|item| item.quantity == 0) {
            return Err(StoreError::InvalidData);
        }

        let existing = self.working.lines.entry(parent).or_default();

        let mut products: FxHashSet<ProductUuid> =
            existing.iter().map(|item| item.product_uuid).collect();

        if !items.iter().all(|item| products.insert(item.product_uuid)) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();

        existing.extend(items.iter().map(|item| LineItemRecord {
            uuid: item.uuid,
            product_uuid: item.product_uuid,
            quantity: item.quantity,
            created_at: now,
            updated_at: now,
        }));

        Ok(items.len() as u64)
    }

    async fn update_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUpdate],
    ) -> Result<u64, StoreError> {
        if items.iter().any(|item| item.quantity == 0) {
            return Err(StoreError::InvalidData);
        }

        let quantities: FxHashMap<LineItemUuid, u32> =
            items.iter().map(|item| (item.uuid, item.quantity)).collect();

        let mut rows_affected = 0;

        for item in self.working.lines.entry(parent).or_default() {
            if let Some(quantity) = quantities.get(&item.uuid) {
                item.quantity = *quantity;
                item.updated_at = after(item.updated_at);
                rows_affected += 1;
            }
        }

        Ok(rows_affected)
    }

    async fn delete_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUuid],
    ) -> Result<u64, StoreError> {
        let doomed: FxHashSet<LineItemUuid> = items.iter().copied().collect();

        let Some(existing) = self.working.lines.get_mut(&parent) else {
            return Ok(0);
        };

        let before = existing.len();

        existing.retain(|item| !doomed.contains(&item.uuid));

        Ok((before - existing.len()) as u64)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.working;

        Ok(())
    }
}
