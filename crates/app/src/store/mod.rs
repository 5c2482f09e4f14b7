//! Storage
//!
//! The transactional store every service runs against. A [`Store`] hands out
//! [`StoreTransaction`]s; nothing is visible to other transactions until `commit`, and dropping a
//! transaction without committing rolls it back.
//!
//! Stock correctness rests on [`StoreTransaction::lock_products`]: rows it returns stay locked
//! until the transaction ends, so two reconciliations touching the same product serialize while
//! disjoint ones proceed independently.

use async_trait::async_trait;
use stockroom::{lifecycle::OrderState, stock::StockWrite};

use crate::domain::{
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
};

pub mod errors;
pub mod memory;
pub mod postgres;

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The owner of a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineParent {
    /// Items of a cart.
    Cart(CartUuid),

    /// Items of an order.
    Order(OrderUuid),
}

/// A source of transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Transaction type handed out by this store.
    type Transaction: StoreTransaction;

    /// Begin a transaction.
    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// Operations available inside a transaction.
#[async_trait]
pub trait StoreTransaction: Send {
    /// All live products.
    async fn list_products(&mut self) -> Result<Vec<ProductRecord>, StoreError>;

    /// The given products, including deleted ones, in one round trip. Missing ids are skipped.
    async fn get_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError>;

    /// The given products, including deleted ones, locked for update until the transaction ends.
    /// Rows are locked in ascending id order.
    async fn lock_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError>;

    /// Insert a product.
    async fn create_product(&mut self, product: &NewProduct) -> Result<ProductRecord, StoreError>;

    /// Change a product's catalogue details.
    async fn update_product(
        &mut self,
        product: ProductUuid,
        update: &ProductUpdate,
    ) -> Result<ProductRecord, StoreError>;

    /// Soft-delete a product, returning the number of rows affected.
    async fn delete_product(&mut self, product: ProductUuid) -> Result<u64, StoreError>;

    /// Write new absolute stock levels for many products in one statement.
    async fn write_stock(&mut self, writes: &[StockWrite<ProductUuid>]) -> Result<u64, StoreError>;

    /// A cart.
    async fn get_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError>;

    /// A cart, locked for update.
    async fn lock_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError>;

    /// Insert an empty cart.
    async fn create_cart(&mut self, cart: CartUuid, owner: UserUuid)
    -> Result<CartRecord, StoreError>;

    /// Bump a cart's `updated_at`.
    async fn touch_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError>;

    /// Delete a cart and its items, returning the number of carts deleted.
    async fn delete_cart(&mut self, cart: CartUuid) -> Result<u64, StoreError>;

    /// Orders, optionally restricted to one owner, newest first.
    async fn list_orders(&mut self, owner: Option<UserUuid>)
    -> Result<Vec<OrderRecord>, StoreError>;

    /// An order.
    async fn get_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError>;

    /// An order, locked for update.
    async fn lock_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError>;

    /// Insert an empty, pending, unpaid order.
    async fn create_order(
        &mut self,
        order: OrderUuid,
        owner: UserUuid,
    ) -> Result<OrderRecord, StoreError>;

    /// Persist an order's status, payment status and payment reference.
    async fn update_order_state(
        &mut self,
        order: OrderUuid,
        state: &OrderState,
    ) -> Result<OrderRecord, StoreError>;

    /// Delete an order and its items, returning the number of orders deleted.
    async fn delete_order(&mut self, order: OrderUuid) -> Result<u64, StoreError>;

    /// Line items of a cart or order.
    async fn get_line_items(&mut self, parent: LineParent)
    -> Result<Vec<LineItemRecord>, StoreError>;

    /// Line items of many orders in one read, each paired with the order it belongs to.
    async fn get_order_line_items(
        &mut self,
        orders: &[OrderUuid],
    ) -> Result<Vec<(OrderUuid, LineItemRecord)>, StoreError>;

    /// Insert many line items in one statement.
    async fn insert_line_items(
        &mut self,
        parent: LineParent,
        items: &[NewLineItem],
    ) -> Result<u64, StoreError>;

    /// Change the quantity of many line items in one statement.
    async fn update_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUpdate],
    ) -> Result<u64, StoreError>;

    /// Delete many line items in one statement.
    async fn delete_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUuid],
    ) -> Result<u64, StoreError>;

    /// Commit the transaction.
    async fn commit(self) -> Result<(), StoreError>;
}
