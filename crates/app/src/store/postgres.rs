//! PostgreSQL store.

use std::str::FromStr;

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{
    FromRow, PgPool, Postgres, Row, Transaction, postgres::PgRow, query, query_as,
};
use stockroom::{
    lifecycle::{OrderState, OrderStatus, PaymentStatus},
    stock::StockWrite,
};
use uuid::Uuid;

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

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const GET_PRODUCTS_SQL: &str = include_str!("sql/get_products.sql");
const LOCK_PRODUCTS_SQL: &str = include_str!("sql/lock_products.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const DELETE_PRODUCT_SQL: &str = include_str!("sql/delete_product.sql");
const WRITE_STOCK_SQL: &str = include_str!("sql/write_stock.sql");

const GET_CART_SQL: &str = include_str!("sql/get_cart.sql");
const LOCK_CART_SQL: &str = include_str!("sql/lock_cart.sql");
const CREATE_CART_SQL: &str = include_str!("sql/create_cart.sql");
const TOUCH_CART_SQL: &str = include_str!("sql/touch_cart.sql");
const DELETE_CART_SQL: &str = include_str!("sql/delete_cart.sql");

const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const LOCK_ORDER_SQL: &str = include_str!("sql/lock_order.sql");
const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const UPDATE_ORDER_STATE_SQL: &str = include_str!("sql/update_order_state.sql");
const DELETE_ORDER_SQL: &str = include_str!("sql/delete_order.sql");

const GET_CART_ITEMS_SQL: &str = include_str!("sql/get_cart_items.sql");
const INSERT_CART_ITEMS_SQL: &str = include_str!("sql/insert_cart_items.sql");
const UPDATE_CART_ITEMS_SQL: &str = include_str!("sql/update_cart_items.sql");
const DELETE_CART_ITEMS_SQL: &str = include_str!("sql/delete_cart_items.sql");

const GET_ORDER_ITEMS_SQL: &str = include_str!("sql/get_order_items.sql");
const GET_ORDERS_ITEMS_SQL: &str = include_str!("sql/get_orders_items.sql");
const INSERT_ORDER_ITEMS_SQL: &str = include_str!("sql/insert_order_items.sql");
const UPDATE_ORDER_ITEMS_SQL: &str = include_str!("sql/update_order_items.sql");
const DELETE_ORDER_ITEMS_SQL: &str = include_str!("sql/delete_order_items.sql");

/// SQL for each line item operation, per parent kind.
struct LineItemsSql {
    get: &'static str,
    insert: &'static str,
    update: &'static str,
    delete: &'static str,
}

const CART_ITEMS_SQL: LineItemsSql = LineItemsSql {
    get: GET_CART_ITEMS_SQL,
    insert: INSERT_CART_ITEMS_SQL,
    update: UPDATE_CART_ITEMS_SQL,
    delete: DELETE_CART_ITEMS_SQL,
};

const ORDER_ITEMS_SQL: LineItemsSql = LineItemsSql {
    get: GET_ORDER_ITEMS_SQL,
    insert: INSERT_ORDER_ITEMS_SQL,
    update: UPDATE_ORDER_ITEMS_SQL,
    delete: DELETE_ORDER_ITEMS_SQL,
};

impl LineParent {
    fn sql(self) -> (&'static LineItemsSql, Uuid) {
        match self {
            Self::Cart(cart) => (&CART_ITEMS_SQL, cart.into_uuid()),
            Self::Order(order) => (&ORDER_ITEMS_SQL, order.into_uuid()),
        }
    }
}

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Transaction over a [`PgStore`]. Rolled back when dropped without committing.
#[derive(Debug)]
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    type Transaction = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        Ok(PgTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_source| StoreError::InvalidData)
}

fn uuids<T>(ids: &[crate::uuids::TypedUuid<T>]) -> Vec<Uuid> {
    ids.iter().map(|id| id.into_uuid()).collect()
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn list_products(&mut self) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn get_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(query_as::<Postgres, ProductRecord>(GET_PRODUCTS_SQL)
            .bind(uuids(products))
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn lock_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(query_as::<Postgres, ProductRecord>(LOCK_PRODUCTS_SQL)
            .bind(uuids(products))
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn create_product(&mut self, product: &NewProduct) -> Result<ProductRecord, StoreError> {
        Ok(query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(&product.name)
            .bind(to_i64(product.price)?)
            .bind(to_i64(product.stock)?)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_product(
        &mut self,
        product: ProductUuid,
        update: &ProductUpdate,
    ) -> Result<ProductRecord, StoreError> {
        Ok(query_as::<Postgres, ProductRecord>(UPDATE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .bind(&update.name)
            .bind(to_i64(update.price)?)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn delete_product(&mut self, product: ProductUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn write_stock(&mut self, writes: &[StockWrite<ProductUuid>]) -> Result<u64, StoreError> {
        let products: Vec<Uuid> = writes.iter().map(|w| w.product.into_uuid()).collect();

        let levels = writes
            .iter()
            .map(|w| to_i64(w.stock))
            .collect::<Result<Vec<i64>, _>>()?;

        let rows_affected = query(WRITE_STOCK_SQL)
            .bind(products)
            .bind(levels)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn get_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn lock_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(LOCK_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn create_cart(
        &mut self,
        cart: CartUuid,
        owner: UserUuid,
    ) -> Result<CartRecord, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(CREATE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(owner.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn touch_cart(&mut self, cart: CartUuid) -> Result<CartRecord, StoreError> {
        Ok(query_as::<Postgres, CartRecord>(TOUCH_CART_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn delete_cart(&mut self, cart: CartUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn list_orders(
        &mut self,
        owner: Option<UserUuid>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(query_as::<Postgres, OrderRecord>(LIST_ORDERS_SQL)
            .bind(owner.map(UserUuid::into_uuid))
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn get_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        Ok(query_as::<Postgres, OrderRecord>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn lock_order(&mut self, order: OrderUuid) -> Result<OrderRecord, StoreError> {
        Ok(query_as::<Postgres, OrderRecord>(LOCK_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn create_order(
        &mut self,
        order: OrderUuid,
        owner: UserUuid,
    ) -> Result<OrderRecord, StoreError> {
        Ok(query_as::<Postgres, OrderRecord>(CREATE_ORDER_SQL)
            .bind(order.into_uuid())
            .bind(owner.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_order_state(
        &mut self,
        order: OrderUuid,
        state: &OrderState,
    ) -> Result<OrderRecord, StoreError> {
        Ok(query_as::<Postgres, OrderRecord>(UPDATE_ORDER_STATE_SQL)
            .bind(order.into_uuid())
            .bind(state.status.as_str())
            .bind(state.payment_status.as_str())
            .bind(state.payment_reference.as_deref())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn delete_order(&mut self, order: OrderUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_ORDER_SQL)
            .bind(order.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn get_line_items(
        &mut self,
        parent: LineParent,
    ) -> Result<Vec<LineItemRecord>, StoreError> {
        let (sql, parent) = parent.sql();

        Ok(query_as::<Postgres, LineItemRecord>(sql.get)
            .bind(parent)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn get_order_line_items(
        &mut self,
        orders: &[OrderUuid],
    ) -> Result<Vec<(OrderUuid, LineItemRecord)>, StoreError> {
        let uuids: Vec<Uuid> = orders.iter().map(|o| o.into_uuid()).collect();

        let rows = query(GET_ORDERS_ITEMS_SQL)
            .bind(uuids)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows
            .iter()
            .map(|row| {
                let order = OrderUuid::from_uuid(row.try_get("order_uuid")?);

                Ok((order, LineItemRecord::from_row(row)?))
            })
            .collect::<sqlx::Result<Vec<_>>>()?;

        Ok(items)
    }

    async fn insert_line_items(
        &mut self,
        parent: LineParent,
        items: &[NewLineItem],
    ) -> Result<u64, StoreError> {
        let (sql, parent) = parent.sql();

        let uuids: Vec<Uuid> = items.iter().map(|i| i.uuid.into_uuid()).collect();
        let products: Vec<Uuid> = items.iter().map(|i| i.product_uuid.into_uuid()).collect();
        let quantities: Vec<i64> = items.iter().map(|i| i64::from(i.quantity)).collect();

        let rows_affected = query(sql.insert)
            .bind(parent)
            .bind(uuids)
            .bind(products)
            .bind(quantities)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn update_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUpdate],
    ) -> Result<u64, StoreError> {
        let (sql, parent) = parent.sql();

        let uuids: Vec<Uuid> = items.iter().map(|i| i.uuid.into_uuid()).collect();
        let quantities: Vec<i64> = items.iter().map(|i| i64::from(i.quantity)).collect();

        let rows_affected = query(sql.update)
            .bind(parent)
            .bind(uuids)
            .bind(quantities)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn delete_line_items(
        &mut self,
        parent: LineParent,
        items: &[LineItemUuid],
    ) -> Result<u64, StoreError> {
        let (sql, parent) = parent.sql();

        let rows_affected = query(sql.delete)
            .bind(parent)
            .bind(uuids(items))
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;

        Ok(())
    }
}

fn decode_u64(row: &PgRow, column: &str) -> sqlx::Result<u64> {
    let value: i64 = row.try_get(column)?;

    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_status<S>(row: &PgRow, column: &str) -> sqlx::Result<S>
where
    S: FromStr,
    S::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.try_get(column)?;

    value.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            price: decode_u64(row, "price")?,
            stock: decode_u64(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            owner: UserUuid::from_uuid(row.try_get("owner_uuid")?),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            owner: UserUuid::from_uuid(row.try_get("owner_uuid")?),
            status: decode_status::<OrderStatus>(row, "status")?,
            payment_status: decode_status::<PaymentStatus>(row, "payment_status")?,
            payment_reference: row.try_get("payment_reference")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for LineItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity: i64 = row.try_get("quantity")?;

        let quantity = u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: LineItemUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            quantity,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use testresult::TestResult;

    use crate::{
        domain::{
            carts::{CartsService, PgCartsService, data::NewCart},
            orders::{OrdersService, OrdersServiceError, PgOrdersService, data::NewOrder},
            principal::Principal,
        },
        test::{db::TestDb, helpers::item},
    };

    use super::*;

    async fn seed(store: &PgStore, stock: u64) -> Result<ProductUuid, StoreError> {
        let product = new_product(stock);

        let mut tx = store.begin().await?;
        tx.create_product(&product).await?;
        tx.commit().await?;

        Ok(product.uuid)
    }

    async fn stock_of(store: &PgStore, product: ProductUuid) -> Result<u64, StoreError> {
        let mut tx = store.begin().await?;

        tx.get_products(&[product])
            .await?
            .first()
            .map(|record| record.stock)
            .ok_or(StoreError::NotFound)
    }

    fn new_product(stock: u64) -> NewProduct {
        NewProduct {
            uuid: ProductUuid::new(),
            name: "Widget".to_string(),
            price: 1_999,
            stock,
        }
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn stock_round_trips_through_bulk_write() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());

        let a = new_product(5);
        let b = new_product(7);

        let mut tx = store.begin().await?;
        tx.create_product(&a).await?;
        tx.create_product(&b).await?;
        tx.commit().await?;

        let mut tx = store.begin().await?;

        let locked = tx.lock_products(&[b.uuid, a.uuid]).await?;

        assert_eq!(locked.len(), 2);

        let rows = tx
            .write_stock(&[
                StockWrite {
                    product: a.uuid,
                    stock: 1,
                },
                StockWrite {
                    product: b.uuid,
                    stock: 9,
                },
            ])
            .await?;

        assert_eq!(rows, 2);

        tx.commit().await?;

        let mut tx = store.begin().await?;
        let mut found = tx.get_products(&[a.uuid, b.uuid]).await?;
        found.sort_by_key(|p| p.stock);

        assert_eq!(found.iter().map(|p| p.stock).collect::<Vec<_>>(), vec![1, 9]);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn negative_stock_is_rejected_by_the_schema() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());
        let product = new_product(1);

        let mut tx = store.begin().await?;
        tx.create_product(&product).await?;
        tx.commit().await?;

        let mut tx = store.begin().await?;

        let result = query("UPDATE products SET stock = -1 WHERE uuid = $1")
            .bind(product.uuid.into_uuid())
            .execute(&mut *tx.tx)
            .await
            .map_err(StoreError::from);

        assert!(
            matches!(result, Err(StoreError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn line_items_round_trip_in_bulk() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());
        let product = new_product(10);
        let order = OrderUuid::random();

        let mut tx = store.begin().await?;
        tx.create_product(&product).await?;
        tx.create_order(order, UserUuid::new()).await?;

        let item = LineItemUuid::new();

        tx.insert_line_items(
            LineParent::Order(order),
            &[NewLineItem {
                uuid: item,
                product_uuid: product.uuid,
                quantity: 3,
            }],
        )
        .await?;

        tx.update_line_items(
            LineParent::Order(order),
            &[LineItemUpdate {
                uuid: item,
                quantity: 4,
            }],
        )
        .await?;

        let items = tx.get_line_items(LineParent::Order(order)).await?;

        assert_eq!(items.iter().map(|i| i.quantity).collect::<Vec<_>>(), vec![4]);

        let deleted = tx.delete_line_items(LineParent::Order(order), &[item]).await?;

        assert_eq!(deleted, 1);

        let record = tx
            .update_order_state(
                order,
                &OrderState {
                    status: OrderStatus::Confirmed,
                    payment_status: PaymentStatus::PaymentPending,
                    payment_reference: Some("PAY-1".to_string()),
                },
            )
            .await?;

        assert_eq!(record.status, OrderStatus::Confirmed);
        assert_eq!(record.payment_reference.as_deref(), Some("PAY-1"));

        tx.commit().await?;

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a container runtime"]
    async fn concurrent_orders_for_one_product_never_oversell() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());
        let product = seed(&store, 10).await?;

        let orders = Arc::new(PgOrdersService::new(store.clone()));

        let place = move |orders: Arc<PgOrdersService>| async move {
            orders
                .create_order(
                    Principal::customer(UserUuid::new()),
                    NewOrder {
                        items: vec![item(product, 6)],
                    },
                )
                .await
        };

        let first = tokio::spawn(place(Arc::clone(&orders)));
        let second = tokio::spawn(place(Arc::clone(&orders)));

        let results = [first.await?, second.await?];

        let succeeded = results.iter().filter(|result| result.is_ok()).count();

        let short = results
            .iter()
            .filter(|result| matches!(result, Err(OrdersServiceError::InsufficientStock { .. })))
            .count();

        assert_eq!(succeeded, 1, "exactly one order should win: {results:?}");
        assert_eq!(short, 1, "the loser should see InsufficientStock: {results:?}");
        assert_eq!(stock_of(&store, product).await?, 4);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a container runtime"]
    async fn orders_on_disjoint_products_do_not_wait_for_each_other() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());
        let held = seed(&store, 10).await?;
        let other = seed(&store, 10).await?;

        let mut holder = store.begin().await?;
        holder.lock_products(&[held]).await?;

        let orders = PgOrdersService::new(store.clone());

        let order = tokio::time::timeout(
            Duration::from_secs(5),
            orders.create_order(
                Principal::customer(UserUuid::new()),
                NewOrder {
                    items: vec![item(other, 3)],
                },
            ),
        )
        .await??;

        assert_eq!(order.total, 3 * 1_999);
        assert_eq!(stock_of(&store, other).await?, 7);

        holder.commit().await?;

        assert_eq!(stock_of(&store, held).await?, 10);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a container runtime"]
    async fn cart_updates_do_not_wait_on_locked_products() -> TestResult {
        let db = TestDb::new().await;
        let store = PgStore::new(db.pool().clone());
        let product = seed(&store, 10).await?;

        let mut holder = store.begin().await?;
        holder.lock_products(&[product]).await?;

        let carts = PgCartsService::new(store.clone());

        let cart = tokio::time::timeout(
            Duration::from_secs(5),
            carts.create_cart(
                Principal::customer(UserUuid::new()),
                NewCart {
                    uuid: CartUuid::new(),
                    items: vec![item(product, 4)],
                },
            ),
        )
        .await??;

        assert_eq!(cart.items.len(), 1);

        holder.commit().await?;

        assert_eq!(stock_of(&store, product).await?, 10);

        Ok(())
    }
}
