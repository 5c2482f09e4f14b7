//! Products service.

use async_trait::async_trait;
use mockall::automock;
use stockroom::stock::StockLedger;
use tracing::info;

use crate::{
    domain::{
        principal::Principal,
        products::{
            data::{NewProduct, ProductUpdate},
            errors::ProductsServiceError,
            records::{ProductRecord, ProductUuid},
        },
    },
    store::{PgStore, Store, StoreTransaction},
};

/// Products service over any [`Store`].
#[derive(Debug, Clone)]
pub struct StoreProductsService<S> {
    store: S,
}

/// Products service backed by PostgreSQL.
pub type PgProductsService = StoreProductsService<PgStore>;

impl<S: Store> StoreProductsService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

fn ensure_staff(principal: &Principal) -> Result<(), ProductsServiceError> {
    if principal.is_staff() {
        Ok(())
    } else {
        Err(ProductsServiceError::Forbidden)
    }
}

#[async_trait]
impl<S: Store> ProductsService for StoreProductsService<S> {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError> {
        let mut tx = self.store.begin().await?;

        let products = tx.list_products().await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.store.begin().await?;

        let product = tx
            .get_products(&[product])
            .await?
            .into_iter()
            .find(|record| !record.is_deleted())
            .ok_or(ProductsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(product)
    }

    #[tracing::instrument(
        name = "products.service.create_product",
        skip(self, product),
        fields(product_uuid = %product.uuid, stock = product.stock),
        err
    )]
    async fn create_product(
        &self,
        principal: Principal,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError> {
        ensure_staff(&principal)?;

        if product.name.trim().is_empty() {
            return Err(ProductsServiceError::InvalidName);
        }

        let mut tx = self.store.begin().await?;

        let created = tx.create_product(&product).await?;

        tx.commit().await?;

        info!("created product");

        Ok(created)
    }

    #[tracing::instrument(
        name = "products.service.update_product",
        skip(self, update),
        fields(product_uuid = %product),
        err
    )]
    async fn update_product(
        &self,
        principal: Principal,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError> {
        ensure_staff(&principal)?;

        if update.name.trim().is_empty() {
            return Err(ProductsServiceError::InvalidName);
        }

        let mut tx = self.store.begin().await?;

        let updated = tx.update_product(product, &update).await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "products.service.restock_product",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn restock_product(
        &self,
        principal: Principal,
        product: ProductUuid,
        amount: u64,
    ) -> Result<ProductRecord, ProductsServiceError> {
        ensure_staff(&principal)?;

        let mut tx = self.store.begin().await?;

        let mut locked = tx
            .lock_products(&[product])
            .await?
            .into_iter()
            .find(|record| !record.is_deleted())
            .ok_or(ProductsServiceError::NotFound)?;

        let mut ledger = StockLedger::new([(locked.uuid, locked.stock)]);

        locked.stock = ledger
            .release(product, amount)
            .map_err(|_source| ProductsServiceError::NotFound)?;

        let writes = ledger.writes();

        if !writes.is_empty() {
            tx.write_stock(&writes).await?;
        }

        tx.commit().await?;

        info!(stock = locked.stock, "restocked product");

        Ok(locked)
    }

    #[tracing::instrument(
        name = "products.service.delete_product",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn delete_product(
        &self,
        principal: Principal,
        product: ProductUuid,
    ) -> Result<(), ProductsServiceError> {
        ensure_staff(&principal)?;

        let mut tx = self.store.begin().await?;

        let rows_affected = tx.delete_product(product).await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        info!("deleted product");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves all live products.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError>;

    /// Retrieve a single live product.
    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Creates a new product with its opening stock. Staff only.
    async fn create_product(
        &self,
        principal: Principal,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Changes a product's name and price. Staff only.
    async fn update_product(
        &self,
        principal: Principal,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Adds `amount` units to a product's stock. Staff only.
    async fn restock_product(
        &self,
        principal: Principal,
        product: ProductUuid,
        amount: u64,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Soft-deletes a product. Existing cart and order items keep referring to it. Staff only.
    async fn delete_product(
        &self,
        principal: Principal,
        product: ProductUuid,
    ) -> Result<(), ProductsServiceError>;
}
