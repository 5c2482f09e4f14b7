use clap::Args;
use stockroom_app::{
    config::DatabaseConfig,
    domain::products::{data::NewProduct, records::ProductUuid},
};
use uuid::Uuid;

use crate::cli::{connect, staff};

#[derive(Debug, Args)]
pub(crate) struct CreateProductArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Staff member performing the change
    #[arg(long, env = "STAFF_UUID")]
    staff_uuid: Uuid,

    /// Product display name
    #[arg(long)]
    name: String,

    /// Unit price in minor units (e.g. cents)
    #[arg(long)]
    price: u64,

    /// Opening stock
    #[arg(long, default_value_t = 0)]
    stock: u64,

    /// Optional product UUID; generated when omitted
    #[arg(long)]
    product_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: CreateProductArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let product = context
        .products
        .create_product(
            staff(args.staff_uuid),
            NewProduct {
                uuid: args
                    .product_uuid
                    .map_or_else(ProductUuid::new, ProductUuid::from_uuid),
                name: args.name,
                price: args.price,
                stock: args.stock,
            },
        )
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("name: {}", product.name);
    println!("price: {}", product.price);
    println!("stock: {}", product.stock);

    Ok(())
}
