use clap::Args;
use stockroom_app::config::DatabaseConfig;
use uuid::Uuid;

use crate::cli::{connect, staff};

#[derive(Debug, Args)]
pub(crate) struct RestockProductArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Staff member performing the change
    #[arg(long, env = "STAFF_UUID")]
    staff_uuid: Uuid,

    /// Product to restock
    #[arg(long)]
    product_uuid: Uuid,

    /// Units to add
    #[arg(long)]
    amount: u64,
}

pub(crate) async fn run(args: RestockProductArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let product = context
        .products
        .restock_product(staff(args.staff_uuid), args.product_uuid.into(), args.amount)
        .await
        .map_err(|error| format!("failed to restock product: {error}"))?;

    println!("product_uuid: {}", product.uuid);
    println!("stock: {}", product.stock);

    Ok(())
}
