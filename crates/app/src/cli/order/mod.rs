use clap::{Args, Subcommand};
use stockroom_app::{config::DatabaseConfig, domain::orders::models::Order};
use uuid::Uuid;

mod cancel;
mod confirm;

#[derive(Debug, Args)]
pub(crate) struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

/// Arguments shared by the order status commands.
#[derive(Debug, Args)]
pub(crate) struct OrderArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Staff member performing the change
    #[arg(long, env = "STAFF_UUID")]
    staff_uuid: Uuid,

    /// Order to change
    #[arg(long)]
    order_uuid: Uuid,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    /// Mark a pending order as confirmed
    Confirm(OrderArgs),

    /// Cancel an order and return its stock
    Cancel(OrderArgs),
}

pub(crate) async fn run(command: OrderCommand) -> Result<(), String> {
    match command.command {
        OrderSubcommand::Confirm(args) => confirm::run(args).await,
        OrderSubcommand::Cancel(args) => cancel::run(args).await,
    }
}

fn print_order(order: &Order) {
    println!("order_uuid: {}", order.uuid);
    println!("owner_uuid: {}", order.owner);
    println!("status: {}", order.status);
    println!("payment_status: {}", order.payment_status);
    println!("total: {}", order.total);
}
