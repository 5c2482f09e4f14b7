use clap::{Args, Subcommand};
use stockroom_app::config::{DatabaseConfig, PaymentConfig};
use uuid::Uuid;

mod begin;
mod complete;

#[derive(Debug, Args)]
pub(crate) struct PaymentCommand {
    #[command(subcommand)]
    command: PaymentSubcommand,
}

/// Connection and identity arguments shared by the payment commands.
#[derive(Debug, Args)]
pub(crate) struct PaymentArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    payments: PaymentConfig,

    /// Staff member acting on the order
    #[arg(long, env = "STAFF_UUID")]
    staff_uuid: Uuid,

    /// Order being paid for
    #[arg(long)]
    order_uuid: Uuid,
}

#[derive(Debug, Subcommand)]
enum PaymentSubcommand {
    /// Create a gateway payment for an unpaid order and print the approval URL
    Begin(begin::BeginPaymentArgs),

    /// Capture an approved payment
    Complete(complete::CompletePaymentArgs),
}

pub(crate) async fn run(command: PaymentCommand) -> Result<(), String> {
    match command.command {
        PaymentSubcommand::Begin(args) => begin::run(args).await,
        PaymentSubcommand::Complete(args) => complete::run(args).await,
    }
}
