use clap::{Parser, Subcommand};
use stockroom_app::{
    config::{DatabaseConfig, LoggingConfig},
    context::AppContext,
    domain::principal::{Principal, UserUuid},
    observability,
};
use uuid::Uuid;

mod migrate;
mod order;
mod payment;
mod product;

#[derive(Debug, Parser)]
#[command(name = "stockroom-app", about = "Stockroom CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate(migrate::MigrateArgs),
    Product(product::ProductCommand),
    Order(order::OrderCommand),
    Payment(payment::PaymentCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init(&self.logging)
            .map_err(|error| format!("failed to initialise logging: {error}"))?;

        match self.command {
            Commands::Migrate(args) => migrate::run(args).await,
            Commands::Product(command) => product::run(command).await,
            Commands::Order(command) => order::run(command).await,
            Commands::Payment(command) => payment::run(command).await,
        }
    }
}

async fn connect(database: &DatabaseConfig) -> Result<AppContext, String> {
    AppContext::from_database_url(&database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

/// Back-office commands act as the staff member identified by `--staff-uuid`.
fn staff(user: Uuid) -> Principal {
    Principal::staff(UserUuid::from_uuid(user))
}
