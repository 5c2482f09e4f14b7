use clap::{Args, Subcommand};

mod create;
mod restock;

#[derive(Debug, Args)]
pub(crate) struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    /// Add a product to the catalogue
    Create(create::CreateProductArgs),

    /// Add units to a product's stock
    Restock(restock::RestockProductArgs),
}

pub(crate) async fn run(command: ProductCommand) -> Result<(), String> {
    match command.command {
        ProductSubcommand::Create(args) => create::run(args).await,
        ProductSubcommand::Restock(args) => restock::run(args).await,
    }
}
