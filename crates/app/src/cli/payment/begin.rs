use clap::Args;

use crate::cli::{connect, staff};

use super::PaymentArgs;

#[derive(Debug, Args)]
pub(crate) struct BeginPaymentArgs {
    #[command(flatten)]
    payment: PaymentArgs,
}

pub(crate) async fn run(args: BeginPaymentArgs) -> Result<(), String> {
    let args = args.payment;
    let context = connect(&args.database).await?;

    let payments = context
        .payments(&args.payments)
        .map_err(|error| format!("failed to configure payments: {error}"))?;

    let started = payments
        .begin_payment(staff(args.staff_uuid), args.order_uuid.into())
        .await
        .map_err(|error| format!("failed to begin payment: {error}"))?;

    println!("order_uuid: {}", started.order);
    println!("payment_reference: {}", started.reference);
    println!("approval_url: {}", started.approval_url);

    Ok(())
}
