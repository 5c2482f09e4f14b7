use clap::Args;

use crate::cli::{connect, staff};

use super::PaymentArgs;

#[derive(Debug, Args)]
pub(crate) struct CompletePaymentArgs {
    #[command(flatten)]
    payment: PaymentArgs,

    /// Gateway payment reference returned by `payment begin`
    #[arg(long)]
    reference: String,

    /// Payer id the gateway appended to the return URL
    #[arg(long)]
    payer_id: String,
}

pub(crate) async fn run(args: CompletePaymentArgs) -> Result<(), String> {
    let CompletePaymentArgs {
        payment,
        reference,
        payer_id,
    } = args;

    let context = connect(&payment.database).await?;

    let payments = context
        .payments(&payment.payments)
        .map_err(|error| format!("failed to configure payments: {error}"))?;

    let order = payments
        .complete_payment(
            staff(payment.staff_uuid),
            payment.order_uuid.into(),
            reference,
            payer_id,
        )
        .await
        .map_err(|error| format!("failed to complete payment: {error}"))?;

    println!("order_uuid: {}", order.uuid);
    println!("status: {}", order.status);
    println!("payment_status: {}", order.payment_status);

    Ok(())
}
