use crate::cli::{connect, staff};

use super::{OrderArgs, print_order};

pub(crate) async fn run(args: OrderArgs) -> Result<(), String> {
    let context = connect(&args.database).await?;

    let order = context
        .orders
        .cancel_order(staff(args.staff_uuid), args.order_uuid.into())
        .await
        .map_err(|error| format!("failed to cancel order: {error}"))?;

    print_order(&order);

    Ok(())
}
