//! End-to-end order flows through the pure engine

use stockroom::prelude::*;
use testresult::TestResult;

fn existing(line: u32, product: u32, quantity: u32) -> ExistingLine<u32, u32> {
    ExistingLine {
        line,
        product,
        quantity,
    }
}

fn desired(product: u32, quantity: u32) -> DesiredLine<u32> {
    DesiredLine { product, quantity }
}

#[test]
fn order_reserves_then_returns_stock_on_edit() -> TestResult {
    let mut ledger = StockLedger::new([(1, 10), (2, 5)]);

    let fresh: [ExistingLine<u32, u32>; 0] = [];

    let plan = reconcile(&[desired(1, 3), desired(2, 5)], &fresh, &ledger, &Reserve)?;

    assert_eq!(plan.creates.len(), 2);
    ledger.apply_all(&plan.stock_deltas)?;

    assert_eq!(
        ledger.writes(),
        vec![
            StockWrite { product: 1, stock: 7 },
            StockWrite { product: 2, stock: 0 },
        ]
    );

    // Shrink product 1 and drop product 2 in a later transaction.
    let mut ledger = StockLedger::new([(1, 7), (2, 0)]);
    let lines = [existing(100, 1, 3), existing(101, 2, 5)];

    let plan = reconcile(&[desired(1, 1)], &lines, &ledger, &Reserve)?;

    assert_eq!(plan.deletes, vec![101]);
    assert_eq!(plan.updates.len(), 1);
    ledger.apply_all(&plan.stock_deltas)?;

    assert_eq!(
        ledger.writes(),
        vec![
            StockWrite { product: 1, stock: 9 },
            StockWrite { product: 2, stock: 5 },
        ]
    );

    Ok(())
}

#[test]
fn cart_growth_is_checked_against_full_quantity() {
    let ledger = StockLedger::new([(1, 4)]);

    let result = reconcile(&[desired(1, 5)], &[existing(7, 1, 3)], &ledger, &Advisory);

    assert!(
        matches!(
            result,
            Err(ReconcileError::InsufficientStock {
                product: 1,
                requested: 5,
                available: 4,
            })
        ),
        "expected InsufficientStock, got {result:?}"
    );
}

#[test]
fn paid_order_flow_is_replay_safe() -> TestResult {
    let order = OrderState::default();

    let pending = order.begin_payment("PAY-1")?;

    assert_eq!(pending.payment_status, PaymentStatus::PaymentPending);
    assert!(pending.needs_capture("PAY-1")?, "pending payment should need capture");

    let paid = pending.complete_payment("PAY-1")?.into_state();

    assert_eq!(paid.status, OrderStatus::Confirmed);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let replay = paid.complete_payment("PAY-1")?;

    assert!(!replay.is_changed(), "replayed capture should not change state");
    assert_eq!(
        paid.complete_payment("PAY-2"),
        Err(LifecycleError::ReferenceMismatch)
    );

    Ok(())
}

#[test]
fn order_total_renders_for_gateway() -> TestResult {
    let amount = total([(1_250, 2), (99, 3)])?;

    assert_eq!(amount, 2_797);
    assert_eq!(render_amount(amount, rusty_money::iso::USD)?, "27.97");

    Ok(())
}
