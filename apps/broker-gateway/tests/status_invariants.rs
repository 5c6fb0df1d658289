//! Property tests for the order status lifecycle.

use proptest::prelude::*;
use rust_decimal::Decimal;

use broker_gateway::domain::broker::AssetClass;
use broker_gateway::domain::order::{
    NewOrder, Order, OrderSide, OrderStatus, OrderStatusUpdate, OrderType,
};

const STATUSES: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::Submitted,
    OrderStatus::Accepted,
    OrderStatus::PartiallyFilled,
    OrderStatus::Filled,
    OrderStatus::Canceled,
    OrderStatus::Rejected,
    OrderStatus::Expired,
];

fn arb_status() -> impl Strategy<Value = OrderStatus> {
    (0..STATUSES.len()).prop_map(|i| STATUSES[i])
}

fn arb_update() -> impl Strategy<Value = OrderStatusUpdate> {
    (arb_status(), 0u32..20, 1u32..200_000).prop_map(|(status, qty, price_cents)| {
        OrderStatusUpdate {
            status,
            filled_quantity: (qty > 0).then(|| Decimal::from(qty)),
            filled_price: Some(Decimal::new(i64::from(price_cents), 2)),
            commission: None,
            raw: serde_json::Value::Null,
        }
    })
}

fn market_buy(quantity: u32) -> Order {
    Order::new(NewOrder {
        owner_id: "owner".into(),
        connection_id: "conn".into(),
        vendor_order_id: "vendor-1".into(),
        symbol: "XYZ".into(),
        side: OrderSide::Buy,
        order_type: OrderType::Market,
        asset_class: AssetClass::Stocks,
        quantity: Decimal::from(quantity),
        limit_price: None,
        stop_price: None,
    })
}

proptest! {
    /// Once terminal, an order never changes status again.
    #[test]
    fn terminal_states_are_sticky(updates in proptest::collection::vec(arb_update(), 1..40)) {
        let mut order = market_buy(10);
        let mut first_terminal: Option<OrderStatus> = None;

        for update in &updates {
            order.record_update(update);
            if let Some(terminal) = first_terminal {
                prop_assert_eq!(order.status, terminal);
            } else if order.status.is_terminal() {
                first_terminal = Some(order.status);
            }
        }
    }

    /// Status rank never decreases across any update sequence.
    #[test]
    fn progression_is_monotonic(updates in proptest::collection::vec(arb_update(), 1..40)) {
        let mut order = market_buy(10);
        let mut previous = order.status;

        for update in &updates {
            order.record_update(update);
            let regressed = matches!(
                (previous, order.status),
                (OrderStatus::Accepted, OrderStatus::Pending | OrderStatus::Submitted)
                    | (OrderStatus::Submitted, OrderStatus::Pending)
                    | (
                        OrderStatus::PartiallyFilled,
                        OrderStatus::Pending | OrderStatus::Submitted | OrderStatus::Accepted
                    )
            );
            prop_assert!(!regressed, "status regressed from {} to {}", previous, order.status);
            previous = order.status;
        }
    }

    /// Reported fills never exceed the requested quantity.
    #[test]
    fn fills_never_exceed_quantity(updates in proptest::collection::vec(arb_update(), 1..40)) {
        let mut order = market_buy(10);
        for update in &updates {
            order.record_update(update);
            if let Some(filled) = order.filled_quantity {
                prop_assert!(filled <= order.quantity);
            }
        }
    }
}
