use std::fmt::Debug;

use cucumber::{gherkin::Step, then, when};
use harvest_common::Money;
use harvest_engine::{
    db_types::{CartLine, DeliveryType, NewOrder, NewPayment, OrderStatusType, PaymentMethod, PaymentStatus, ProductId},
    order_objects::{OrderOwner, OrderQueryFilter, Pagination},
    payment_objects::Refund,
    InventoryLedger,
};

use serde::Serialize;

use crate::cucumber::{market_world::error_name, MarketWorld};

fn money(s: &str) -> Money {
    s.parse::<Money>().unwrap_or_else(|e| panic!("Invalid amount {s}: {e}"))
}

fn status(s: &str) -> OrderStatusType {
    s.parse::<OrderStatusType>().unwrap_or_else(|e| panic!("{e}"))
}

/// Compares each `| field | value |` row of the step's table against the serialized stats. Values with a decimal
/// point are amounts, everything else is a count.
fn check_stats<T: Serialize + Debug>(stats: &T, step: &Step) {
    let json = serde_json::to_value(stats).expect("Stats could not be serialized");
    let table = step.table.as_ref().expect("Expected a table of stats");
    for row in &table.rows {
        let (field, expected) = (row[0].as_str(), row[1].as_str());
        let expected =
            if expected.contains('.') { money(expected).value() } else { expected.parse::<i64>().expect("Bad count") };
        assert_eq!(json[field], expected, "{field} in {stats:?}");
    }
}

//------------------------------------------   Checkout   ------------------------------------------------------------

#[when(expr = "customer {int} starts a {word} order with producer {int}")]
async fn start_order(world: &mut MarketWorld, customer_id: i64, delivery: String, producer_id: i64) {
    let delivery = delivery.parse::<DeliveryType>().expect("pickup or delivery");
    world.cart = Some(NewOrder::new(customer_id, producer_id, delivery));
}

#[when(expr = "the cart contains {int} x {string}")]
async fn add_to_cart(world: &mut MarketWorld, quantity: i64, name: String) {
    let id = world.product(&name);
    let cart = world.cart_mut();
    cart.items.push(CartLine::new(id, quantity));
}

#[when(expr = "the cart contains {int} x an unknown product")]
async fn add_unknown_to_cart(world: &mut MarketWorld, quantity: i64) {
    let cart = world.cart_mut();
    cart.items.push(CartLine::new(ProductId(9_999_999), quantity));
}

#[when(expr = "the delivery address is {string}")]
async fn set_address(world: &mut MarketWorld, address: String) {
    world.cart_mut().delivery_address = Some(address);
}

#[when(expr = "the customer checks out as order {string}")]
async fn check_out(world: &mut MarketWorld, name: String) {
    let cart = world.cart.take().expect("No order has been started");
    let result = world.system().checkout.checkout(cart).await;
    if let Some(order) = world.record(result) {
        world.orders.insert(name, order.id);
    }
}

#[when(expr = "the price of {string} changes to {word}")]
async fn change_price(world: &mut MarketWorld, name: String, price: String) {
    let id = world.product(&name);
    world.system().catalog.update_price(id, money(&price)).await.expect("Error changing price");
}

//------------------------------------------  Order flow  ------------------------------------------------------------

#[when(expr = "producer {int} moves order {string} to {word}")]
async fn producer_moves_order(world: &mut MarketWorld, producer_id: i64, name: String, new_status: String) {
    let id = world.order(&name);
    let result = world.system().flow.update_status(id, status(&new_status), Some(producer_id), None).await;
    world.record(result);
}

#[when(expr = "an admin moves order {string} to {word}")]
async fn admin_moves_order(world: &mut MarketWorld, name: String, new_status: String) {
    let id = world.order(&name);
    let result = world.system().flow.update_status(id, status(&new_status), None, None).await;
    world.record(result);
}

#[when(expr = "customer {int} cancels order {string}")]
async fn customer_cancels(world: &mut MarketWorld, customer_id: i64, name: String) {
    let id = world.order(&name);
    let result = world.system().flow.cancel_order(id, customer_id).await;
    world.record(result);
}

//------------------------------------------   Payments   ------------------------------------------------------------

#[when(expr = "a {word} payment of {word} is made for order {string} as payment {string}")]
async fn make_payment(world: &mut MarketWorld, method: String, amount: String, order: String, name: String) {
    let method = method.parse::<PaymentMethod>().expect("Invalid payment method");
    let payment = NewPayment::new(world.order(&order), money(&amount), method);
    let result = world.system().payments.create_payment(payment).await;
    if let Some(payment) = world.record(result) {
        world.payments.insert(name, payment.id);
    }
}

#[when(expr = "the processor reports payment {string} as {word}")]
async fn processor_callback(world: &mut MarketWorld, name: String, new_status: String) {
    let id = world.payment(&name);
    let new_status = new_status.parse::<PaymentStatus>().expect("Invalid payment status");
    let txid = Some(format!("tx-{name}"));
    let result = world.system().payments.update_payment_status(id, new_status, txid).await;
    world.record(result);
}

#[when(expr = "payment {string} is refunded {word}")]
async fn refund(world: &mut MarketWorld, name: String, amount: String) {
    let refund = Refund::new(world.payment(&name), money(&amount)).with_reason("Customer request");
    let result = world.system().payments.refund_payment(refund).await;
    world.record(result);
}

//------------------------------------------    Checks    ------------------------------------------------------------

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut MarketWorld, expected: String) {
    let err = world.last_error.as_ref().expect("The request was expected to fail, but succeeded");
    assert_eq!(error_name(err), expected, "Unexpected error: {err}");
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut MarketWorld) {
    if let Some(e) = &world.last_error {
        panic!("The request was expected to succeed, but failed with {e}");
    }
}

#[then(expr = "order {string} is {word}")]
async fn order_status(world: &mut MarketWorld, name: String, expected: String) {
    let order = world.system().flow.fetch_order(world.order(&name)).await.unwrap().expect("Order not found");
    assert_eq!(order.status, status(&expected));
}

#[then(expr = "order {string} totals {word}")]
async fn order_total(world: &mut MarketWorld, name: String, expected: String) {
    let order = world.system().flow.fetch_order(world.order(&name)).await.unwrap().expect("Order not found");
    assert_eq!(order.total_amount, money(&expected));
    assert_eq!(order.items_total(), order.total_amount, "Line totals do not add up to the order total");
}

#[then(expr = "order {string} charges {word} each for {string}")]
async fn order_line_price(world: &mut MarketWorld, name: String, expected: String, product: String) {
    let product = world.product(&product);
    let order = world.system().flow.fetch_order(world.order(&name)).await.unwrap().expect("Order not found");
    let line = order.items.iter().find(|i| i.product_id == product).expect("Product is not on the order");
    assert_eq!(line.unit_price, money(&expected));
    assert_eq!(line.line_total, money(&expected) * line.quantity);
}

#[then(expr = "order {string} has {int} history entries")]
async fn history_len(world: &mut MarketWorld, name: String, expected: usize) {
    let order = world.system().flow.fetch_order(world.order(&name)).await.unwrap().expect("Order not found");
    assert_eq!(order.history.len(), expected, "{:#?}", order.history);
}

#[then(expr = "the latest history entry of order {string} moved from {word} to {word}")]
async fn latest_history(world: &mut MarketWorld, name: String, from: String, to: String) {
    let order = world.system().flow.fetch_order(world.order(&name)).await.unwrap().expect("Order not found");
    let entry = order.history.last().expect("No history");
    assert_eq!(entry.old_status, Some(status(&from)));
    assert_eq!(entry.new_status, status(&to));
}

#[then(expr = "the stock of {string} is {int}")]
async fn stock_level(world: &mut MarketWorld, name: String, expected: i64) {
    let level = world.system().db.stock_level(world.product(&name)).await.unwrap();
    assert_eq!(level, Some(expected));
}

#[then(expr = "customer {int} has {int} orders")]
async fn customer_order_count(world: &mut MarketWorld, customer_id: i64, expected: usize) {
    let filter = OrderQueryFilter::default().with_pagination(Pagination::new(Some(1), Some(100)));
    let orders = world.system().flow.orders_for_customer(customer_id, filter).await.unwrap();
    assert_eq!(orders.len(), expected);
}

#[then(expr = "payment {string} is {word}")]
async fn payment_status(world: &mut MarketWorld, name: String, expected: String) {
    let details = world.system().payments.fetch_payment(world.payment(&name)).await.unwrap().expect("No payment");
    let expected = expected.parse::<PaymentStatus>().expect("Invalid payment status");
    assert_eq!(details.payment.status, expected);
}

#[then(expr = "payment {string} records a refund of {word}")]
async fn payment_refund(world: &mut MarketWorld, name: String, expected: String) {
    let details = world.system().payments.fetch_payment(world.payment(&name)).await.unwrap().expect("No payment");
    assert_eq!(details.payment.refund_amount, Some(money(&expected)));
    assert_eq!(details.payment.refund_reason.as_deref(), Some("Customer request"));
}

#[then(expr = "the order stats for {word} {int} are")]
async fn order_stats(world: &mut MarketWorld, role: String, id: i64, step: &Step) {
    let owner = match role.as_str() {
        "customer" => OrderOwner::Customer(id),
        "producer" => OrderOwner::Producer(id),
        other => panic!("Unknown role {other}"),
    };
    let stats = world.system().flow.order_stats(owner).await.unwrap();
    check_stats(&stats, step);
}

#[then(expr = "the payment stats for customer {int} are")]
async fn payment_stats(world: &mut MarketWorld, customer_id: i64, step: &Step) {
    let stats = world.system().payments.payment_stats(customer_id).await.unwrap();
    check_stats(&stats, step);
}
