use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use harvest_common::Money;
use harvest_engine::{
    db_types::{OrderStatusType, PaymentId, PaymentMethod, PaymentStatus, Role},
    events::EventProducers,
    order_objects::OrderChanged,
    payment_objects::{PaymentStats, PaymentUpdate, RefundResult},
    MarketError,
    OrderFlowApi,
    PaymentApi,
};

use super::{
    fixtures::{order, payment, payment_details, CUSTOMER, PRODUCER},
    helpers::{as_principal, send},
    mocks::MockMarketBackend,
};
use crate::routes::{
    CreatePaymentRoute,
    MyPaymentStatsRoute,
    MyPaymentsRoute,
    OrderPaymentsRoute,
    PaymentByIdRoute,
    RefundPaymentRoute,
    UpdatePaymentStatusRoute,
};

/// `orders` backs the order lookups, `payments` everything else.
fn configure(orders: MockMarketBackend, payments: MockMarketBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let orders_api = OrderFlowApi::new(orders, EventProducers::default());
        let payments_api = PaymentApi::new(payments, EventProducers::default());
        cfg.service(CreatePaymentRoute::<MockMarketBackend>::new())
            .service(MyPaymentsRoute::<MockMarketBackend>::new())
            .service(MyPaymentStatsRoute::<MockMarketBackend>::new())
            .service(PaymentByIdRoute::<MockMarketBackend>::new())
            .service(UpdatePaymentStatusRoute::<MockMarketBackend>::new())
            .service(RefundPaymentRoute::<MockMarketBackend>::new())
            .service(OrderPaymentsRoute::<MockMarketBackend>::new())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api));
    }
}

fn json_request(req: TestRequest, body: &str) -> TestRequest {
    req.insert_header(("content-type", "application/json")).set_payload(body.to_string())
}

fn order_lookup(status: OrderStatusType) -> MockMarketBackend {
    let mut orders = MockMarketBackend::new();
    orders.expect_fetch_order().returning(move |_| Ok(Some(order(status))));
    orders
}

#[actix_web::test]
async fn customer_pays_for_own_order() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_insert_payment()
        .withf(|p| p.amount == Money::from(500) && p.payment_method == PaymentMethod::Stripe)
        .times(1)
        .returning(|_| Ok(payment(PaymentStatus::Pending)));
    let req = json_request(TestRequest::post().uri("/payments"), r#"{"order_id": 3, "amount": 500, "payment_method": "stripe"}"#);
    let (status, body) =
        send(as_principal(req, CUSTOMER, Role::Customer), configure(order_lookup(OrderStatusType::Pending), payments))
            .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""status":"pending""#), "{body}");
}

#[actix_web::test]
async fn paying_for_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_insert_payment().never();
    let req = json_request(TestRequest::post().uri("/payments"), r#"{"order_id": 3, "amount": 500, "payment_method": "cash"}"#);
    let (status, _) =
        send(as_principal(req, 99, Role::Customer), configure(order_lookup(OrderStatusType::Pending), payments)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn payment_amount_must_match_total() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_insert_payment().returning(|p| {
        Err(MarketError::AmountMismatch { expected: Money::from(500), received: p.amount })
    });
    let req = json_request(TestRequest::post().uri("/payments"), r#"{"order_id": 3, "amount": 400, "payment_method": "paypal"}"#);
    let (status, body) =
        send(as_principal(req, CUSTOMER, Role::Customer), configure(order_lookup(OrderStatusType::Pending), payments))
            .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Payment amount $4.00 does not match the order total of $5.00"}"#);
}

#[actix_web::test]
async fn only_admins_report_payment_status() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_update_payment_status().never();
    let req = json_request(TestRequest::patch().uri("/payments/5/status"), r#"{"status": "completed"}"#);
    let (status, _) =
        send(as_principal(req, CUSTOMER, Role::Customer), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn completing_a_payment() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_update_payment_status()
        .withf(|id, status, txid| {
            *id == PaymentId(5) && *status == PaymentStatus::Completed && txid.as_deref() == Some("ch_123")
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(PaymentUpdate {
                old_status: PaymentStatus::Pending,
                payment: payment(PaymentStatus::Completed),
                order: Some(OrderChanged::new(OrderStatusType::Pending, order(OrderStatusType::Confirmed))),
            })
        });
    let req = json_request(
        TestRequest::patch().uri("/payments/5/status"),
        r#"{"status": "completed", "transaction_id": "ch_123"}"#,
    );
    let (status, body) = send(as_principal(req, 1000, Role::Admin), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::OK);
    let json = serde_json::from_str::<serde_json::Value>(&body).unwrap();
    assert_eq!(json["id"], 5);
    assert_eq!(json["status"], "completed");
}

#[actix_web::test]
async fn failed_payment_cannot_complete() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_update_payment_status().returning(|_, status, _| {
        Err(MarketError::InvalidPaymentTransition { from: PaymentStatus::Failed, to: status })
    });
    let req = json_request(TestRequest::patch().uri("/payments/5/status"), r#"{"status": "completed"}"#);
    let (status, _) = send(as_principal(req, 1000, Role::Admin), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn full_refund() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_refund_payment()
        .withf(|r| r.payment_id == PaymentId(5) && r.amount == Money::from(500) && r.reason.as_deref() == Some("Bruised"))
        .times(1)
        .returning(|r| {
            let mut refunded = payment(PaymentStatus::Refunded);
            refunded.refund_amount = Some(r.amount);
            refunded.refund_reason = r.reason.clone();
            Ok(RefundResult {
                payment: refunded,
                order: OrderChanged::new(OrderStatusType::Confirmed, order(OrderStatusType::Cancelled)),
                full_refund: true,
            })
        });
    let req = json_request(TestRequest::post().uri("/payments/5/refund"), r#"{"amount": 500, "reason": "Bruised"}"#);
    let (status, body) = send(as_principal(req, 1000, Role::Admin), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::OK);
    let json = serde_json::from_str::<serde_json::Value>(&body).unwrap();
    assert_eq!(json["full_refund"], true);
    assert_eq!(json["payment"]["refund_amount"], 500);
    assert_eq!(json["order"]["order"]["status"], "cancelled");
}

#[actix_web::test]
async fn refund_larger_than_payment() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_refund_payment()
        .returning(|r| Err(MarketError::RefundExceedsPayment { refund: r.amount, paid: Money::from(500) }));
    let req = json_request(TestRequest::post().uri("/payments/5/refund"), r#"{"amount": 600}"#);
    let (status, body) = send(as_principal(req, 1000, Role::Admin), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Refund of $6.00 exceeds the payment amount of $5.00"}"#);
}

#[actix_web::test]
async fn zero_refund_never_reaches_the_backend() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_refund_payment().never();
    let req = json_request(TestRequest::post().uri("/payments/5/refund"), r#"{"amount": 0}"#);
    let (status, _) = send(as_principal(req, 1000, Role::Admin), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn payment_visibility() {
    let _ = env_logger::try_init().ok();
    let cases = [
        (CUSTOMER, Role::Customer, StatusCode::OK),
        (99, Role::Customer, StatusCode::NOT_FOUND),
        (PRODUCER, Role::Producer, StatusCode::OK),
        (2, Role::Producer, StatusCode::NOT_FOUND),
        (1000, Role::Admin, StatusCode::OK),
    ];
    for (id, role, expected) in cases {
        let mut payments = MockMarketBackend::new();
        payments.expect_fetch_payment().returning(|_| Ok(Some(payment_details(PaymentStatus::Completed))));
        let req = as_principal(TestRequest::get().uri("/payments/5"), id, role);
        let (status, body) = send(req, configure(MockMarketBackend::new(), payments)).await;
        assert_eq!(status, expected, "{role} {id}: {body}");
    }
}

#[actix_web::test]
async fn my_payments_are_scoped_to_caller() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_fetch_payments()
        .withf(|f| f.customer_id == Some(CUSTOMER) && f.order_id.is_none())
        .times(1)
        .returning(|_| Ok(vec![payment_details(PaymentStatus::Pending)]));
    let req = as_principal(TestRequest::get().uri("/payments?page=1&limit=10"), CUSTOMER, Role::Customer);
    let (status, body) = send(req, configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""customer_id":7"#), "{body}");
}

#[actix_web::test]
async fn payments_for_an_order() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments
        .expect_fetch_payments()
        .withf(|f| f.order_id == Some(order(OrderStatusType::Pending).id))
        .times(1)
        .returning(|_| Ok(vec![payment_details(PaymentStatus::Failed), payment_details(PaymentStatus::Completed)]));
    let req = as_principal(TestRequest::get().uri("/orders/3/payments"), PRODUCER, Role::Producer);
    let (status, body) = send(req, configure(order_lookup(OrderStatusType::Confirmed), payments)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Vec<serde_json::Value>>(&body).unwrap().len(), 2);
}

#[actix_web::test]
async fn zero_payment_never_reaches_the_backend() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_insert_payment().never();
    let req = json_request(TestRequest::post().uri("/payments"), r#"{"order_id": 3, "amount": 0, "payment_method": "cash"}"#);
    let (status, body) =
        send(as_principal(req, CUSTOMER, Role::Customer), configure(order_lookup(OrderStatusType::Pending), payments))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payment amount must be positive"), "{body}");
}

#[actix_web::test]
async fn customer_payment_stats() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_fetch_payment().never();
    payments.expect_fetch_payment_stats().withf(|id| *id == CUSTOMER).times(1).returning(|_| {
        Ok(PaymentStats {
            total_payments: 3,
            successful_payments: 1,
            failed_payments: 1,
            refunded_payments: 1,
            total_paid: Money::from(500),
            average_payment: Money::from(500),
            total_refunded: Money::from(200),
            ..Default::default()
        })
    });
    let req = TestRequest::get().uri("/payments/stats");
    let (status, body) =
        send(as_principal(req, CUSTOMER, Role::Customer), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::OK);
    let json = serde_json::from_str::<serde_json::Value>(&body).unwrap();
    assert_eq!(json["total_payments"], 3);
    assert_eq!(json["pending_payments"], 0);
    assert_eq!(json["total_paid"], 500);
    assert_eq!(json["total_refunded"], 200);
}

#[actix_web::test]
async fn producers_have_no_payment_stats() {
    let _ = env_logger::try_init().ok();
    let mut payments = MockMarketBackend::new();
    payments.expect_fetch_payment_stats().never();
    let req = TestRequest::get().uri("/payments/stats");
    let (status, _) =
        send(as_principal(req, PRODUCER, Role::Producer), configure(MockMarketBackend::new(), payments)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
