use chrono::{TimeZone, Utc};
use harvest_common::Money;
use harvest_engine::{
    db_types::{
        DeliveryType,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payment,
        PaymentId,
        PaymentMethod,
        PaymentStatus,
        Product,
        ProductId,
    },
    payment_objects::PaymentDetails,
};

pub const CUSTOMER: i64 = 7;
pub const PRODUCER: i64 = 1;

pub fn apples() -> Product {
    Product {
        id: ProductId(11),
        producer_id: PRODUCER,
        name: "Apples".to_string(),
        unit: "kg".to_string(),
        price: Money::from(250),
        stock_quantity: 10,
        is_available: true,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    }
}

/// Order #3: two kilos of apples for customer 7 from producer 1.
pub fn order(status: OrderStatusType) -> Order {
    Order {
        id: OrderId(3),
        customer_id: CUSTOMER,
        producer_id: PRODUCER,
        total_amount: Money::from(500),
        delivery_type: DeliveryType::Pickup,
        delivery_address: None,
        notes: None,
        contact_email: None,
        status,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
        items: vec![OrderItem {
            id: 1,
            order_id: OrderId(3),
            product_id: ProductId(11),
            quantity: 2,
            unit_price: Money::from(250),
            line_total: Money::from(500),
        }],
        history: vec![],
    }
}

pub fn payment(status: PaymentStatus) -> Payment {
    Payment {
        id: PaymentId(5),
        order_id: OrderId(3),
        amount: Money::from(500),
        payment_method: PaymentMethod::Stripe,
        transaction_id: None,
        status,
        refund_amount: None,
        refund_reason: None,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 35, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 35, 0).unwrap(),
    }
}

pub fn payment_details(status: PaymentStatus) -> PaymentDetails {
    PaymentDetails {
        payment: payment(status),
        order_total: Money::from(500),
        order_status: OrderStatusType::Pending,
        customer_id: CUSTOMER,
        producer_id: PRODUCER,
    }
}
