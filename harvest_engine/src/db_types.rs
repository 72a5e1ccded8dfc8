use chrono::{DateTime, Utc};
use harvest_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Payments must match the order total to within one minor unit.
pub const PAYMENT_TOLERANCE: Money = Money::new(1);

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------     Identifiers       ---------------------------------------------------------
macro_rules! id_type {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .trim_start_matches('#')
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| ConversionError(format!("Invalid {} '{s}': {e}", $label)))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} #{}", $label, self.0)
            }
        }
    };
}

id_type!(ProductId, "product");
id_type!(OrderId, "order");
id_type!(PaymentId, "payment");

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Producer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Producer => write!(f, "producer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "producer" => Ok(Self::Producer),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub producer_id: i64,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A product can be ordered from `producer_id` if it is listed by that producer and currently available.
    pub fn is_orderable_from(&self, producer_id: i64) -> bool {
        self.is_available && self.producer_id == producer_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub producer_id: i64,
    pub name: String,
    pub unit: String,
    pub price: Money,
    pub stock_quantity: i64,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl NewProduct {
    pub fn new<S: Into<String>>(producer_id: i64, name: S, price: Money, stock_quantity: i64) -> Self {
        Self {
            producer_id,
            name: name.into(),
            unit: "each".to_string(),
            price,
            stock_quantity,
            is_available: true,
        }
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}

/// Changes to an existing listing. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub price: Option<Money>,
    pub is_available: Option<bool>,
}

impl ProductUpdate {
    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = Some(is_available);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.is_available.is_none()
    }
}

//--------------------------------------    DeliveryType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryType::Pickup => write!(f, "pickup"),
            DeliveryType::Delivery => write!(f, "delivery"),
        }
    }
}

impl FromStr for DeliveryType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            s => Err(ConversionError(format!("Invalid delivery type: {s}"))),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// Placed, awaiting payment or producer confirmation. Inventory is reserved.
    Pending,
    /// Payment has been received or the producer has accepted the order.
    Confirmed,
    /// The producer is preparing the order.
    Preparing,
    /// Ready for pickup or out for delivery.
    Ready,
    /// Handed over to the customer.
    Completed,
    /// Cancelled. Reserved inventory has been returned to stock.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Confirmed => write!(f, "confirmed"),
            OrderStatusType::Preparing => write!(f, "preparing"),
            OrderStatusType::Ready => write!(f, "ready"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  TransitionTrigger  ---------------------------------------------------------
/// What caused an order status change. Recorded with every entry in the order's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// The customer placed the order. Only ever used for the first history entry.
    Checkout,
    /// The producer (or an admin) moved the order along.
    ProducerUpdate,
    /// The customer withdrew the order.
    CustomerCancel,
    /// A payment for the order completed.
    PaymentSettled,
    /// The order's payment was refunded in full.
    FullRefund,
}

impl Display for TransitionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransitionTrigger::Checkout => "checkout",
            TransitionTrigger::ProducerUpdate => "producer update",
            TransitionTrigger::CustomerCancel => "customer cancellation",
            TransitionTrigger::PaymentSettled => "payment settlement",
            TransitionTrigger::FullRefund => "full refund",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------       CartLine      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
/// A checkout request: a customer's cart for a single producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub producer_id: i64,
    pub items: Vec<CartLine>,
    pub delivery_type: DeliveryType,
    /// Required when `delivery_type` is `Delivery`.
    #[serde(default)]
    pub delivery_address: Option<String>,
    /// Free-text instructions from the customer.
    #[serde(default)]
    pub notes: Option<String>,
    /// Where order and payment notifications are sent.
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl NewOrder {
    pub fn new(customer_id: i64, producer_id: i64, delivery_type: DeliveryType) -> Self {
        Self {
            customer_id,
            producer_id,
            items: Vec::new(),
            delivery_type,
            delivery_address: None,
            notes: None,
            contact_email: None,
        }
    }

    pub fn with_item(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.push(CartLine::new(product_id, quantity));
        self
    }

    pub fn deliver_to<S: Into<String>>(mut self, address: S) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_contact_email<S: Into<String>>(mut self, email: S) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// The delivery address, if one was given and is not blank.
    pub fn address(&self) -> Option<&str> {
        self.delivery_address.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A line of a placed order. `unit_price` is the product price at checkout and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

//--------------------------------------     StatusChange    ---------------------------------------------------------
/// An entry in an order's append-only status history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub order_id: OrderId,
    /// `None` for the entry written at checkout.
    pub old_status: Option<OrderStatusType>,
    pub new_status: OrderStatusType,
    pub triggered_by: TransitionTrigger,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: i64,
    pub producer_id: i64,
    pub total_amount: Money,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub contact_email: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[sqlx(skip)]
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Order {
    /// Sum of the line totals. Equal to `total_amount` for every order written by checkout.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|i| i.line_total).sum()
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Stripe,
    Paypal,
    Cash,
    BankTransfer,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Stripe => write!(f, "stripe"),
            PaymentMethod::Paypal => write!(f, "paypal"),
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::BankTransfer => write!(f, "bank_transfer"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            "cash" => Ok(Self::Cash),
            "bank_transfer" => Ok(Self::BankTransfer),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    /// The processor's reference for this payment, if it has reported one.
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub refund_amount: Option<Money>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewPayment     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl NewPayment {
    pub fn new(order_id: OrderId, amount: Money, payment_method: PaymentMethod) -> Self {
        Self { order_id, amount, payment_method, transaction_id: None }
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, transaction_id: S) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}
