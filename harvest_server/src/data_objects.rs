use harvest_common::Money;
use harvest_engine::{
    db_types::{
        CartLine,
        DeliveryType,
        NewOrder,
        NewPayment,
        NewProduct,
        OrderId,
        OrderStatusType,
        PaymentMethod,
        PaymentStatus,
        ProductUpdate,
    },
    order_objects::{OrderQueryFilter, Pagination},
};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/checkout`. The customer is the calling principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub producer_id: i64,
    pub items: Vec<CartLine>,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl CheckoutRequest {
    pub fn into_new_order(self, customer_id: i64) -> NewOrder {
        NewOrder {
            customer_id,
            producer_id: self.producer_id,
            items: self.items,
            delivery_type: self.delivery_type,
            delivery_address: self.delivery_address,
            notes: self.notes,
            contact_email: self.contact_email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
    #[serde(default, alias = "notes")]
    pub note: Option<String>,
}

/// Query parameters for `GET /api/orders`.
///
/// Customers and producers always see their own orders. Admins may narrow the search with `customer_id` or
/// `producer_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatusType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub customer_id: Option<i64>,
    pub producer_id: Option<i64>,
}

impl OrderListParams {
    /// The filter without any customer or producer restriction.
    pub fn base_filter(&self) -> OrderQueryFilter {
        let mut filter = OrderQueryFilter::default().with_pagination(Pagination::new(self.page, self.limit));
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        filter
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        Pagination::new(params.page, params.limit)
    }
}

/// Body of `POST /api/payments`. Amounts are in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl From<PaymentRequest> for NewPayment {
    fn from(req: PaymentRequest) -> Self {
        let payment = NewPayment::new(req.order_id, req.amount, req.payment_method);
        match req.transaction_id {
            Some(txid) => payment.with_transaction_id(txid),
            None => payment,
        }
    }
}

/// A status report from the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: PaymentStatus,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    #[serde(alias = "refund_amount")]
    pub amount: Money,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /api/products`. The producer is the calling principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub price: Money,
    pub stock_quantity: i64,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl ProductRequest {
    pub fn into_new_product(self, producer_id: i64) -> NewProduct {
        let mut product = NewProduct::new(producer_id, self.name, self.price, self.stock_quantity);
        if let Some(unit) = self.unit {
            product = product.with_unit(unit);
        }
        product.is_available = self.is_available;
        product
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdateRequest {
    pub price: Option<Money>,
    pub is_available: Option<bool>,
}

impl From<ProductUpdateRequest> for ProductUpdate {
    fn from(value: ProductUpdateRequest) -> Self {
        ProductUpdate { price: value.price, is_available: value.is_available }
    }
}
