use harvest_engine::{
    db_types::{
        NewOrder,
        NewPayment,
        NewProduct,
        Order,
        OrderId,
        Payment,
        PaymentId,
        PaymentStatus,
        Product,
        ProductId,
        ProductUpdate,
    },
    order_objects::{OrderChanged, OrderOwner, OrderQueryFilter, OrderStats, StatusUpdate},
    payment_objects::{PaymentDetails, PaymentQueryFilter, PaymentStats, PaymentUpdate, Refund, RefundResult},
    CatalogManagement,
    InventoryLedger,
    MarketError,
    OrderManagement,
    PaymentManagement,
};
use mockall::mock;

mock! {
    pub MarketBackend {}
    impl CatalogManagement for MarketBackend {
        async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketError>;
        async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, MarketError>;
        async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, MarketError>;
        async fn fetch_products_for_producer(&self, producer_id: i64) -> Result<Vec<Product>, MarketError>;
        async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, MarketError>;
    }
    impl InventoryLedger for MarketBackend {
        async fn reserve(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError>;
        async fn release(&self, product_id: ProductId, quantity: i64) -> Result<(), MarketError>;
        async fn stock_level(&self, product_id: ProductId) -> Result<Option<i64>, MarketError>;
    }
    impl OrderManagement for MarketBackend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketError>;
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, MarketError>;
        async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketError>;
        async fn fetch_order_stats(&self, owner: OrderOwner) -> Result<OrderStats, MarketError>;
        async fn update_order_status(&self, update: StatusUpdate) -> Result<OrderChanged, MarketError>;
    }
    impl PaymentManagement for MarketBackend {
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketError>;
        async fn fetch_payment(&self, id: PaymentId) -> Result<Option<PaymentDetails>, MarketError>;
        async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<PaymentDetails>, MarketError>;
        async fn fetch_payment_stats(&self, customer_id: i64) -> Result<PaymentStats, MarketError>;
        async fn update_payment_status(&self, id: PaymentId, status: PaymentStatus, transaction_id: Option<String>) -> Result<PaymentUpdate, MarketError>;
        async fn refund_payment(&self, refund: Refund) -> Result<RefundResult, MarketError>;
    }
}
