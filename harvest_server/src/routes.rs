//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here is async and only awaits database futures, so
//! workers carry on with other requests while a query runs.
//!
//! Amounts in request and response bodies are integers in minor currency units (cents).
use actix_web::{get, web, HttpResponse, Responder};
use harvest_engine::{
    db_types::{OrderId, PaymentId, ProductId, ProductUpdate, Role},
    order_objects::OrderOwner,
    payment_objects::Refund,
    CatalogApi,
    CatalogManagement,
    CheckoutApi,
    InventoryLedger,
    MarketError,
    OrderFlowApi,
    OrderManagement,
    PaymentApi,
    PaymentManagement,
};
use log::*;

use crate::{
    data_objects::{
        CheckoutRequest,
        OrderListParams,
        PageParams,
        PaymentRequest,
        PaymentStatusRequest,
        ProductRequest,
        ProductUpdateRequest,
        RefundRequest,
        StatusUpdateRequest,
    },
    errors::ServerError,
    principal::Principal,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CatalogManagement, OrderManagement where requires [Role::Customer]);
/// Route handler for the checkout endpoint
///
/// Places an order for the calling customer. The cart must only contain products from `producer_id`. Stock for every
/// line is reserved and prices are frozen at the current list price. Returns the new `pending` order.
pub async fn checkout<B>(
    principal: Principal,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + OrderManagement,
{
    let order = body.into_inner().into_new_order(principal.id);
    debug!("💻️ POST checkout for customer {} with producer {}", order.customer_id, order.producer_id);
    let order = api.checkout(order).await?;
    Ok(HttpResponse::Created().json(order))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement where requires [Role::Customer, Role::Producer, Role::Admin]);
/// Route handler for the orders endpoint
///
/// Customers see the orders they placed and producers the orders placed with them, newest first. Results can be
/// filtered by `status` and paged with `page` and `limit`. Admins see every order and may filter by `customer_id` or
/// `producer_id`.
pub async fn my_orders<B: OrderManagement>(
    principal: Principal,
    query: web::Query<OrderListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = query.into_inner();
    let filter = params.base_filter();
    debug!("💻️ GET orders for {} {} [{filter}]", principal.role, principal.id);
    let orders = match principal.role {
        Role::Customer => api.orders_for_customer(principal.id, filter).await?,
        Role::Producer => api.orders_for_producer(principal.id, filter).await?,
        Role::Admin => {
            let mut filter = filter;
            if let Some(id) = params.customer_id {
                filter = filter.with_customer_id(id);
            }
            if let Some(id) = params.producer_id {
                filter = filter.with_producer_id(id);
            }
            api.search_orders(filter).await?
        },
    };
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_stats => Get "/orders/stats" impl OrderManagement where requires [Role::Customer, Role::Producer]);
/// Order counts and value for the caller: what a customer has spent, or what a producer has taken.
pub async fn order_stats<B: OrderManagement>(
    principal: Principal,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET order stats for {} {}", principal.role, principal.id);
    let owner = match principal.role {
        Role::Customer => OrderOwner::Customer(principal.id),
        _ => OrderOwner::Producer(principal.id),
    };
    let stats = api.order_stats(owner).await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement where requires [Role::Customer, Role::Producer, Role::Admin]);
/// Fetches an order with its items and status history. Orders the caller is not party to are reported as not found.
pub async fn order_by_id<B: OrderManagement>(
    principal: Principal,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId(path.into_inner());
    debug!("💻️ GET {id} for {} {}", principal.role, principal.id);
    let order = visible_order(&principal, id, api.as_ref()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderManagement where requires [Role::Producer, Role::Admin]);
/// Route handler for producer status updates
///
/// Moves the order forward along `pending → confirmed → preparing → ready → completed`, or cancels a `pending`
/// order. Producers may only update their own orders. Admins may update any order.
pub async fn update_order_status<B: OrderManagement>(
    principal: Principal,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId(path.into_inner());
    let StatusUpdateRequest { status, note } = body.into_inner();
    debug!("💻️ PATCH {id} status to {status} by {} {}", principal.role, principal.id);
    let order = api.update_status(id, status, principal.producer_scope(), note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Patch "/orders/{id}/cancel" impl OrderManagement where requires [Role::Customer]);
/// Cancels one of the caller's orders while it is still `pending`, returning its stock to inventory.
pub async fn cancel_order<B: OrderManagement>(
    principal: Principal,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId(path.into_inner());
    debug!("💻️ PATCH cancel {id} by customer {}", principal.id);
    let order = api.cancel_order(id, principal.id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_payments => Get "/orders/{id}/payments" impl OrderManagement, PaymentManagement where requires [Role::Customer, Role::Producer, Role::Admin]);
pub async fn order_payments<B>(
    principal: Principal,
    path: web::Path<i64>,
    orders_api: web::Data<OrderFlowApi<B>>,
    payments_api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    let id = OrderId(path.into_inner());
    debug!("💻️ GET payments for {id}");
    visible_order(&principal, id, orders_api.as_ref()).await?;
    let payments = payments_api.payments_for_order(id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

async fn visible_order<B: OrderManagement>(
    principal: &Principal,
    id: OrderId,
    api: &OrderFlowApi<B>,
) -> Result<harvest_engine::db_types::Order, ServerError> {
    match api.fetch_order(id).await? {
        Some(order) if principal.can_see(&order) => Ok(order),
        Some(_) => {
            debug!("💻️ {} {} asked for {id}, which is not theirs", principal.role, principal.id);
            Err(MarketError::OrderNotFound(id).into())
        },
        None => Err(MarketError::OrderNotFound(id).into()),
    }
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment => Post "/payments" impl OrderManagement, PaymentManagement where requires [Role::Customer, Role::Admin]);
/// Route handler for new payments
///
/// Records a `pending` payment against an order. The amount must match the order total. Customers may only pay for
/// their own orders.
pub async fn create_payment<B>(
    principal: Principal,
    body: web::Json<PaymentRequest>,
    orders_api: web::Data<OrderFlowApi<B>>,
    payments_api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    let req = body.into_inner();
    debug!("💻️ POST payment of {} for {}", req.amount, req.order_id);
    visible_order(&principal, req.order_id, orders_api.as_ref()).await?;
    let payment = payments_api.create_payment(req.into()).await?;
    Ok(HttpResponse::Created().json(payment))
}

route!(update_payment_status => Patch "/payments/{id}/status" impl PaymentManagement where requires [Role::Admin]);
/// Route handler for payment processor callbacks
///
/// Completing a payment confirms its order. Reporting the same status twice is harmless.
pub async fn update_payment_status<B: PaymentManagement>(
    path: web::Path<i64>,
    body: web::Json<PaymentStatusRequest>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = PaymentId(path.into_inner());
    let PaymentStatusRequest { status, transaction_id } = body.into_inner();
    debug!("💻️ PATCH {id} status to {status}");
    let update = api.update_payment_status(id, status, transaction_id).await?;
    Ok(HttpResponse::Ok().json(update.payment))
}

route!(refund_payment => Post "/payments/{id}/refund" impl PaymentManagement where requires [Role::Admin]);
/// Refunds a completed payment. A full refund also cancels the order and returns its stock, unless the order is
/// already completed.
pub async fn refund_payment<B: PaymentManagement>(
    path: web::Path<i64>,
    body: web::Json<RefundRequest>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = PaymentId(path.into_inner());
    let RefundRequest { amount, reason } = body.into_inner();
    debug!("💻️ POST refund of {amount} for {id}");
    let mut refund = Refund::new(id, amount);
    if let Some(reason) = reason {
        refund = refund.with_reason(reason);
    }
    let result = api.refund_payment(refund).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(my_payment_stats => Get "/payments/stats" impl PaymentManagement where requires [Role::Customer]);
pub async fn my_payment_stats<B: PaymentManagement>(
    principal: Principal,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET payment stats for customer {}", principal.id);
    let stats = api.payment_stats(principal.id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(payment_by_id => Get "/payments/{id}" impl PaymentManagement where requires [Role::Customer, Role::Producer, Role::Admin]);
pub async fn payment_by_id<B: PaymentManagement>(
    principal: Principal,
    path: web::Path<i64>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = PaymentId(path.into_inner());
    debug!("💻️ GET {id}");
    let details = api.fetch_payment(id).await?.ok_or(MarketError::PaymentNotFound(id))?;
    let visible = match principal.role {
        Role::Admin => true,
        Role::Customer => details.customer_id == principal.id,
        Role::Producer => details.producer_id == principal.id,
    };
    if !visible {
        return Err(MarketError::PaymentNotFound(id).into());
    }
    Ok(HttpResponse::Ok().json(details))
}

route!(my_payments => Get "/payments" impl PaymentManagement where requires [Role::Customer]);
/// The caller's payments across all their orders, newest first.
pub async fn my_payments<B: PaymentManagement>(
    principal: Principal,
    query: web::Query<PageParams>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET payments for customer {}", principal.id);
    let payments = api.payments_for_customer(principal.id, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(add_product => Post "/products" impl CatalogManagement, InventoryLedger where requires [Role::Producer]);
/// Lists a new product for the calling producer.
pub async fn add_product<B>(
    principal: Principal,
    body: web::Json<ProductRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryLedger,
{
    let product = body.into_inner().into_new_product(principal.id);
    debug!("💻️ POST product {} for producer {}", product.name, principal.id);
    let product = api.add_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement, InventoryLedger);
pub async fn product_by_id<B>(path: web::Path<i64>, api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError>
where B: CatalogManagement + InventoryLedger {
    let id = ProductId(path.into_inner());
    debug!("💻️ GET {id}");
    let product = api.fetch_product(id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(producer_products => Get "/producers/{id}/products" impl CatalogManagement, InventoryLedger);
pub async fn producer_products<B>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryLedger,
{
    let producer_id = path.into_inner();
    debug!("💻️ GET products for producer {producer_id}");
    let products = api.products_for_producer(producer_id).await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(update_product => Patch "/products/{id}" impl CatalogManagement, InventoryLedger where requires [Role::Producer, Role::Admin]);
/// Changes the price and/or availability of a product. Producers may only change their own listings.
pub async fn update_product<B>(
    principal: Principal,
    path: web::Path<i64>,
    body: web::Json<ProductUpdateRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogManagement + InventoryLedger,
{
    let id = ProductId(path.into_inner());
    let update = ProductUpdate::from(body.into_inner());
    debug!("💻️ PATCH {id} by {} {}", principal.role, principal.id);
    let product = api.fetch_product(id).await?;
    if !principal.is_admin() && product.producer_id != principal.id {
        return Err(ServerError::InsufficientPermissions(format!("{id} belongs to another producer")));
    }
    let product = api.update_listing(id, update).await?;
    Ok(HttpResponse::Ok().json(product))
}
