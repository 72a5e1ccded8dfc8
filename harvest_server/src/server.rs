use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use harvest_engine::{
    events::{EventHandlers, EventProducers},
    CatalogApi,
    CheckoutApi,
    OrderFlowApi,
    PaymentApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    notifications::{notification_hooks, Notifier},
    routes::{
        health,
        AddProductRoute,
        CancelOrderRoute,
        CheckoutRoute,
        CreatePaymentRoute,
        MyOrdersRoute,
        MyPaymentStatsRoute,
        MyPaymentsRoute,
        OrderByIdRoute,
        OrderPaymentsRoute,
        OrderStatsRoute,
        PaymentByIdRoute,
        ProducerProductsRoute,
        ProductByIdRoute,
        RefundPaymentRoute,
        UpdateOrderStatusRoute,
        UpdatePaymentStatusRoute,
        UpdateProductRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let producers = start_notification_handlers(&config).await?;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Starts the event handlers that email customers, and returns the producers that feed them.
async fn start_notification_handlers(config: &ServerConfig) -> Result<EventProducers, ServerError> {
    let notifier = Notifier::new(config.email.as_ref())
        .map_err(|e| ServerError::ConfigurationError(format!("Could not set up email notifications. {e}")))?;
    let handlers = EventHandlers::new(config.event_buffer_size, notification_hooks(notifier));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    info!("📬️ Notification handlers started");
    Ok(producers)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentApi::new(db.clone(), producers.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderStatsRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(OrderPaymentsRoute::<SqliteDatabase>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(MyPaymentsRoute::<SqliteDatabase>::new())
            .service(MyPaymentStatsRoute::<SqliteDatabase>::new())
            .service(PaymentByIdRoute::<SqliteDatabase>::new())
            .service(UpdatePaymentStatusRoute::<SqliteDatabase>::new())
            .service(RefundPaymentRoute::<SqliteDatabase>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(ProducerProductsRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %r").log_target("hh::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::JsonConfig::default().error_handler(|e, _req| {
                ServerError::InvalidRequestBody(e.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|e, _req| {
                ServerError::InvalidRequestPath(e.to_string()).into()
            }))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
