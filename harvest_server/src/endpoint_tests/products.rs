use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use harvest_common::Money;
use harvest_engine::{db_types::Role, CatalogApi};

use super::{
    fixtures::{apples, PRODUCER},
    helpers::{as_principal, send},
    mocks::MockMarketBackend,
};
use crate::routes::{AddProductRoute, ProducerProductsRoute, ProductByIdRoute, UpdateProductRoute};

fn configure(backend: MockMarketBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(AddProductRoute::<MockMarketBackend>::new())
            .service(ProductByIdRoute::<MockMarketBackend>::new())
            .service(UpdateProductRoute::<MockMarketBackend>::new())
            .service(ProducerProductsRoute::<MockMarketBackend>::new())
            .app_data(web::Data::new(CatalogApi::new(backend)));
    }
}

fn json_request(req: TestRequest, body: &str) -> TestRequest {
    req.insert_header(("content-type", "application/json")).set_payload(body.to_string())
}

#[actix_web::test]
async fn producer_lists_a_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_insert_product()
        .withf(|p| p.producer_id == PRODUCER && p.name == "Apples" && p.unit == "kg" && p.is_available)
        .times(1)
        .returning(|_| Ok(apples()));
    let req = json_request(
        TestRequest::post().uri("/products"),
        r#"{"name": "Apples", "unit": "kg", "price": 250, "stock_quantity": 10}"#,
    );
    let (status, body) = send(as_principal(req, PRODUCER, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""price":250"#), "{body}");
}

#[actix_web::test]
async fn products_need_a_positive_price() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_insert_product().never();
    let req = json_request(TestRequest::post().uri("/products"), r#"{"name": "Apples", "price": 0, "stock_quantity": 10}"#);
    let (status, _) = send(as_principal(req, PRODUCER, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_cannot_list_products() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_insert_product().never();
    let req = json_request(TestRequest::post().uri("/products"), r#"{"name": "Apples", "price": 250, "stock_quantity": 10}"#);
    let (status, _) = send(as_principal(req, 7, Role::Customer), configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn anyone_can_browse_products() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    let (status, body) = send(TestRequest::get().uri("/products/11"), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""name":"Apples""#), "{body}");

    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_products_for_producer().withf(|id| *id == PRODUCER).returning(|_| Ok(vec![apples()]));
    let (status, body) = send(TestRequest::get().uri("/producers/1/products"), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Vec<serde_json::Value>>(&body).unwrap().len(), 1);
}

#[actix_web::test]
async fn unknown_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(None));
    let (status, body) = send(TestRequest::get().uri("/products/404"), configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"product #404 does not exist"}"#);
}

#[actix_web::test]
async fn producer_updates_own_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    backend
        .expect_update_product()
        .withf(|_, update| update.price == Some(Money::from(300)) && update.is_available.is_none())
        .times(1)
        .returning(|_, update| {
            let mut product = apples();
            product.price = update.price.unwrap();
            Ok(product)
        });
    let req = json_request(TestRequest::patch().uri("/products/11"), r#"{"price": 300}"#);
    let (status, body) = send(as_principal(req, PRODUCER, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""price":300"#), "{body}");
}

#[actix_web::test]
async fn producer_cannot_update_another_producers_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    backend.expect_update_product().never();
    let req = json_request(TestRequest::patch().uri("/products/11"), r#"{"is_available": false}"#);
    let (status, _) = send(as_principal(req, 2, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_can_delist_any_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    backend.expect_update_product().withf(|_, update| update.is_available == Some(false)).times(1).returning(|_, _| {
        let mut product = apples();
        product.is_available = false;
        Ok(product)
    });
    let req = json_request(TestRequest::patch().uri("/products/11"), r#"{"is_available": false}"#);
    let (status, body) = send(as_principal(req, 1000, Role::Admin), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""is_available":false"#), "{body}");
}

#[actix_web::test]
async fn price_and_availability_change_in_one_write() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    backend
        .expect_update_product()
        .withf(|_, update| update.price == Some(Money::from(320)) && update.is_available == Some(false))
        .times(1)
        .returning(|_, _| {
            let mut product = apples();
            product.price = Money::from(320);
            product.is_available = false;
            Ok(product)
        });
    let req = json_request(TestRequest::patch().uri("/products/11"), r#"{"price": 320, "is_available": false}"#);
    let (status, body) = send(as_principal(req, PRODUCER, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""price":320"#), "{body}");
    assert!(body.contains(r#""is_available":false"#), "{body}");
}

#[actix_web::test]
async fn invalid_price_leaves_availability_alone() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(Some(apples())));
    backend.expect_update_product().never();
    let req = json_request(TestRequest::patch().uri("/products/11"), r#"{"price": 0, "is_available": false}"#);
    let (status, _) = send(as_principal(req, PRODUCER, Role::Producer), configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
