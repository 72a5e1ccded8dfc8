use cucumber::given;
use harvest_common::Money;
use harvest_engine::db_types::NewProduct;

use crate::cucumber::{market_world::MarketSystem, MarketWorld};

#[given("a fresh marketplace")]
async fn fresh_database(world: &mut MarketWorld) {
    let system = MarketSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "producer {int} lists {string} at {word} with {int} in stock")]
async fn list_product(world: &mut MarketWorld, producer_id: i64, name: String, price: String, stock: i64) {
    let price = price.parse::<Money>().expect("Invalid price");
    let product = NewProduct::new(producer_id, name.as_str(), price, stock);
    let product = world.system().catalog.add_product(product).await.expect("Error listing product");
    world.products.insert(name, product.id);
}

#[given(expr = "{string} is unavailable")]
async fn delist_product(world: &mut MarketWorld, name: String) {
    let id = world.product(&name);
    world.system().catalog.set_availability(id, false).await.expect("Error delisting product");
}
