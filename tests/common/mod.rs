//! Shared fixtures for integration tests.

use std::sync::Arc;

use uuid::Uuid;

use stocktake::domain::{LocationInfo, ProductInfo};
use stocktake::interfaces::InventoryDirectory;
use stocktake::runtime::Runtime;

/// A wired runtime over an in-memory database, seeded with one admin,
/// two workers, and one location stocked with three products
/// (quantities 100, 50, 25).
pub struct Fixture {
    pub runtime: Runtime,
    pub admin: Uuid,
    pub worker1: Uuid,
    pub worker2: Uuid,
    pub location: LocationInfo,
    pub products: Vec<ProductInfo>,
}

pub const SEED_QUANTITIES: [i64; 3] = [100, 50, 25];

pub async fn fixture() -> Fixture {
    let runtime = Runtime::in_memory().await.expect("runtime should wire");

    let admin = Uuid::new_v4();
    let worker1 = Uuid::new_v4();
    let worker2 = Uuid::new_v4();
    let users = [
        (admin, "Admin User", "admin@test.example"),
        (worker1, "Worker One", "worker1@test.example"),
        (worker2, "Worker Two", "worker2@test.example"),
    ];
    for (id, name, email) in users {
        runtime
            .users
            .insert_user(id, name, email)
            .await
            .expect("user should insert");
    }

    let location = LocationInfo {
        id: Uuid::new_v4(),
        code: "WH-A".to_string(),
        name: "Warehouse A".to_string(),
    };
    runtime
        .inventory
        .insert_location(&location)
        .await
        .expect("location should insert");

    let mut products = Vec::new();
    for (i, quantity) in SEED_QUANTITIES.into_iter().enumerate() {
        let product = ProductInfo {
            id: Uuid::new_v4(),
            sku: format!("SKU{:03}", i + 1),
            name: format!("Product {}", i + 1),
        };
        runtime
            .inventory
            .insert_product(&product)
            .await
            .expect("product should insert");
        runtime
            .inventory
            .upsert_stock(location.id, product.id, quantity)
            .await
            .expect("stock should upsert");
        products.push(product);
    }

    Fixture {
        runtime,
        admin,
        worker1,
        worker2,
        location,
        products,
    }
}

impl Fixture {
    /// Current stock quantity for one seeded product, by index.
    pub async fn stock_quantity(&self, product_index: usize) -> i64 {
        let levels = self
            .runtime
            .inventory
            .stock_levels(self.location.id)
            .await
            .expect("stock levels should load");
        levels
            .iter()
            .find(|s| s.product_id == self.products[product_index].id)
            .map(|s| s.quantity)
            .expect("seeded product should have stock")
    }

    pub fn hub(&self) -> &Arc<stocktake::hub::NotificationHub> {
        &self.runtime.hub
    }
}
