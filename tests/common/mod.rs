//! Shared fixtures: test entities and an in-memory database per test.
#![allow(dead_code)]

pub mod post;
pub mod product;
pub mod review;
pub mod role;
pub mod tag;
pub mod user;

use generic_repository::{DatabaseConfig, EntityModel, ModelBuilder, UnitOfWork, UnitOfWorkFactory};

pub fn model() -> EntityModel {
    ModelBuilder::new()
        .entity::<role::Entity>()
        .entity::<user::Entity>()
        .entity::<post::Entity>()
        .entity::<product::Entity>()
        .entity::<review::Entity>()
        .entity::<tag::Entity>()
        .configure_soft_delete()
        .build()
}

/// Factory over a fresh in-memory database with every test table created.
pub async fn factory() -> UnitOfWorkFactory {
    UnitOfWorkFactory::connect(&DatabaseConfig::default(), model())
        .await
        .expect("in-memory database should connect")
}

pub fn user(id: i32, name: &str, role_id: Option<i32>) -> user::Model {
    user::Model {
        id,
        name: name.to_string(),
        role_id,
    }
}

/// Saves "User 1", "User 2" and "User 3" with ids 1 to 3.
pub async fn seed_users(uow: &UnitOfWork) {
    let users = uow.repository::<user::Entity>().unwrap();
    users.add_range([user(1, "User 1", None), user(2, "User 2", None), user(3, "User 3", None)]).unwrap();
    uow.save_changes().await.unwrap();
    uow.context().unwrap().clear_changes();
}

/// Saves products with ids 1 to `count`, priced 10, 20, ...
pub async fn seed_products(uow: &UnitOfWork, count: i32) {
    let products = uow.repository::<product::Entity>().unwrap();
    products.add_range((1..=count).map(|i| product::new(i, &format!("Product {}", i), f64::from(i) * 10.0))).unwrap();
    uow.save_changes().await.unwrap();
    uow.context().unwrap().clear_changes();
}
