mod entities;

use anyhow::{Context, Result};
use generic_repository::config::Config;
use generic_repository::{logger, ModelBuilder, UnitOfWork, UnitOfWorkFactory};
use sea_orm::{ColumnTrait, Set};

use entities::{category, product};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let _logger = logger::init(&config.logging)?;

    let model = ModelBuilder::new()
        .entity::<category::Entity>()
        .entity::<product::Entity>()
        .configure_soft_delete()
        .build();
    let factory = UnitOfWorkFactory::connect(&config.database, model)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.url))?;

    println!("--- Generic Repository Sample Application ---");
    println!("Demonstrates the key features of the library.");
    println!();

    let mut uow = factory.create();
    let result = run_sample(&uow).await;
    uow.dispose().await?;
    result?;

    println!();
    println!("--- Sample Application Finished ---");
    Ok(())
}

async fn run_sample(uow: &UnitOfWork) -> Result<()> {
    println!("--- 1. Seeding Database ---");
    seed_database(uow).await?;
    println!("Database seeded with 2 categories and 5 products.");
    println!();

    println!("--- 2. Basic CRUD Operations ---");
    let products = uow.repository::<product::Entity>()?;

    println!("Adding a new product: 'Gaming Mouse'");
    products.add(product::ActiveModel {
        name: Set("Gaming Mouse".to_string()),
        price: Set(79.99),
        category_id: Set(1),
        is_deleted: Set(false),
        deleted_at: Set(None),
        ..Default::default()
    })?;
    uow.save_changes().await?;
    let mouse = products
        .find_single(product::Column::Name.eq("Gaming Mouse"))
        .await?
        .context("Gaming Mouse was not saved")?;
    println!("New product added with ID: {}", mouse.id);
    println!();

    println!("Fetching product with ID: {}", mouse.id);
    let mut fetched = products.get_by_id(mouse.id).await?.context("Gaming Mouse not found")?;
    println!("Fetched: {} - Price: ${:.2}", fetched.name, fetched.price);
    println!();

    println!("Updating price for product ID: {}", mouse.id);
    fetched.price = 74.99;
    products.update(fetched)?;
    uow.save_changes().await?;
    if let Some(updated) = products.get_by_id(mouse.id).await? {
        println!("Updated Price: ${:.2}", updated.price);
    }
    println!();

    println!("Soft deleting product ID: {}", mouse.id);
    products.delete_by_id(mouse.id).await?;
    uow.save_changes().await?;
    let deleted = products.get_by_id(mouse.id).await?;
    println!("Product found after delete: {}", if deleted.is_some() { "Yes" } else { "No" });
    println!();

    println!("--- 3. Querying, Sorting, and Pagination ---");
    println!("Finding all products with price > $500...");
    for p in products.find(product::Column::Price.gt(500.0)).await? {
        println!("- {} (${:.2})", p.name, p.price);
    }
    println!();

    println!("Getting all products including their categories...");
    for (p, c) in products.get_all_with_related::<category::Entity>().await? {
        let category = c.map(|c| c.name).unwrap_or_default();
        println!("- {} (Category: {})", p.name, category);
    }
    println!();

    println!("Finding books through the category navigation...");
    let books = products
        .include(product::Relation::Category)
        .find(category::Column::Name.eq("Books"))
        .await?;
    for p in &books {
        println!("- {}", p.name);
    }
    products.reset();
    println!();

    println!("Getting all products sorted by price (descending)...");
    for p in products.order_by_descending(product::Column::Price).get_all().await? {
        println!("- {} (${:.2})", p.name, p.price);
    }
    println!();

    println!("Getting page 2 of products (2 per page)...");
    let page = products.order_by(product::Column::Id).get_paged(2, 2).await?;
    println!("Total Products: {}, Total Pages: {}", page.total_count(), page.total_pages());
    for p in &page.items {
        println!("- Page 2, Item: {}", p.name);
    }
    products.reset();
    println!();

    println!("--- 4. Soft Delete and Restore ---");
    println!(
        "Total products found (excluding soft-deleted): {}",
        products.get_all().await?.len()
    );

    println!("Restoring product with ID: {}", mouse.id);
    products.restore_by_id(mouse.id).await?;
    uow.save_changes().await?;

    let restored = products.get_by_id(mouse.id).await?;
    println!("Product found after restore: {}", if restored.is_some() { "Yes" } else { "No" });
    println!("Total products are now: {}", products.get_all().await?.len());

    Ok(())
}

async fn seed_database(uow: &UnitOfWork) -> Result<()> {
    let categories = uow.repository::<category::Entity>()?;
    let products = uow.repository::<product::Entity>()?;

    if categories.count(None).await? > 0 {
        println!("Database already seeded. Skipping.");
        return Ok(());
    }

    categories.add_range([
        category::Model {
            id: 1,
            name: "Electronics".to_string(),
        },
        category::Model {
            id: 2,
            name: "Books".to_string(),
        },
    ])?;

    let seed = [
        ("Laptop Pro", 1499.99, 1),
        ("Wireless Keyboard", 89.99, 1),
        ("4K Monitor", 799.00, 1),
        ("The Pragmatic Programmer", 45.50, 2),
        ("Clean Architecture", 39.99, 2),
    ];
    products.add_range(seed.into_iter().map(|(name, price, category_id)| product::ActiveModel {
        name: Set(name.to_string()),
        price: Set(price),
        category_id: Set(category_id),
        is_deleted: Set(false),
        deleted_at: Set(None),
        ..Default::default()
    }))?;

    uow.save_changes().await?;
    Ok(())
}
