mod common;

use common::{post, role, user};
use generic_repository::{EntityState, Error};
use sea_orm::sea_query::{Condition, IntoCondition};
use sea_orm::ColumnTrait;

#[tokio::test]
async fn test_get_by_id_returns_entity() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    let found = users.get_by_id(1).await.unwrap().expect("user 1 should exist");
    assert_eq!(found.id, 1);
    assert_eq!(found.name, "User 1");
}

#[tokio::test]
async fn test_get_by_id_missing_returns_none() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    assert!(users.get_by_id(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_all_returns_every_entity() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    assert_eq!(users.get_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_find_filters_entities() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    let found = users.find(user::Column::Name.eq("User 2")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 2);

    let none = users.find(user::Column::Name.eq("Nobody")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_find_single() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    let found = users.find_single(user::Column::Name.eq("User 3")).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(3));

    let missing = users.find_single(user::Column::Name.eq("Nobody")).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_find_single_with_several_matches_fails() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    let err = users.find_single(user::Column::Name.like("User%")).await.unwrap_err();
    assert!(matches!(err, Error::NotUnique { ref entity, .. } if entity == "users"));
}

#[tokio::test]
async fn test_any_and_count() {
    let factory = common::factory().await;
    let uow = factory.create();

    let users = uow.repository::<user::Entity>().unwrap();
    assert_eq!(users.count(None).await.unwrap(), 0);
    assert!(!users.any(user::Column::Id.eq(1)).await.unwrap());

    common::seed_users(&uow).await;
    assert!(users.any(user::Column::Id.eq(1)).await.unwrap());
    assert!(!users.any(user::Column::Id.eq(42)).await.unwrap());
    assert_eq!(users.count(None).await.unwrap(), 3);
    assert_eq!(
        users.count(Some(user::Column::Id.gt(1).into_condition())).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_get_paged() {
    let factory = common::factory().await;
    let uow = factory.create();
    let users = uow.repository::<user::Entity>().unwrap();
    users.add_range((1..=10).map(|i| common::user(i, &format!("User {:02}", i), None))).unwrap();
    uow.save_changes().await.unwrap();

    let page = users.order_by(user::Column::Id).get_paged(2, 3).await.unwrap();
    assert_eq!(page.total_count(), 10);
    assert_eq!(page.total_pages(), 4);
    assert_eq!(page.page_number(), 2);
    assert_eq!(page.page_size(), 3);
    assert!(page.has_previous_page());
    assert!(page.has_next_page());
    assert_eq!(page.items.iter().map(|u| u.id).collect::<Vec<_>>(), vec![4, 5, 6]);

    let last = users.get_paged(4, 3).await.unwrap();
    assert_eq!(last.items.iter().map(|u| u.id).collect::<Vec<_>>(), vec![10]);
    assert!(!last.has_next_page());

    let beyond = users.get_paged(10, 3).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_count(), 10);

    let all = users.get_paged(1, 20).await.unwrap();
    assert_eq!(all.len(), 10);
    assert_eq!(all.total_pages(), 1);
    assert!(!all.has_previous_page());
    assert!(!all.has_next_page());
}

#[tokio::test]
async fn test_get_paged_empty() {
    let factory = common::factory().await;
    let uow = factory.create();
    let users = uow.repository::<user::Entity>().unwrap();

    let page = users.get_paged(1, 10).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_count(), 0);
    assert_eq!(page.total_pages(), 0);
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn test_get_paged_respects_filter_and_sort() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_products(&uow, 5).await;

    let products = uow.repository::<common::product::Entity>().unwrap();
    let mut cheapest = products.get_by_id(1).await.unwrap().unwrap();
    products.delete(&mut cheapest).unwrap();
    uow.save_changes().await.unwrap();

    let page = products
        .order_by_descending(common::product::Column::Price)
        .get_paged(1, 2)
        .await
        .unwrap();
    assert_eq!(page.total_count(), 4);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![5, 4]);
}

#[tokio::test]
async fn test_order_by_then_by() {
    let factory = common::factory().await;
    let uow = factory.create();
    let users = uow.repository::<user::Entity>().unwrap();
    users.add_range([
        common::user(1, "Bob", None),
        common::user(2, "Alice", None),
        common::user(3, "Bob", None),
        common::user(4, "Alice", None),
    ]).unwrap();
    uow.save_changes().await.unwrap();

    let ascending = users
        .order_by(user::Column::Name)
        .then_by(user::Column::Id)
        .unwrap()
        .get_all()
        .await
        .unwrap();
    assert_eq!(ascending.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 4, 1, 3]);

    let descending = users
        .order_by_descending(user::Column::Name)
        .then_by_descending(user::Column::Id)
        .unwrap()
        .get_all()
        .await
        .unwrap();
    assert_eq!(descending.iter().map(|u| u.id).collect::<Vec<_>>(), vec![3, 1, 4, 2]);
}

#[tokio::test]
async fn test_order_by_replaces_previous_ordering() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;

    let users = uow.repository::<user::Entity>().unwrap();
    users.order_by_descending(user::Column::Name);
    let sorted = users.order_by(user::Column::Id).get_all().await.unwrap();
    assert_eq!(sorted.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_then_by_without_order_by_fails() {
    let factory = common::factory().await;
    let uow = factory.create();
    let users = uow.repository::<user::Entity>().unwrap();

    let err = users.then_by(user::Column::Name).unwrap_err();
    assert!(err.is_invalid_state());
    assert!(err.to_string().contains("then_by can only be applied to a sorted query"));

    assert!(users.then_by_descending(user::Column::Name).is_err());
}

#[tokio::test]
async fn test_reset_clears_ordering() {
    let factory = common::factory().await;
    let uow = factory.create();
    let users = uow.repository::<user::Entity>().unwrap();

    users.order_by(user::Column::Name);
    users.reset();
    assert!(users.then_by(user::Column::Id).is_err());
}

#[tokio::test]
async fn test_include_filters_on_navigation() {
    let factory = common::factory().await;
    let uow = factory.create();
    let roles = uow.repository::<role::Entity>().unwrap();
    let users = uow.repository::<user::Entity>().unwrap();
    roles.add_range([
        role::Model {
            id: 1,
            name: "Admin".to_string(),
        },
        role::Model {
            id: 2,
            name: "Guest".to_string(),
        },
    ]).unwrap();
    users.add_range([
        common::user(1, "User 1", Some(1)),
        common::user(2, "User 2", Some(2)),
        common::user(3, "User 3", None),
    ]).unwrap();
    uow.save_changes().await.unwrap();

    let admins = users
        .include(user::Relation::Role)
        .find(role::Column::Name.eq("Admin"))
        .await
        .unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].id, 1);

    // Left join keeps users without a role.
    assert_eq!(users.get_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_include_collection_keeps_entities_unique() {
    let factory = common::factory().await;
    let uow = factory.create();
    let roles = uow.repository::<role::Entity>().unwrap();
    let users = uow.repository::<user::Entity>().unwrap();
    let posts = uow.repository::<post::Entity>().unwrap();
    roles.add(role::Model {
        id: 1,
        name: "Admin".to_string(),
    }).unwrap();
    users.add(common::user(1, "User 1", Some(1))).unwrap();
    posts.add_range((1..=3).map(|i| post::Model {
        id: i,
        title: format!("Post {}", i),
        content: String::new(),
        user_id: 1,
    })).unwrap();
    uow.save_changes().await.unwrap();

    let user = users
        .include(user::Relation::Role)
        .include(user::Relation::Posts)
        .get_by_id(1)
        .await
        .unwrap();
    assert_eq!(user.map(|u| u.name), Some("User 1".to_string()));
    assert_eq!(users.get_all().await.unwrap().len(), 1);
    assert_eq!(users.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_get_all_with_related_loads_navigation() {
    let factory = common::factory().await;
    let uow = factory.create();
    let roles = uow.repository::<role::Entity>().unwrap();
    let users = uow.repository::<user::Entity>().unwrap();
    roles.add(role::Model {
        id: 1,
        name: "Admin".to_string(),
    }).unwrap();
    users.add_range([common::user(1, "User 1", Some(1)), common::user(2, "User 2", None)]).unwrap();
    uow.save_changes().await.unwrap();

    let rows = users
        .order_by(user::Column::Id)
        .get_all_with_related::<role::Entity>()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].1.as_ref().map(|r| r.name.as_str()), Some("Admin"));
    assert!(rows[1].1.is_none());
}

#[tokio::test]
async fn test_tracking_reads_attach_entities() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;
    let context = uow.context().unwrap();
    assert!(context.entries().is_empty());

    let users = uow.repository::<user::Entity>().unwrap();
    users.get_all().await.unwrap();
    let entries = context.entries();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.state == EntityState::Unchanged && e.entity == "users"));

    // Reading again does not duplicate entries.
    users.get_by_id(1).await.unwrap();
    assert_eq!(context.entries().len(), 3);
}

#[tokio::test]
async fn test_as_no_tracking_leaves_tracker_empty() {
    let factory = common::factory().await;
    let uow = factory.create();
    common::seed_users(&uow).await;
    let context = uow.context().unwrap();

    let users = uow.repository::<user::Entity>().unwrap();
    let sorted = users
        .as_no_tracking()
        .order_by(user::Column::Name)
        .get_all()
        .await
        .unwrap();
    assert_eq!(sorted.len(), 3);

    let mut single = users.get_by_id(1).await.unwrap().unwrap();
    single.name = "Modified".to_string();
    assert!(context.entries().is_empty());
    assert!(!context.has_changes());
}

#[tokio::test]
async fn test_fluent_chain_include_order_no_tracking() {
    let factory = common::factory().await;
    let uow = factory.create();
    let roles = uow.repository::<role::Entity>().unwrap();
    let users = uow.repository::<user::Entity>().unwrap();
    roles.add(role::Model {
        id: 1,
        name: "Admin".to_string(),
    }).unwrap();
    users.add_range([
        common::user(1, "Charlie", Some(1)),
        common::user(2, "Alice", Some(1)),
        common::user(3, "Bob", Some(1)),
    ]).unwrap();
    uow.save_changes().await.unwrap();
    uow.context().unwrap().clear_changes();

    let names: Vec<String> = users
        .include(user::Relation::Role)
        .order_by(user::Column::Name)
        .as_no_tracking()
        .find(Condition::all().add(role::Column::Name.eq("Admin")))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
    assert!(uow.context().unwrap().entries().is_empty());
}
