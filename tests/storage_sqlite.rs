//! SQLite storage integration tests.
//!
//! Verifies the store contracts against the SQLite implementations
//! using an in-memory database; no external dependencies required.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use stocktake::domain::{
    Assignment, Notification, NotificationDraft, NotificationKind, StockTaking, StockTakingItem,
    StockTakingStatus,
};
use stocktake::interfaces::{NotificationStore, StockTakingStore};
use stocktake::storage::{self, Stores};

async fn mem_stores() -> Stores {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("should connect to in-memory SQLite");
    storage::init_stores(pool).await.expect("stores should init")
}

fn make_taking(offset_secs: i64) -> StockTaking {
    StockTaking {
        id: Uuid::new_v4(),
        location_id: Uuid::new_v4(),
        status: StockTakingStatus::Requested,
        requested_by: Uuid::new_v4(),
        created_at: Utc::now() + Duration::seconds(offset_secs),
        started_at: None,
        completed_at: None,
        notes: None,
    }
}

fn make_item(taking: &StockTaking, expected: i64) -> StockTakingItem {
    StockTakingItem {
        id: Uuid::new_v4(),
        stock_taking_id: taking.id,
        product_id: Uuid::new_v4(),
        expected_quantity: expected,
        counted_quantity: None,
        counted_at: None,
        counted_by: None,
        notes: None,
    }
}

fn make_assignment(taking: &StockTaking, user_id: Uuid) -> Assignment {
    Assignment {
        stock_taking_id: taking.id,
        user_id,
        assigned_at: taking.created_at,
    }
}

fn make_notification(user_id: Uuid, title: &str, offset_secs: i64) -> Notification {
    let mut notification = Notification::new(
        user_id,
        NotificationDraft {
            title: title.to_string(),
            message: "message".to_string(),
            kind: NotificationKind::StockTakingRequested,
            link: None,
        },
    );
    notification.created_at = Utc::now() + Duration::seconds(offset_secs);
    notification
}

#[tokio::test]
async fn test_insert_and_get_round_trip() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;

    let mut taking = make_taking(0);
    taking.notes = Some("evening shift".to_string());
    let worker = Uuid::new_v4();
    let assignments = vec![make_assignment(&taking, worker)];
    let items = vec![make_item(&taking, 100), make_item(&taking, 50)];

    store
        .insert(&taking, &assignments, &items)
        .await
        .expect("insert should succeed");

    let loaded = store
        .get(taking.id)
        .await
        .expect("get should succeed")
        .expect("taking should exist");
    assert_eq!(loaded, taking);

    let loaded_assignments = store
        .assignments(taking.id)
        .await
        .expect("assignments should load");
    assert_eq!(loaded_assignments, assignments);

    let mut loaded_items = store.items(taking.id).await.expect("items should load");
    loaded_items.sort_by_key(|i| i.expected_quantity);
    let mut expected_items = items.clone();
    expected_items.sort_by_key(|i| i.expected_quantity);
    assert_eq!(loaded_items, expected_items);

    assert!(store
        .is_assigned(taking.id, worker)
        .await
        .expect("is_assigned should succeed"));
    assert!(!store
        .is_assigned(taking.id, Uuid::new_v4())
        .await
        .expect("is_assigned should succeed"));
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let stores = mem_stores().await;
    let loaded = stores
        .stock_takings
        .get(Uuid::new_v4())
        .await
        .expect("get should succeed");
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_mark_started_is_conditional() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;
    let taking = make_taking(0);
    store
        .insert(&taking, &[], &[])
        .await
        .expect("insert should succeed");

    let now = Utc::now();
    assert!(store
        .mark_started(taking.id, now)
        .await
        .expect("first flip should succeed"));

    // Already in progress: the second flip loses.
    assert!(!store
        .mark_started(taking.id, now)
        .await
        .expect("second flip should not error"));

    let loaded = store
        .get(taking.id)
        .await
        .expect("get should succeed")
        .expect("taking should exist");
    assert_eq!(loaded.status, StockTakingStatus::InProgress);
    assert!(loaded.started_at.is_some());

    // Unknown id flips nothing.
    assert!(!store
        .mark_started(Uuid::new_v4(), now)
        .await
        .expect("missing flip should not error"));
}

#[tokio::test]
async fn test_mark_completed_requires_in_progress() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;
    let taking = make_taking(0);
    store
        .insert(&taking, &[], &[])
        .await
        .expect("insert should succeed");

    let now = Utc::now();
    // Straight from Requested: rejected.
    assert!(!store
        .mark_completed(taking.id, now)
        .await
        .expect("flip should not error"));

    store
        .mark_started(taking.id, now)
        .await
        .expect("start flip");
    assert!(store
        .mark_completed(taking.id, now)
        .await
        .expect("complete flip"));

    let loaded = store
        .get(taking.id)
        .await
        .expect("get should succeed")
        .expect("taking should exist");
    assert_eq!(loaded.status, StockTakingStatus::Completed);
    assert!(loaded.completed_at.is_some());
}

#[tokio::test]
async fn test_record_count_overwrites() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;
    let taking = make_taking(0);
    let item = make_item(&taking, 100);
    store
        .insert(&taking, &[], &[item.clone()])
        .await
        .expect("insert should succeed");

    let counter = Uuid::new_v4();
    let when = Utc::now();
    assert!(store
        .record_count(item.id, 95, counter, when, Some("shelf 3"))
        .await
        .expect("count should succeed"));

    let loaded = store
        .item(item.id)
        .await
        .expect("item should load")
        .expect("item should exist");
    assert_eq!(loaded.counted_quantity, Some(95));
    assert_eq!(loaded.counted_by, Some(counter));
    assert_eq!(loaded.notes.as_deref(), Some("shelf 3"));

    // Second write replaces everything, including clearing notes.
    let counter2 = Uuid::new_v4();
    assert!(store
        .record_count(item.id, 97, counter2, Utc::now(), None)
        .await
        .expect("recount should succeed"));
    let loaded = store
        .item(item.id)
        .await
        .expect("item should load")
        .expect("item should exist");
    assert_eq!(loaded.counted_quantity, Some(97));
    assert_eq!(loaded.counted_by, Some(counter2));
    assert_eq!(loaded.notes, None);

    // Missing item: no row changed.
    assert!(!store
        .record_count(Uuid::new_v4(), 1, counter, Utc::now(), None)
        .await
        .expect("missing count should not error"));
}

#[tokio::test]
async fn test_recent_orders_newest_first_and_limits() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;

    let old = make_taking(-20);
    let mid = make_taking(-10);
    let new = make_taking(0);
    for taking in [&old, &mid, &new] {
        store
            .insert(taking, &[], &[])
            .await
            .expect("insert should succeed");
    }

    let recent = store.recent(10).await.expect("recent should load");
    let ids: Vec<Uuid> = recent.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![new.id, mid.id, old.id]);

    let limited = store.recent(2).await.expect("recent should load");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, new.id);
}

#[tokio::test]
async fn test_for_worker_filters_status_and_user() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;
    let worker = Uuid::new_v4();

    let open = make_taking(-10);
    let done = make_taking(-5);
    let foreign = make_taking(0);
    store
        .insert(&open, &[make_assignment(&open, worker)], &[])
        .await
        .expect("insert should succeed");
    store
        .insert(&done, &[make_assignment(&done, worker)], &[])
        .await
        .expect("insert should succeed");
    store
        .insert(&foreign, &[make_assignment(&foreign, Uuid::new_v4())], &[])
        .await
        .expect("insert should succeed");

    let now = Utc::now();
    store.mark_started(done.id, now).await.expect("start flip");
    store
        .mark_completed(done.id, now)
        .await
        .expect("complete flip");

    let mine = store.for_worker(worker).await.expect("listing should load");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, open.id);

    let nobody = store
        .for_worker(Uuid::new_v4())
        .await
        .expect("listing should load");
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_discrepant_items_only_from_completed() {
    let stores = mem_stores().await;
    let store = &stores.stock_takings;
    let counter = Uuid::new_v4();
    let now = Utc::now();

    // Completed taking: one discrepant, one clean item.
    let completed = make_taking(-10);
    let short = make_item(&completed, 100);
    let clean = make_item(&completed, 50);
    store
        .insert(&completed, &[], &[short.clone(), clean.clone()])
        .await
        .expect("insert should succeed");
    store
        .record_count(short.id, 95, counter, now - Duration::seconds(5), None)
        .await
        .expect("count should succeed");
    store
        .record_count(clean.id, 50, counter, now, None)
        .await
        .expect("count should succeed");
    store
        .mark_started(completed.id, now)
        .await
        .expect("start flip");
    store
        .mark_completed(completed.id, now)
        .await
        .expect("complete flip");

    // In-progress taking with a discrepant count: not reported yet.
    let open = make_taking(0);
    let open_item = make_item(&open, 10);
    store
        .insert(&open, &[], &[open_item.clone()])
        .await
        .expect("insert should succeed");
    store.mark_started(open.id, now).await.expect("start flip");
    store
        .record_count(open_item.id, 2, counter, now, None)
        .await
        .expect("count should succeed");

    let discrepant = store
        .discrepant_items(10)
        .await
        .expect("discrepant items should load");
    assert_eq!(discrepant.len(), 1);
    assert_eq!(discrepant[0].item.id, short.id);
    assert_eq!(discrepant[0].item.counted_quantity, Some(95));
    assert_eq!(discrepant[0].location_id, completed.location_id);
}

#[tokio::test]
async fn test_notifications_round_trip_and_ordering() {
    let stores = mem_stores().await;
    let store = &stores.notifications;
    let user = Uuid::new_v4();

    let first = make_notification(user, "First", -20);
    let second = make_notification(user, "Second", -10);
    let third = make_notification(user, "Third", 0);
    store.insert(&first).await.expect("insert should succeed");
    store
        .insert_batch(&[second.clone(), third.clone()])
        .await
        .expect("batch insert should succeed");
    store
        .insert(&make_notification(Uuid::new_v4(), "Foreign", 0))
        .await
        .expect("insert should succeed");

    let listed = store.for_user(user, 10).await.expect("list should load");
    let titles: Vec<&str> = listed.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);
    assert_eq!(listed[2], first);

    let limited = store.for_user(user, 2).await.expect("list should load");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].title, "Third");
}

#[tokio::test]
async fn test_unread_count_and_mark_read_scoping() {
    let stores = mem_stores().await;
    let store = &stores.notifications;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let notification = make_notification(owner, "Unread", 0);
    store
        .insert(&notification)
        .await
        .expect("insert should succeed");
    assert_eq!(store.unread_count(owner).await.expect("count"), 1);

    // Wrong owner: silent no-op.
    store
        .mark_read(notification.id, stranger)
        .await
        .expect("foreign mark_read should not error");
    assert_eq!(store.unread_count(owner).await.expect("count"), 1);

    store
        .mark_read(notification.id, owner)
        .await
        .expect("mark_read should succeed");
    assert_eq!(store.unread_count(owner).await.expect("count"), 0);

    // Idempotent on already-read.
    store
        .mark_read(notification.id, owner)
        .await
        .expect("repeat mark_read should not error");
    let listed = store.for_user(owner, 10).await.expect("list should load");
    assert!(listed[0].is_read);
}

#[tokio::test]
async fn test_mark_all_read_only_touches_owner() {
    let stores = mem_stores().await;
    let store = &stores.notifications;
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    store
        .insert_batch(&[
            make_notification(owner, "A", -2),
            make_notification(owner, "B", -1),
            make_notification(other, "C", 0),
        ])
        .await
        .expect("batch insert should succeed");

    store
        .mark_all_read(owner)
        .await
        .expect("mark_all_read should succeed");

    assert_eq!(store.unread_count(owner).await.expect("count"), 0);
    assert_eq!(store.unread_count(other).await.expect("count"), 1);
}

#[tokio::test]
async fn test_inventory_directory_lookups_and_write_back() {
    let fx = common::fixture().await;
    let inventory = &fx.runtime.inventory;

    use stocktake::interfaces::InventoryDirectory;

    let location = inventory
        .location(fx.location.id)
        .await
        .expect("lookup should succeed")
        .expect("location should exist");
    assert_eq!(location.code, "WH-A");
    assert!(inventory
        .location(Uuid::new_v4())
        .await
        .expect("lookup should succeed")
        .is_none());

    let product = inventory
        .product(fx.products[0].id)
        .await
        .expect("lookup should succeed")
        .expect("product should exist");
    assert_eq!(product.sku, "SKU001");

    let levels = inventory
        .stock_levels(fx.location.id)
        .await
        .expect("levels should load");
    assert_eq!(levels.len(), 3);

    // Write-back hits an existing row.
    assert!(inventory
        .update_stock(fx.location.id, fx.products[0].id, 42, Utc::now())
        .await
        .expect("update should succeed"));
    assert_eq!(fx.stock_quantity(0).await, 42);

    // No row, no write.
    assert!(!inventory
        .update_stock(fx.location.id, Uuid::new_v4(), 42, Utc::now())
        .await
        .expect("update should not error"));
}

#[tokio::test]
async fn test_init_storage_creates_database_file() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("data").join("stocktake.db");
    let config = stocktake::config::StorageConfig {
        storage_type: "sqlite".to_string(),
        path: path.to_string_lossy().into_owned(),
    };

    let stores = storage::init_storage(&config)
        .await
        .expect("init should succeed");

    let taking = make_taking(0);
    stores
        .stock_takings
        .insert(&taking, &[], &[])
        .await
        .expect("insert should succeed");
    assert!(path.exists());
}

#[tokio::test]
async fn test_init_storage_rejects_unknown_type() {
    let config = stocktake::config::StorageConfig {
        storage_type: "mongodb".to_string(),
        path: String::new(),
    };

    assert!(storage::init_storage(&config).await.is_err());
}

#[tokio::test]
async fn test_user_directory_resolves_names() {
    let fx = common::fixture().await;
    use stocktake::interfaces::UserDirectory;

    let users = &fx.runtime.users;
    assert_eq!(
        users
            .display_name(fx.admin)
            .await
            .expect("lookup should succeed")
            .as_deref(),
        Some("Admin User")
    );
    assert!(users
        .display_name(Uuid::new_v4())
        .await
        .expect("lookup should succeed")
        .is_none());

    let unknown = Uuid::new_v4();
    let names = users
        .display_names(&[fx.worker1, fx.worker2, unknown])
        .await
        .expect("batch lookup should succeed");
    assert_eq!(names.len(), 2);
    assert_eq!(names[&fx.worker1], "Worker One");
    assert!(!names.contains_key(&unknown));
}
