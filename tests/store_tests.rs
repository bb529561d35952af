/// Store contract tests, run against the in-memory backend
///
/// These pin the observable storage semantics: index consistency after
/// every mutation, most-recent-first pagination, the unfiltered total, and
/// filter-after-slice listing.
use chrono::DateTime;
use omni_notification_service::models::Notification;
use omni_notification_service::store::{MemoryNotificationStore, NotificationStore};
use uuid::Uuid;

const BASE_TS: i64 = 1_700_000_000;

fn notification_at(account_id: &str, label: &str, offset_secs: i64) -> Notification {
    let mut notification = Notification::new(account_id, label, "body");
    notification.created_at = DateTime::from_timestamp(BASE_TS + offset_secs, 0).unwrap();
    notification
}

#[tokio::test]
async fn test_save_get_round_trip() {
    let store = MemoryNotificationStore::new();
    let notification = Notification::new("acct-1", "Welcome", "Hello there");

    store.save(&notification).await.unwrap();
    let fetched = store.get(notification.id).await.unwrap().unwrap();
    assert_eq!(fetched, notification);
}

#[tokio::test]
async fn test_unread_count_tracks_every_mutation() {
    let store = MemoryNotificationStore::new();
    let n1 = notification_at("acct-1", "n1", 1);
    let n2 = notification_at("acct-1", "n2", 2);
    let n3 = notification_at("acct-1", "n3", 3);

    store.save(&n1).await.unwrap();
    store.save(&n2).await.unwrap();
    store.save(&n3).await.unwrap();
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 3);

    assert!(store.mark_read(n1.id, "acct-1").await.unwrap());
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 2);

    // Re-saving the already-read record must not resurrect it as unread
    let read_copy = store.get(n1.id).await.unwrap().unwrap();
    store.save(&read_copy).await.unwrap();
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 2);

    assert!(store.delete(n2.id, "acct-1").await.unwrap());
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 1);

    assert_eq!(store.mark_all_read("acct-1").await.unwrap(), 1);
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_pagination_is_disjoint_and_most_recent_first() {
    let store = MemoryNotificationStore::new();
    for i in 1..=5 {
        store
            .save(&notification_at("acct-1", &format!("n{}", i), i))
            .await
            .unwrap();
    }

    let (page1, total1) = store
        .list_for_account("acct-1", 1, 2, None)
        .await
        .unwrap();
    let (page2, total2) = store
        .list_for_account("acct-1", 2, 2, None)
        .await
        .unwrap();

    assert_eq!(total1, 5);
    assert_eq!(total2, 5);

    let labels: Vec<&str> = page1
        .iter()
        .chain(page2.iter())
        .map(|n| n.label.as_str())
        .collect();
    assert_eq!(labels, vec!["n5", "n4", "n3", "n2"]);

    let ids1: Vec<Uuid> = page1.iter().map(|n| n.id).collect();
    assert!(page2.iter().all(|n| !ids1.contains(&n.id)));
}

#[tokio::test]
async fn test_listing_is_partitioned_by_account() {
    let store = MemoryNotificationStore::new();
    store.save(&notification_at("acct-1", "mine", 1)).await.unwrap();
    store.save(&notification_at("acct-2", "theirs", 2)).await.unwrap();

    let (items, total) = store
        .list_for_account("acct-1", 1, 10, None)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "mine");
}

#[tokio::test]
async fn test_category_filter_applies_after_page_slice() {
    let store = MemoryNotificationStore::new();
    // Oldest first: n1 card, n2 kyc, n3 kyc, n4 card
    for (i, category) in [(1, "card"), (2, "kyc"), (3, "kyc"), (4, "card")] {
        store
            .save(
                &notification_at("acct-1", &format!("n{}", i), i).with_category(category),
            )
            .await
            .unwrap();
    }

    let (items, total) = store
        .list_for_account("acct-1", 1, 3, Some("card"))
        .await
        .unwrap();

    // The page slice is [n4, n3, n2]; only n4 survives the filter. n1 also
    // matches the category but sits outside the slice, and the total stays
    // the unfiltered timeline size.
    assert_eq!(total, 4);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "n4");
}

#[tokio::test]
async fn test_mark_all_read_returns_starting_unread_size() {
    let store = MemoryNotificationStore::new();
    for i in 1..=4 {
        store
            .save(&notification_at("acct-1", &format!("n{}", i), i))
            .await
            .unwrap();
    }
    assert!(store.mark_read(store_ids(&store, "acct-1").await[0], "acct-1").await.unwrap());

    let marked = store.mark_all_read("acct-1").await.unwrap();
    assert_eq!(marked, 3);
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 0);

    // Nothing left to mark
    assert_eq!(store.mark_all_read("acct-1").await.unwrap(), 0);
}

async fn store_ids(store: &MemoryNotificationStore, account_id: &str) -> Vec<Uuid> {
    let (items, _) = store
        .list_for_account(account_id, 1, 100, None)
        .await
        .unwrap();
    items.into_iter().map(|n| n.id).collect()
}

#[tokio::test]
async fn test_mark_read_preserves_timeline_position() {
    let store = MemoryNotificationStore::new();
    let older = notification_at("acct-1", "older", 1);
    let newer = notification_at("acct-1", "newer", 2);
    store.save(&older).await.unwrap();
    store.save(&newer).await.unwrap();

    assert!(store.mark_read(older.id, "acct-1").await.unwrap());

    let (items, _) = store
        .list_for_account("acct-1", 1, 10, None)
        .await
        .unwrap();
    let labels: Vec<&str> = items.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["newer", "older"]);

    let reread = store.get(older.id).await.unwrap().unwrap();
    assert!(reread.is_read);
    assert_eq!(reread.created_at, older.created_at);
}

#[tokio::test]
async fn test_delete_removes_all_indexes() {
    let store = MemoryNotificationStore::new();
    let notification = notification_at("acct-1", "doomed", 1);
    store.save(&notification).await.unwrap();

    assert!(store.delete(notification.id, "acct-1").await.unwrap());
    assert_eq!(store.get(notification.id).await.unwrap(), None);
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 0);
    let (items, total) = store
        .list_for_account("acct-1", 1, 10, None)
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);

    // Second delete reports the record as already gone
    assert!(!store.delete(notification.id, "acct-1").await.unwrap());
}

#[tokio::test]
async fn test_not_found_is_benign() {
    let store = MemoryNotificationStore::new();
    assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    assert!(!store.mark_read(Uuid::new_v4(), "acct-1").await.unwrap());
    assert!(!store.delete(Uuid::new_v4(), "acct-1").await.unwrap());
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_welcome_scenario() {
    let store = MemoryNotificationStore::new();
    let notification = Notification::new("acct-1", "Welcome", "Hello there");
    store.save(&notification).await.unwrap();

    let fetched = store.get(notification.id).await.unwrap().unwrap();
    assert_eq!(fetched.label, "Welcome");
    assert!(!fetched.is_read);

    assert!(store.mark_read(notification.id, "acct-1").await.unwrap());
    assert_eq!(store.unread_count("acct-1").await.unwrap(), 0);
}
