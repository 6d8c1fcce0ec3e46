//! Cache consistency around mutations and cached reads, driven end to end
//! against a mock server.

use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use serde_json::json;
use tessera::api::RequestLimits;
use tessera::cache::{ItemKeys, TagKeys};
use tessera::mutation::{EditItem, MoveItems, UploadFiles};
use tessera::types::{
    ChildrenParams, GeoBounds, Geolocation, Item, ItemPatch, TagSearch, UploadFile,
    build_item_path,
};
use tessera::{
    ClientConfig, MutationState, NotificationLog, Phase, QueryClient, QueryOptions,
};
use uuid::Uuid;

fn item_json(id: Uuid, parent: Option<Uuid>, name: &str) -> serde_json::Value {
    let path = match parent {
        Some(parent) => build_item_path(&[parent, id]),
        None => build_item_path(&[id]),
    };
    json!({
        "id": id,
        "name": name,
        "type": "folder",
        "path": path,
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-01T10:00:00Z",
    })
}

fn item(id: Uuid, parent: Option<Uuid>, name: &str) -> Item {
    serde_json::from_value(item_json(id, parent, name)).expect("item")
}

fn result_of(items: &[(Uuid, Option<Uuid>)]) -> serde_json::Value {
    let data: serde_json::Map<String, serde_json::Value> = items
        .iter()
        .map(|(id, parent)| (id.to_string(), item_json(*id, *parent, "item")))
        .collect();
    json!({ "data": data, "errors": [] })
}

fn client(server: &MockServer, log: &Arc<NotificationLog>) -> QueryClient {
    let host = server.base_url().parse().expect("host");
    QueryClient::new(
        ClientConfig::new(host)
            .with_session("token")
            .with_notifier(log.clone()),
    )
    .expect("client")
}

#[tokio::test]
async fn optimistic_edit_is_visible_then_rolled_back() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("PATCH")
            .path(format!("/items/{id}"))
            .json_body(json!({ "name": "renamed" }));
        then.status(500).body("storage offline");
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    let key = ItemKeys::single(id).content();
    let original = item(id, None, "original");
    client.cache().set(key.clone(), original.clone());

    let mut pending = client.pending(EditItem::new(
        id,
        ItemPatch {
            name: Some("renamed".into()),
            ..ItemPatch::default()
        },
    ));
    pending.begin();
    assert_eq!(pending.state(), MutationState::OptimisticApplied);
    assert_eq!(
        client.cache().peek::<Item>(&key).map(|item| item.name),
        Some("renamed".to_string())
    );

    let err = pending.execute().await.expect_err("server error");
    assert_eq!(err.status(), Some(500));
    assert_eq!(client.cache().peek::<Item>(&key), Some(original));
    assert!(client.cache().is_invalidated(&key));
    assert_eq!(
        log.types(),
        vec![
            "EDIT_ITEM/TRIGGER",
            "EDIT_ITEM/REQUEST",
            "EDIT_ITEM/FAILURE",
            "EDIT_ITEM/FULFILL",
        ]
    );
}

#[tokio::test]
async fn optimistic_edit_discards_in_flight_fetch() {
    let server = MockServer::start();
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    let id = Uuid::new_v4();
    let key = ItemKeys::single(id).content();
    client.cache().set(key.clone(), item(id, None, "original"));

    let ticket = client.cache().begin_fetch(&key);
    let mut pending = client.pending(EditItem::new(
        id,
        ItemPatch {
            name: Some("renamed".into()),
            ..ItemPatch::default()
        },
    ));
    pending.begin();

    let stored = client
        .cache()
        .complete_fetch(&ticket, item(id, None, "stale reply"));
    assert!(!stored);
    assert_eq!(
        client.cache().peek::<Item>(&key).map(|item| item.name),
        Some("renamed".to_string())
    );
}

#[tokio::test]
async fn move_leaves_cache_alone_until_settled() {
    let server = MockServer::start();
    let (from, to, id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    server.mock(|when, then| {
        when.method("POST")
            .path("/items/move")
            .query_param("id", id.to_string())
            .json_body(json!({ "parentId": to }));
        then.status(200).json_body(result_of(&[(id, Some(to))]));
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    let moved = item(id, Some(from), "moved");
    let source = ItemKeys::single(from).children(&ChildrenParams::default());
    let destination = ItemKeys::single(to).children(&ChildrenParams::default());
    client
        .cache()
        .set(ItemKeys::single(id).content(), moved.clone());
    client.cache().set(source.clone(), vec![moved.clone()]);
    client.cache().set(destination.clone(), Vec::<Item>::new());

    let mut pending = client.pending(MoveItems::new(vec![id], Some(to)));
    pending.begin();
    assert_eq!(pending.state(), MutationState::Pending);
    assert_eq!(client.cache().peek::<Vec<Item>>(&source), Some(vec![moved.clone()]));
    assert!(!client.cache().is_invalidated(&source));

    pending.execute().await.expect("moved");
    assert!(client.cache().is_invalidated(&source));
    assert!(client.cache().is_invalidated(&destination));
    assert!(client.cache().is_invalidated(&ItemKeys::single(id).content()));
    assert_eq!(client.cache().peek::<Vec<Item>>(&source), Some(vec![moved]));
}

#[tokio::test]
async fn upload_with_point_invalidates_children_and_bounds_cell() {
    let server = MockServer::start();
    let parent = Uuid::new_v4();
    let created = Uuid::new_v4();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/items/upload")
            .query_param("id", parent.to_string())
            .query_param("lat", "1")
            .query_param("lng", "1");
        then.status(200)
            .json_body(result_of(&[(created, Some(parent))]));
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);

    let children = ItemKeys::single(parent).children(&ChildrenParams::default());
    let cell = ItemKeys::in_bounds(&GeoBounds {
        lat1: 1.0,
        lat2: 2.0,
        lng1: 1.0,
        lng2: 2.0,
    });
    let other_cell = ItemKeys::in_bounds(&GeoBounds {
        lat1: 2.0,
        lat2: 3.0,
        lng1: 1.0,
        lng2: 2.0,
    });
    client.cache().set(children.clone(), Vec::<Item>::new());
    client.cache().set(cell.clone(), 0_u32);
    client.cache().set(other_cell.clone(), 0_u32);

    let upload = UploadFiles::new(
        Some(parent),
        vec![UploadFile {
            name: "map.png".into(),
            mime: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }],
    )
    .at(Geolocation { lat: 1.0, lng: 1.0 });
    let uploaded = client.mutate(upload).await.expect("uploaded");

    mock.assert();
    assert!(uploaded.contains_key(&created));
    assert!(client.cache().is_invalidated(&children));
    assert!(client.cache().is_invalidated(&cell));
    assert!(!client.cache().is_invalidated(&other_cell));
    assert_eq!(log.in_phase(Phase::Success).len(), 1);
}

#[tokio::test]
async fn debounced_tag_search_fetches_latest_value_once() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/tags").query_param("search", "ab");
        then.status(200)
            .json_body(json!([{ "name": "abacus", "category": "level", "count": 2 }]));
    });
    let host = server.base_url().parse().expect("host");
    let client = QueryClient::new(ClientConfig::new(host).with_query_options(QueryOptions {
        debounce: Duration::from_millis(100),
        ..QueryOptions::default()
    }))
    .expect("client");

    let mut search = client.tag_search();
    search.set(TagSearch {
        search: "a".into(),
        category: None,
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    search.set(TagSearch {
        search: "ab".into(),
        category: None,
    });

    let result = search.next().await.expect("settled value");
    assert!(result.is_success());
    assert_eq!(search.value().search, "ab");
    let quiet = tokio::time::timeout(Duration::from_millis(300), search.next()).await;
    assert!(quiet.is_err(), "superseded input must not fetch");
    mock.assert();

    let stale_key = TagKeys::search(&TagSearch {
        search: "a".into(),
        category: None,
    });
    assert!(!client.cache().contains(&stale_key));
}

#[tokio::test]
async fn bulk_delete_runs_one_lifecycle_per_chunk() {
    let server = MockServer::start();
    let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let first = server.mock(|when, then| {
        when.method("DELETE")
            .path("/items")
            .query_param("id", ids[0].to_string());
        then.status(200)
            .json_body(result_of(&[(ids[0], None), (ids[1], None)]));
    });
    let second = server.mock(|when, then| {
        when.method("DELETE")
            .path("/items")
            .query_param("id", ids[2].to_string());
        then.status(403).body("forbidden");
    });
    let log = Arc::new(NotificationLog::new());
    let host = server.base_url().parse().expect("host");
    let client = QueryClient::new(
        ClientConfig::new(host)
            .with_session("token")
            .with_notifier(log.clone())
            .with_limits(RequestLimits {
                max_read_targets: 2,
                max_modify_targets: 2,
            }),
    )
    .expect("client");
    for id in &ids {
        client
            .cache()
            .set(ItemKeys::single(*id).content(), item(*id, None, "doomed"));
    }

    let err = client.delete_items(&ids).await.expect_err("one chunk failed");
    first.assert();
    second.assert();
    assert_eq!(err.status(), Some(403));
    assert_eq!(log.in_phase(Phase::Trigger).len(), 2);
    assert_eq!(log.in_phase(Phase::Success).len(), 1);
    assert_eq!(log.in_phase(Phase::Failure).len(), 1);
    assert_eq!(log.in_phase(Phase::Fulfill).len(), 2);

    // Only the successful chunk drops its items from the cache.
    assert!(!client.cache().contains(&ItemKeys::single(ids[0]).content()));
    assert!(!client.cache().contains(&ItemKeys::single(ids[1]).content()));
    assert!(client.cache().contains(&ItemKeys::single(ids[2]).content()));
}

#[tokio::test]
async fn reading_past_the_limit_caches_every_item() {
    let server = MockServer::start();
    let ids: Vec<Uuid> = (0..21).map(|_| Uuid::new_v4()).collect();
    let head: Vec<(Uuid, Option<Uuid>)> = ids[..20].iter().map(|id| (*id, None)).collect();
    let first = server.mock(|when, then| {
        when.method("GET")
            .path("/items")
            .query_param("id", ids[0].to_string());
        then.status(200).json_body(result_of(&head));
    });
    let second = server.mock(|when, then| {
        when.method("GET")
            .path("/items")
            .query_param("id", ids[20].to_string());
        then.status(200).json_body(result_of(&[(ids[20], None)]));
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);

    let result = client.items_many(&ids).fetch().await;
    first.assert();
    second.assert();
    let items = result.data.expect("items");
    assert_eq!(items.len(), 21);
    for id in &ids {
        let cached = client
            .cache()
            .get::<Item>(&ItemKeys::single(*id).content())
            .expect("individually cached");
        assert_eq!(cached.id, *id);
    }

    // A second read is served from the cache.
    let again = client.items_many(&ids).fetch().await;
    assert_eq!(again.data.map(|items| items.len()), Some(21));
}

#[tokio::test]
async fn failed_bulk_delete_restores_every_chunk_in_order() {
    let server = MockServer::start();
    let parent = Uuid::new_v4();
    let first = item(Uuid::new_v4(), Some(parent), "first");
    let second = item(Uuid::new_v4(), Some(parent), "second");
    let kept = item(Uuid::new_v4(), Some(parent), "kept");
    server.mock(|when, then| {
        when.method("DELETE")
            .path("/items")
            .query_param("id", first.id.to_string());
        then.status(500).body("fail first");
    });
    server.mock(|when, then| {
        when.method("DELETE")
            .path("/items")
            .query_param("id", second.id.to_string());
        then.status(500)
            .body("fail second")
            .delay(Duration::from_millis(300));
    });
    let log = Arc::new(NotificationLog::new());
    let host = server.base_url().parse().expect("host");
    let client = QueryClient::new(
        ClientConfig::new(host)
            .with_session("token")
            .with_notifier(log.clone())
            .with_limits(RequestLimits {
                max_read_targets: 1,
                max_modify_targets: 1,
            }),
    )
    .expect("client");
    let listing = ItemKeys::single(parent).children(&ChildrenParams::default());
    for cached in [&first, &second] {
        client
            .cache()
            .set(ItemKeys::single(cached.id).content(), cached.clone());
    }
    let before = vec![first.clone(), second.clone(), kept.clone()];
    client.cache().set(listing.clone(), before.clone());

    client
        .delete_items(&[first.id, second.id])
        .await
        .expect_err("both chunks failed");

    assert_eq!(log.in_phase(Phase::Failure).len(), 2);
    assert_eq!(client.cache().peek::<Vec<Item>>(&listing), Some(before));
    assert!(client.cache().is_invalidated(&listing));
}

#[tokio::test]
async fn edit_invalidates_item_and_parent_listing_on_success() {
    let server = MockServer::start();
    let parent = Uuid::new_v4();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("PATCH").path(format!("/items/{id}"));
        then.status(200)
            .json_body(item_json(id, Some(parent), "renamed"));
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    let listing = ItemKeys::single(parent).children(&ChildrenParams::default());
    let content = ItemKeys::single(id).content();
    client.cache().set(content.clone(), item(id, Some(parent), "original"));
    client
        .cache()
        .set(listing.clone(), vec![item(id, Some(parent), "original")]);

    client
        .mutate(EditItem::new(
            id,
            ItemPatch {
                name: Some("renamed".into()),
                ..ItemPatch::default()
            },
        ))
        .await
        .expect("edited");

    assert!(client.cache().is_invalidated(&content));
    assert!(client.cache().is_invalidated(&listing));
}

#[tokio::test]
async fn edit_invalidates_item_and_parent_listing_on_failure() {
    let server = MockServer::start();
    let parent = Uuid::new_v4();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("PATCH").path(format!("/items/{id}"));
        then.status(500).body("storage offline");
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    let listing = ItemKeys::single(parent).children(&ChildrenParams::default());
    let content = ItemKeys::single(id).content();
    let original = item(id, Some(parent), "original");
    client.cache().set(content.clone(), original.clone());
    client.cache().set(listing.clone(), vec![original.clone()]);

    client
        .mutate(EditItem::new(
            id,
            ItemPatch {
                name: Some("renamed".into()),
                ..ItemPatch::default()
            },
        ))
        .await
        .expect_err("server error");

    assert_eq!(client.cache().peek::<Item>(&content), Some(original));
    assert!(client.cache().is_invalidated(&content));
    assert!(client.cache().is_invalidated(&listing));
}

#[tokio::test]
async fn deleting_root_item_keeps_accessible_fetch_alive() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method("DELETE")
            .path("/items")
            .query_param("id", id.to_string());
        then.status(200).json_body(result_of(&[(id, None)]));
    });
    let log = Arc::new(NotificationLog::new());
    let client = client(&server, &log);
    client
        .cache()
        .set(ItemKeys::single(id).content(), item(id, None, "root"));

    let accessible = ItemKeys::all_accessible();
    let ticket = client.cache().begin_fetch(&accessible);
    let mut pending = client.pending(tessera::mutation::DeleteItems::new(vec![id]));
    pending.begin();

    assert!(client.cache().complete_fetch(&ticket, Vec::<Item>::new()));
    pending.execute().await.expect("deleted");
    assert!(client.cache().is_invalidated(&accessible));
}
