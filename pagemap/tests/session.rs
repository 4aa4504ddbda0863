//! End-to-end session behavior against the scripted stub transport.

use std::{sync::Arc, time::Duration};

use serde_json::{Value as Json, json};
use uuid::Uuid;

use pagemap::{
    memory::StubTransport,
    prelude::*,
};

fn registry() -> Arc<SchemaRegistry> {
    let tasks = Schema::builder("task", task_database_id())
        .field(FieldDef::new("title", FieldKind::Title).required())
        .field(FieldDef::new("done", FieldKind::Checkbox).with_default(Value::Checkbox(false)))
        .field(FieldDef::new("priority", FieldKind::Number).mapped_to("Priority"))
        .build()
        .unwrap();

    Arc::new(SchemaRegistry::builder().register(tasks).build().unwrap())
}

fn task_database_id() -> Uuid {
    Uuid::parse_str("1f9e8d7c-6b5a-4f3e-8d2c-1b0a9f8e7d6c").unwrap()
}

fn session(transport: StubTransport) -> Session<StubTransport> {
    let config = SessionConfig::new(AuthToken::new("test-token").unwrap())
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)));

    Session::new(config, registry(), transport)
}

fn task_page(id: Uuid, title: &str, done: bool, priority: f64) -> Json {
    json!({
        "object": "page",
        "id": id.to_string(),
        "archived": false,
        "properties": {
            "title": { "title": [
                { "type": "text", "text": { "content": title, "link": null } },
            ]},
            "done": { "checkbox": done },
            "Priority": { "number": priority },
        },
    })
}

fn list_page(results: Vec<Json>, next_cursor: Option<&str>) -> Json {
    json!({
        "object": "list",
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
}

#[tokio::test]
async fn repeated_fetches_share_one_handle_and_keep_local_edits() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;
    transport.respond_with(task_page(id, "plan", false, 7.0)).await;

    let first = session.get("task", id).await.unwrap();
    first
        .lock()
        .unwrap()
        .set("done", Value::Checkbox(true))
        .unwrap();

    let second = session.get("task", id).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));

    let record = first.lock().unwrap();
    assert_eq!(record.get("done"), Some(&Value::Checkbox(true)));
    assert_eq!(record.get("priority"), Some(&Value::Number(7.0)));
    assert_eq!(record.dirty_fields(), vec!["done"]);
}

#[tokio::test]
async fn update_sends_only_the_changed_property() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;
    transport.respond_with(task_page(id, "plan", true, 1.0)).await;

    let task = session.get("task", id).await.unwrap();
    task.lock()
        .unwrap()
        .set("done", Value::Checkbox(true))
        .unwrap();

    session.update(&task).await.unwrap();

    let requests = transport.requests().await;
    assert_eq!(requests.len(), 2);

    let update = &requests[1];
    assert_eq!(update.method, Method::Patch);
    assert_eq!(update.path, format!("pages/{id}"));
    assert_eq!(
        update.body.as_ref().unwrap()["properties"],
        json!({ "done": { "checkbox": true } }),
    );

    assert!(!task.lock().unwrap().is_dirty());
}

#[tokio::test]
async fn updating_a_clean_record_sends_nothing() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;

    let task = session.get("task", id).await.unwrap();
    session.update(&task).await.unwrap();

    assert_eq!(transport.request_count().await, 1);
}

#[tokio::test]
async fn query_pages_lazily_and_in_order() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let first_page: Vec<Json> = ids[..3]
        .iter()
        .enumerate()
        .map(|(n, id)| task_page(*id, &format!("task {n}"), false, n as f64))
        .collect();
    let second_page: Vec<Json> = ids[3..]
        .iter()
        .enumerate()
        .map(|(n, id)| task_page(*id, &format!("task {}", n + 3), false, (n + 3) as f64))
        .collect();

    transport.respond_with(list_page(first_page, Some("cursor-1"))).await;
    transport.respond_with(list_page(second_page, None)).await;

    let schema = session.model("task").unwrap();
    let mut cursor = session.query(Query::new(schema).limit(3));

    // Lazy: nothing is fetched before the first advance.
    assert_eq!(transport.request_count().await, 0);

    let mut seen = Vec::new();

    for _ in 0..3 {
        let record = cursor.next().await.unwrap().unwrap();
        seen.push(record.lock().unwrap().id().unwrap());
    }

    // The buffered page is drained before the next request goes out.
    assert_eq!(transport.request_count().await, 1);

    while let Some(record) = cursor.next().await.unwrap() {
        seen.push(record.lock().unwrap().id().unwrap());
    }

    assert_eq!(seen, ids);

    let requests = transport.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, format!("databases/{}/query", task_database_id()));
    assert!(requests[0].body.as_ref().unwrap().get("start_cursor").is_none());
    assert_eq!(requests[1].body.as_ref().unwrap()["start_cursor"], "cursor-1");
}

#[tokio::test]
async fn rate_limits_are_retried_to_the_attempt_cap() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    for _ in 0..3 {
        transport
            .fail_with(PageStoreError::from_status(429, "slow down"))
            .await;
    }

    let err = session.get("task", id).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(transport.request_count().await, 3);
}

#[tokio::test]
async fn missing_pages_are_not_retried() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    transport
        .fail_with(PageStoreError::from_status(404, "no such page"))
        .await;

    let err = session.get("task", Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, PageStoreError::Permanent { status: Some(404), .. }));
    assert_eq!(transport.request_count().await, 1);
}

#[tokio::test]
async fn undeclared_filter_fields_fail_before_any_request() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    let schema = session.model("task").unwrap();
    let err = Query::new(schema)
        .filter(Filter::eq("status", Value::text("open")))
        .unwrap_err();

    assert!(matches!(err, PageStoreError::Schema(_)));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn create_applies_defaults_and_hydrates_the_id() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    transport.respond_with(task_page(id, "new task", false, 0.0)).await;

    let task = session
        .create("task", vec![("title", Value::text("new task")), ("priority", Value::Number(0.0))])
        .await
        .unwrap();

    let requests = transport.requests().await;
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "pages");

    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["parent"]["database_id"], task_database_id().to_string());
    assert_eq!(body["properties"]["done"], json!({ "checkbox": false }));

    let record = task.lock().unwrap();
    assert_eq!(record.id(), Some(id));
    assert!(!record.is_dirty());
}

#[tokio::test]
async fn creating_without_a_required_field_fails_locally() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    let err = session
        .create("task", vec![("priority", Value::Number(1.0))])
        .await
        .unwrap_err();

    assert!(matches!(err, PageStoreError::Validation { .. }));
    assert_eq!(transport.request_count().await, 0);
}

#[tokio::test]
async fn delete_archives_the_page_and_drops_the_cached_handle() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    let mut archived = task_page(id, "plan", false, 1.0);
    archived["archived"] = json!(true);

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;
    transport.respond_with(archived).await;
    transport.respond_with(task_page(id, "plan", false, 1.0)).await;

    let task = session.get("task", id).await.unwrap();
    session.delete(&task).await.unwrap();

    assert!(task.lock().unwrap().archived());

    let requests = transport.requests().await;
    assert_eq!(requests[1].body.as_ref().unwrap(), &json!({ "archived": true }));

    // The cache entry is gone, so the next fetch builds a fresh handle.
    let refetched = session.get("task", id).await.unwrap();
    assert!(!Arc::ptr_eq(&task, &refetched));
}

#[tokio::test]
async fn blocks_append_and_list_in_document_order() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    let blocks = vec![
        Block::paragraph("first"),
        Block::to_do("second"),
    ];
    let listed: Vec<Json> = blocks.iter().map(Block::to_wire).collect();

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;
    transport.respond_with(json!({ "object": "list", "results": [] })).await;
    transport.respond_with(list_page(listed, None)).await;

    let task = session.get("task", id).await.unwrap();
    session.append_blocks(&task, &blocks).await.unwrap();

    let requests = transport.requests().await;
    assert_eq!(requests[1].method, Method::Patch);
    assert_eq!(requests[1].path, format!("blocks/{id}/children"));
    assert_eq!(
        requests[1].body.as_ref().unwrap()["children"]
            .as_array()
            .unwrap()
            .len(),
        2,
    );

    let fetched = session.blocks(&task).unwrap().collect_all().await.unwrap();
    assert_eq!(fetched, blocks);
}

#[tokio::test]
async fn opaque_cursors_travel_as_query_pairs() {
    let transport = StubTransport::new();
    let session = session(transport.clone());
    let id = Uuid::new_v4();

    let hostile = "v1+page&start=2=";

    transport.respond_with(task_page(id, "plan", false, 1.0)).await;
    transport
        .respond_with(list_page(vec![Block::paragraph("one").to_wire()], Some(hostile)))
        .await;
    transport
        .respond_with(list_page(vec![Block::paragraph("two").to_wire()], None))
        .await;

    let task = session.get("task", id).await.unwrap();
    let blocks = session.blocks(&task).unwrap().collect_all().await.unwrap();
    assert_eq!(blocks.len(), 2);

    let requests = transport.requests().await;
    assert_eq!(requests[2].path, format!("blocks/{id}/children"));
    assert!(!requests[2].path.contains('?'));
    assert!(
        requests[2]
            .query
            .contains(&("start_cursor".to_string(), hostile.to_string())),
    );
}

#[tokio::test]
async fn users_resolve_and_list_lazily() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    let alice = Uuid::new_v4();
    let bot = Uuid::new_v4();

    transport
        .respond_with(json!({
            "object": "user",
            "id": alice.to_string(),
            "type": "person",
            "name": "Alice",
            "person": { "email": "alice@example.com" },
        }))
        .await;
    transport
        .respond_with(list_page(
            vec![json!({ "object": "user", "id": alice.to_string(), "type": "person", "name": "Alice" })],
            Some("user-cursor"),
        ))
        .await;
    transport
        .respond_with(list_page(
            vec![json!({ "object": "user", "id": bot.to_string(), "type": "bot", "name": "Integration" })],
            None,
        ))
        .await;

    let resolved = session.user(alice).await.unwrap();
    assert_eq!(resolved.name(), Some("Alice"));
    assert_eq!(resolved.email(), Some("alice@example.com"));

    let users = session.users().collect_all().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id(), alice);
    assert_eq!(users[1].kind(), Some(UserKind::Bot));

    let requests = transport.requests().await;
    assert_eq!(requests[0].path, format!("users/{alice}"));
    assert_eq!(requests[1].path, "users");
    assert!(
        requests[2]
            .query
            .contains(&("start_cursor".to_string(), "user-cursor".to_string())),
    );
}

#[tokio::test]
async fn truncated_listings_surface_as_decode_errors() {
    let transport = StubTransport::new();
    let session = session(transport.clone());

    transport
        .respond_with(json!({
            "object": "list",
            "results": [],
            "has_more": true,
            "next_cursor": null,
        }))
        .await;

    let schema = session.model("task").unwrap();
    let mut cursor = session.query(Query::new(schema));

    assert!(matches!(
        cursor.next().await.unwrap_err(),
        PageStoreError::Decode { .. },
    ));
}
