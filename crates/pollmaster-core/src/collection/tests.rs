use std::sync::Mutex;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::config::ClientConfig;
use crate::models::{Article, ArticleDraft, ArticlePatch, Pet, PetDraft};
use crate::storage::MemoryStore;
use crate::test_server::{RecordedRequest, Reply, ScriptedServer};

const TOKEN: &str = "tok";

fn profile(id: &str, role: &str) -> Value {
    json!({"id": id, "name": "Test User", "email": format!("{id}@example.com"), "role": role, "isVerified": true})
}

fn auth_reply(request: &RecordedRequest, id: &str, role: &str) -> Option<Reply> {
    match request.path.as_str() {
        "/user/signin" => Some(Reply::json(
            200,
            json!({"data": {"token": TOKEN, "user": profile(id, role)}}),
        )),
        "/user/profile" => Some(Reply::json(200, json!({"user": profile(id, role)}))),
        _ => None,
    }
}

async fn signed_in(
    server: &ScriptedServer,
    storage: &MemoryStore,
    policy: WritePolicy,
) -> Arc<SessionStore<MemoryStore>> {
    let config = ClientConfig::new(server.base_url())
        .unwrap()
        .with_debounce_millis(0)
        .with_write_policy(policy);
    let session = Arc::new(SessionStore::new(config, storage.clone()).unwrap());
    session.sign_in("user@example.com", "Secret123").await.unwrap();
    session
}

fn article_draft(title: &str) -> ArticleDraft {
    ArticleDraft {
        title: title.to_string(),
        summary: "Summary".to_string(),
        body: "Body text".to_string(),
        date: Some("2026-01-01T00:00:00Z".to_string()),
    }
}

fn stored_articles(storage: &MemoryStore) -> Option<Vec<Article>> {
    load_json(storage, &keys::collection("articles")).unwrap()
}

#[tokio::test]
async fn regular_user_cannot_add_under_admin_policy() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "member", "user").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let storage = MemoryStore::new();
    let session = signed_in(&server, &storage, WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();

    let error = store.add_item(article_draft("Hello")).await.unwrap_err();

    assert!(matches!(error, Error::Unauthorized(_)));
    assert!(store.items().unwrap().is_empty());
    assert_eq!(stored_articles(&storage), None);
}

#[tokio::test]
async fn admin_adds_items_with_unique_ids() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "ADMIN").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let storage = MemoryStore::new();
    let session = signed_in(&server, &storage, WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(Arc::clone(&session), CollectionBackend::Local).unwrap();

    store.add_item(article_draft("First")).await.unwrap();
    let items = store.add_item(article_draft("Second")).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_ne!(items[0].id, items[1].id);
    assert_eq!(items[1].posted_by, "boss");
    assert_eq!(stored_articles(&storage), Some(items.clone()));

    let reopened: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();
    assert_eq!(reopened.items().unwrap(), items);
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_policy() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    let store: CollectionStore<Pet, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();

    let error = store
        .add_item(PetDraft {
            name: " ".to_string(),
            species: "cat".to_string(),
            price: 10.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Validation(_)));
}

#[tokio::test]
async fn owner_policy_limits_changes_to_the_author() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "author", "user").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let storage = MemoryStore::new();
    let foreign = Article {
        id: "foreign".to_string(),
        title: "Not mine".to_string(),
        summary: "s".to_string(),
        body: "b".to_string(),
        date: "2026-01-01".to_string(),
        posted_by: "someone-else".to_string(),
    };
    let session = signed_in(&server, &storage, WritePolicy::owner_or_admin()).await;
    // sign-in starts from a clean slate, so seed after it
    save_json(&storage, &keys::collection("articles"), &vec![foreign.clone()]).unwrap();
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();

    let items = store.add_item(article_draft("Mine")).await.unwrap();
    let mine = items.iter().find(|item| item.posted_by == "author").unwrap().id.clone();

    let patch = ArticlePatch {
        title: Some("Edited".to_string()),
        ..ArticlePatch::default()
    };
    let items = store.update_item(&mine, patch.clone()).await.unwrap();
    let edited = items.iter().find(|item| item.id == mine).unwrap();
    assert_eq!(edited.title, "Edited");
    assert_eq!(edited.posted_by, "author");
    assert_eq!(edited.summary, "Summary");

    assert!(matches!(
        store.update_item("foreign", patch).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        store.delete_item("foreign").await,
        Err(Error::Unauthorized(_))
    ));
    assert_eq!(store.get("foreign").unwrap(), Some(foreign));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();
    store.add_item(article_draft("Only")).await.unwrap();

    assert!(matches!(
        store.delete_item("missing").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        store.update_item("missing", ArticlePatch::default()).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(store.items().unwrap().len(), 1);
}

#[tokio::test]
async fn signed_out_writes_are_refused() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    session.sign_out().unwrap();
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::Local).unwrap();

    assert!(matches!(
        store.add_item(article_draft("Late")).await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn remote_backend_refetches_after_each_write() {
    let state: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let server = ScriptedServer::start(move |request| {
        if let Some(reply) = auth_reply(request, "boss", "admin") {
            return reply;
        }
        assert_eq!(request.bearer.as_deref(), Some(TOKEN));
        let mut items = state.lock().unwrap();
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/news/get") => Reply::json(200, json!({"success": true, "data": items.clone()})),
            ("POST", "/news/create") => {
                let mut item = request.body.clone();
                item["_id"] = json!(format!("srv-{}", items.len() + 1));
                item["postedBy"] = json!("boss");
                items.push(item);
                Reply::json(201, json!({"success": true}))
            }
            ("PUT", "/news/update/srv-1") => {
                items[0]["title"] = request.body["title"].clone();
                Reply::json(200, json!({"success": true}))
            }
            ("DELETE", "/news/delete/srv-1") => {
                items.remove(0);
                Reply::json(200, json!({"success": true}))
            }
            _ => Reply::json(404, json!({"message": "Item not found"})),
        }
    })
    .await;
    let storage = MemoryStore::new();
    let session = signed_in(&server, &storage, WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::remote("/news")).unwrap();

    let items = store.add_item(article_draft("Remote")).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "srv-1");

    let patch = ArticlePatch {
        title: Some("Renamed".to_string()),
        ..ArticlePatch::default()
    };
    let items = store.update_item("srv-1", patch).await.unwrap();
    assert_eq!(items[0].title, "Renamed");
    assert_eq!(stored_articles(&storage), Some(items));

    let items = store.delete_item("srv-1").await.unwrap();
    assert!(items.is_empty());
    assert_eq!(
        server.paths()[2..].to_vec(),
        vec![
            "POST /news/create",
            "GET /news/get",
            "PUT /news/update/srv-1",
            "GET /news/get",
            "DELETE /news/delete/srv-1",
            "GET /news/get",
        ]
    );
}

#[tokio::test]
async fn remote_rejection_goes_through_the_session() {
    let server = ScriptedServer::start(|_| Reply::json(401, json!({"message": "jwt expired"}))).await;
    let storage = MemoryStore::new();
    storage.set(keys::TOKEN, TOKEN).unwrap();
    let config = ClientConfig::new(server.base_url()).unwrap();
    let session = Arc::new(SessionStore::new(config, storage.clone()).unwrap());
    let store: CollectionStore<Article, _> =
        CollectionStore::new(Arc::clone(&session), CollectionBackend::remote("/news")).unwrap();

    let error = store.refresh().await.unwrap_err();

    assert!(error.is_unauthorized());
    assert_eq!(server.paths(), vec!["GET /news/get", "GET /user/profile"]);
    assert_eq!(session.state(), crate::session::SessionState::Unauthenticated);
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
}

#[tokio::test]
async fn sign_out_wipes_what_a_later_write_sees() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let storage = MemoryStore::new();
    let session = signed_in(&server, &storage, WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(Arc::clone(&session), CollectionBackend::Local).unwrap();
    store.add_item(article_draft("Before sign-out")).await.unwrap();

    session.sign_out().unwrap();
    assert!(store.items().unwrap().is_empty());
    assert_eq!(stored_articles(&storage), None);

    session.sign_in("user@example.com", "Secret123").await.unwrap();
    let items = store.add_item(article_draft("After")).await.unwrap();

    let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["After"]);
    assert_eq!(stored_articles(&storage), Some(items));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_keep_every_field() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    let store: Arc<CollectionStore<Article, _>> =
        Arc::new(CollectionStore::new(session, CollectionBackend::Local).unwrap());
    let id = store.add_item(article_draft("Original")).await.unwrap()[0]
        .id
        .clone();

    let patches = [
        ArticlePatch {
            title: Some("New title".to_string()),
            ..ArticlePatch::default()
        },
        ArticlePatch {
            summary: Some("New summary".to_string()),
            ..ArticlePatch::default()
        },
        ArticlePatch {
            body: Some("New body".to_string()),
            ..ArticlePatch::default()
        },
    ];
    let handles: Vec<_> = patches
        .into_iter()
        .map(|patch| {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move { store.update_item(&id, patch).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let article = store.get(&id).unwrap().unwrap();
    assert_eq!(article.title, "New title");
    assert_eq!(article.summary, "New summary");
    assert_eq!(article.body, "New body");
}

#[tokio::test]
async fn update_after_delete_is_not_found() {
    let server = ScriptedServer::start(|request| {
        auth_reply(request, "boss", "admin").unwrap_or_else(|| Reply::json(404, Value::Null))
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    let store: Arc<CollectionStore<Article, _>> =
        Arc::new(CollectionStore::new(session, CollectionBackend::Local).unwrap());
    let id = store.add_item(article_draft("Short lived")).await.unwrap()[0]
        .id
        .clone();

    let (deleted, updated) = tokio::join!(
        store.delete_item(&id),
        store.update_item(
            &id,
            ArticlePatch {
                title: Some("Too late".to_string()),
                ..ArticlePatch::default()
            }
        ),
    );

    assert!(deleted.unwrap().is_empty());
    assert!(matches!(updated, Err(Error::NotFound(_))));
    assert!(store.items().unwrap().is_empty());
}

#[tokio::test]
async fn remote_delete_refetches_an_uncached_id() {
    let server = ScriptedServer::start(|request| {
        if let Some(reply) = auth_reply(request, "boss", "admin") {
            return reply;
        }
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/news/get") => Reply::json(
                200,
                json!([{"_id": "srv-9", "title": "t", "summary": "s", "body": "b", "date": "2026-01-01", "postedBy": "boss"}]),
            ),
            ("DELETE", "/news/delete/srv-9") => Reply::json(200, json!({"success": true})),
            _ => Reply::json(404, json!({"message": "Item not found"})),
        }
    })
    .await;
    let session = signed_in(&server, &MemoryStore::new(), WritePolicy::admin_only()).await;
    let store: CollectionStore<Article, _> =
        CollectionStore::new(session, CollectionBackend::remote("/news")).unwrap();
    assert!(store.items().unwrap().is_empty());

    store.delete_item("srv-9").await.unwrap();
    assert!(matches!(
        store.delete_item("srv-404").await,
        Err(Error::NotFound(_))
    ));

    assert_eq!(
        server.paths()[2..].to_vec(),
        vec![
            "GET /news/get",
            "DELETE /news/delete/srv-9",
            "GET /news/get",
            "GET /news/get",
        ]
    );
}

#[test]
fn merge_keeps_identity_fields() {
    let article = Article {
        id: "a1".to_string(),
        title: "Old".to_string(),
        summary: "s".to_string(),
        body: "b".to_string(),
        date: "2026-01-01".to_string(),
        posted_by: "boss".to_string(),
    };
    let merged: Article = merge_patch(
        &article,
        &ArticlePatch {
            title: Some("New".to_string()),
            ..ArticlePatch::default()
        },
    )
    .unwrap();

    assert_eq!(merged.id, "a1");
    assert_eq!(merged.posted_by, "boss");
    assert_eq!(merged.title, "New");
}

#[test]
fn items_are_extracted_from_common_envelopes() {
    assert_eq!(extract_items(json!([1, 2])), json!([1, 2]));
    assert_eq!(extract_items(json!({"items": [1]})), json!([1]));
    assert_eq!(extract_items(json!({"success": true, "articles": [3]})), json!([3]));
    assert_eq!(extract_items(Value::Null), json!([]));
}
