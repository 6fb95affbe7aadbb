mod common;

use axum::http::{Method, StatusCode};
use common::{
    AuthorPosts, TitledForm, find_post, post_count, seed_author, send, setup_flat_and_nested_app,
    setup_nested_app, setup_nested_app_with, setup_test_db,
};
use serde_json::json;

#[tokio::test]
async fn test_nested_index_is_scoped_to_parent() {
    let db = setup_test_db().await;
    let alice = seed_author(&db, "alice", &["a1", "a2"]).await;
    seed_author(&db, "bob", &["b1"]).await;
    let app = setup_nested_app(db);

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}/posts", alice.id), None).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["a1", "a2"]);
}

#[tokio::test]
async fn test_nested_count_is_scoped_to_parent() {
    let db = setup_test_db().await;
    seed_author(&db, "alice", &["a1", "a2"]).await;
    let bob = seed_author(&db, "bob", &["b1"]).await;
    let app = setup_nested_app(db);

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}/posts/count", bob.id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": null, "total": 1}));
}

#[tokio::test]
async fn test_nested_store_attaches_parent() {
    let db = setup_test_db().await;
    let alice = seed_author(&db, "alice", &[]).await;
    let app = setup_nested_app(db.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/authors/{}/posts", alice.id),
        Some(json!({"title": "fresh"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["author_id"], alice.id);
    let id = i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap();
    assert_eq!(find_post(&db, id).await.unwrap().author_id, Some(alice.id));
}

#[tokio::test]
async fn test_nested_routes_require_existing_parent() {
    let db = setup_test_db().await;
    let app = setup_nested_app(db);

    let (status, body) = send(&app, Method::GET, "/authors/42/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "author with ID '42' not found");

    let (status, _) = send(&app, Method::POST, "/authors/42/posts", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_routes_are_shallow() {
    let db = setup_test_db().await;
    seed_author(&db, "alice", &["a1"]).await;
    let app = setup_nested_app(db);

    let (status, body) = send(&app, Method::GET, "/posts/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "a1");

    let (status, _) = send(&app, Method::DELETE, "/posts/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_parent_resource_routes_coexist() {
    let db = setup_test_db().await;
    let app = setup_nested_app(db);

    let (status, body) = send(&app, Method::POST, "/authors", Some(json!({"name": "carol"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/authors/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "carol");

    let (_, body) = send(&app, Method::GET, &format!("/authors/{id}/posts"), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_nested_store_form_bypasses_fillable() {
    let db = setup_test_db().await;
    let alice = seed_author(&db, "alice", &[]).await;
    let app = setup_nested_app_with(db.clone(), AuthorPosts::with_form(&TitledForm));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/authors/{}/posts", alice.id),
        Some(json!({"title": "fresh", "secret": "s"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["author_id"], alice.id);
    assert_eq!(body["data"]["secret"], "s");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/authors/{}/posts", alice.id),
        Some(json!({"secret": "s"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["errors"]["title"], json!(["The title field is required."]));
    assert_eq!(post_count(&db).await, 1);
}

#[tokio::test]
async fn test_collection_only_merges_with_flat_routes() {
    let db = setup_test_db().await;
    let alice = seed_author(&db, "alice", &["a1"]).await;
    let app = setup_flat_and_nested_app(db);

    let (status, body) = send(&app, Method::GET, "/posts/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "a1");

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}/posts", alice.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, &format!("/authors/{}", alice.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "alice");
}
