use crate::helpers::TestApi;
use axum::http::StatusCode;
use serde_json::json;
use weiche_api::server::{
    self, PostHandler,
    resource::{ActionMethod, ResourceRouter},
};

async fn noop() {}

#[test]
fn resource_routes_follow_the_name() {
    let router = ResourceRouter::<PostHandler>::new()
        .detail_action("publish", ActionMethod::Post, noop)
        .collection_action("recent", ActionMethod::Get, noop);

    let endpoints: Vec<String> = router
        .endpoints()
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        endpoints,
        [
            "GET /posts",
            "POST /posts",
            "GET /posts/{id}",
            "PUT /posts/{id}",
            "PATCH /posts/{id}",
            "DELETE /posts/{id}",
            "POST /posts/{id}/publish",
            "GET /posts/recent",
        ]
    );
}

#[test]
fn all_endpoints_are_reported() {
    let endpoints: Vec<String> = server::endpoints()
        .iter()
        .map(ToString::to_string)
        .collect();

    for expected in [
        "GET /posts/{id}/comments",
        "DELETE /comments/{id}",
        "GET /comments/mine",
        "GET /users",
        "POST /users",
        "GET /users/{id}/comments",
    ] {
        assert!(endpoints.iter().any(|endpoint| endpoint == expected), "{expected}");
    }
}

#[tokio::test]
async fn api_root_links_every_resource() {
    let api = TestApi::new();

    let response = api.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "posts": "http://localhost/posts",
            "comments": "http://localhost/comments",
            "users": "http://localhost/users",
        })
    );
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let api = TestApi::new();

    let response = api.get("/articles").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"status": 404, "detail": "Not found."}));
}

#[tokio::test]
async fn unsupported_methods_reply_with_json() {
    let api = TestApi::new();
    let user = api.register("ursula").await;

    let response = api.delete(&user, "/posts").await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response.body,
        json!({"status": 405, "detail": "Method \"DELETE\" not allowed."})
    );

    let response = api.put(&user, "/comments/mine", json!({})).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.body["detail"], json!("Method \"PUT\" not allowed."));

    let response = api.post(None, "/users/1", json!({})).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
