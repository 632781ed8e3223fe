use crate::helpers::TestApi;
use axum::http::StatusCode;
use serde_json::json;
use weiche_api::config::ApiSettings;
use weiche_common::serializer::{Links, RelationStyle};

#[tokio::test]
async fn the_author_is_the_acting_user() {
    let api = TestApi::new();
    let ursula = api.register("ursula").await;
    let vera = api.register("vera").await;
    let post = api.create_post(&ursula, "Hello").await;

    let response = api
        .post(
            Some(&ursula),
            "/comments",
            json!({"post": post.to_string(), "user": vera.id, "text": "  Nice  "}),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["post"], json!(post));
    assert_eq!(response.body["user"], json!(ursula.id));
    assert_eq!(response.body["text"], json!("Nice"));
}

#[tokio::test]
async fn references_are_validated() {
    let api = TestApi::new();
    let user = api.register("ursula").await;

    let response = api
        .post(Some(&user), "/comments", json!({"post": 404, "text": "Nice"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"post": ["Invalid pk \"404\" - object does not exist."]})
    );

    let response = api
        .post(Some(&user), "/comments", json!({"post": [1], "text": ""}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({
            "post": ["Incorrect type. Expected pk value, received list."],
            "text": ["This field may not be blank."],
        })
    );

    assert_eq!(api.get("/comments").await.body["count"], json!(0));
}

#[tokio::test]
async fn only_the_author_may_change_a_comment() {
    let api = TestApi::new();
    let ursula = api.register("ursula").await;
    let vera = api.register("vera").await;
    let post = api.create_post(&ursula, "Hello").await;
    let other_post = api.create_post(&ursula, "Other").await;
    let comment = api.create_comment(&ursula, post, "Nice").await;
    let path = format!("/comments/{comment}");

    let response = api.patch(&vera, &path, json!({"text": "Mine now"})).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body["detail"],
        json!("You do not have permission to perform this action.")
    );
    assert_eq!(api.delete(&vera, &path).await.status, StatusCode::FORBIDDEN);

    let moved = api
        .put(&ursula, &path, json!({"post": other_post, "text": "Moved"}))
        .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.body["post"], json!(other_post));
    assert_eq!(moved.body["text"], json!("Moved"));

    let invalid = api.patch(&ursula, &path, json!({"post": 1})).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    assert_eq!(api.delete(&ursula, &path).await.status, StatusCode::NO_CONTENT);
    assert_eq!(api.get(&path).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn own_comments() {
    let api = TestApi::new();
    let ursula = api.register("ursula").await;
    let vera = api.register("vera").await;
    let post = api.create_post(&ursula, "Hello").await;
    let mine = api.create_comment(&ursula, post, "Mine").await;
    api.create_comment(&vera, post, "Theirs").await;

    assert_eq!(api.get("/comments/mine").await.status, StatusCode::UNAUTHORIZED);

    let response = api.get_as(&ursula, "/comments/mine").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], json!(1));
    assert_eq!(response.body["results"][0]["id"], json!(mine));

    let by_user = api.get(&format!("/users/{}/comments", vera.id)).await;
    assert_eq!(by_user.body["count"], json!(1));
    assert_eq!(by_user.body["results"][0]["text"], json!("Theirs"));
}

#[tokio::test]
async fn hyperlinked_relations() {
    let api = TestApi::with_settings(ApiSettings {
        links: Links::new(RelationStyle::Hyperlink, "http://api.test/"),
        ..ApiSettings::default()
    });
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Hello").await;

    let response = api
        .post(
            Some(&user),
            "/comments",
            json!({"post": format!("http://api.test/posts/{post}"), "text": "Linked"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let comment = response.body["id"].as_u64().unwrap();
    assert_eq!(
        response.body,
        json!({
            "id": comment,
            "url": format!("http://api.test/comments/{comment}"),
            "post": format!("http://api.test/posts/{post}"),
            "user": format!("http://api.test/users/{}", user.id),
            "text": "Linked",
        })
    );

    let wrong_resource = api
        .post(
            Some(&user),
            "/comments",
            json!({"post": format!("http://api.test/users/{}", user.id), "text": "Linked"}),
        )
        .await;
    assert_eq!(
        wrong_resource.body,
        json!({"post": ["Invalid hyperlink - No URL match."]})
    );

    let missing = api
        .post(
            Some(&user),
            "/comments",
            json!({"post": "/posts/1", "text": "Linked"}),
        )
        .await;
    assert_eq!(
        missing.body,
        json!({"post": ["Invalid hyperlink - Object does not exist."]})
    );

    let root = api.get("/").await;
    assert_eq!(root.body["comments"], json!("http://api.test/comments"));
}
