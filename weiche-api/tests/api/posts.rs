use crate::helpers::TestApi;
use axum::http::StatusCode;
use serde_json::json;
use std::num::NonZeroUsize;
use weiche_api::config::ApiSettings;
use weiche_common::pagination::{PaginationPolicy, PaginationStyle};

#[tokio::test]
async fn create_returns_the_generated_id() {
    let api = TestApi::new();
    let user = api.register("ursula").await;

    let response = api
        .post(
            Some(&user),
            "/posts",
            json!({"title": "Hello", "text": "World", "id": 5, "created": "2000-01-01T00:00:00Z"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.body["id"].as_u64().unwrap();
    assert_ne!(id, 5);
    assert_eq!(response.body["title"], json!("Hello"));
    assert_eq!(response.body["text"], json!("World"));
    assert_eq!(response.body["comments"], json!([]));
    assert_ne!(response.body["created"], json!("2000-01-01T00:00:00Z"));

    let retrieved = api.get(&format!("/posts/{id}")).await;
    assert_eq!(retrieved.status, StatusCode::OK);
    assert_eq!(retrieved.body, response.body);
}

#[tokio::test]
async fn invalid_input_persists_nothing() {
    let api = TestApi::new();
    let user = api.register("ursula").await;

    let response = api
        .post(Some(&user), "/posts", json!({"title": "   ", "text": null}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({
            "text": ["This field may not be null."],
            "title": ["This field may not be blank."],
        })
    );

    let response = api
        .post(Some(&user), "/posts", json!({"title": "x".repeat(101), "text": 7}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"title": ["Ensure this field has no more than 100 characters."]})
    );

    let response = api.post(Some(&user), "/posts", json!(["title"])).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body,
        json!({"non_field_errors": ["Invalid data. Expected a dictionary, but got list."]})
    );

    let listed = api.get("/posts").await;
    assert_eq!(listed.body["count"], json!(0));
}

#[tokio::test]
async fn writes_need_a_valid_token() {
    let api = TestApi::new();
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Hello").await;

    let anonymous = api
        .post(None, "/posts", json!({"title": "Hello", "text": "World"}))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        anonymous.body["detail"],
        json!("Authentication credentials were not provided.")
    );

    let forged = crate::helpers::TestUser {
        id: user.id,
        token: format!("{}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA.AAAAAAAAAAAAAAAAAAAAAAAA", user.id),
    };
    let response = api.delete(&forged, &format!("/posts/{post}")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let garbage = crate::helpers::TestUser {
        id: user.id,
        token: "not-a-token".to_owned(),
    };
    let response = api
        .patch(&garbage, &format!("/posts/{post}"), json!({"title": "Hi"}))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(api.get(&format!("/posts/{post}")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn missing_posts_are_not_found() {
    let api = TestApi::new();
    let user = api.register("ursula").await;

    let response = api.get("/posts/12345").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({"status": 404, "detail": "Not found."}));

    assert_eq!(api.get("/posts/hello").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        api.put(&user, "/posts/12345", json!({"title": "a", "text": "b"}))
            .await
            .status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        api.delete(&user, "/posts/12345").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn full_and_partial_updates() {
    let api = TestApi::new();
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Hello").await;
    let path = format!("/posts/{post}");
    let created = api.get(&path).await.body["created"].clone();

    let incomplete = api.put(&user, &path, json!({"title": "Changed"})).await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);
    assert_eq!(incomplete.body, json!({"text": ["This field is required."]}));

    let patched = api.patch(&user, &path, json!({"title": "Changed"})).await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["title"], json!("Changed"));
    assert_eq!(patched.body["text"], json!("All about Hello"));

    let replaced = api
        .put(
            &user,
            &path,
            json!({"title": "New", "text": "Text", "created": "2001-01-01T00:00:00Z"}),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["title"], json!("New"));
    assert_eq!(replaced.body["created"], created);
}

#[tokio::test]
async fn deleting_a_post_deletes_its_comments() {
    let api = TestApi::new();
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Doomed").await;
    let comment = api.create_comment(&user, post, "First").await;

    let response = api.delete(&user, &format!("/posts/{post}")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(response.body, serde_json::Value::Null);

    assert_eq!(
        api.get(&format!("/posts/{post}")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        api.get(&format!("/comments/{comment}")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(api.get("/comments").await.body["count"], json!(0));
}

#[tokio::test]
async fn list_is_paginated_by_page_number() {
    let api = TestApi::with_settings(ApiSettings {
        pagination: PaginationPolicy {
            style: PaginationStyle::PageNumber,
            page_size: NonZeroUsize::new(2).unwrap(),
            max_page_size: NonZeroUsize::new(10).unwrap(),
        },
        ..ApiSettings::default()
    });
    let user = api.register("ursula").await;
    let mut posts = Vec::new();
    for title in ["one", "two", "three"] {
        posts.push(api.create_post(&user, title).await);
    }

    let first = api.get("/posts").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["count"], json!(3));
    assert_eq!(first.body["next"], json!("http://localhost/posts?page=2"));
    assert_eq!(first.body["previous"], json!(null));
    assert_eq!(first.body["results"][0]["id"], json!(posts[0]));
    assert_eq!(first.body["results"][1]["id"], json!(posts[1]));

    let second = api.get("/posts?page=2").await;
    assert_eq!(second.body["next"], json!(null));
    assert_eq!(second.body["previous"], json!("http://localhost/posts"));
    assert_eq!(second.body["results"][0]["title"], json!("three"));

    let all = api.get("/posts?page_size=50").await;
    assert_eq!(all.body["results"].as_array().unwrap().len(), 3);
    assert_eq!(all.body["next"], json!(null));

    assert_eq!(api.get("/posts?page=3").await.status, StatusCode::NOT_FOUND);
    assert_eq!(api.get("/posts?page=0").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        api.get("/posts?page=first").await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn list_is_paginated_by_limit_and_offset() {
    let api = TestApi::with_settings(ApiSettings {
        pagination: PaginationPolicy {
            style: PaginationStyle::LimitOffset,
            page_size: NonZeroUsize::new(2).unwrap(),
            max_page_size: NonZeroUsize::new(10).unwrap(),
        },
        ..ApiSettings::default()
    });
    let user = api.register("ursula").await;
    for title in ["one", "two", "three"] {
        api.create_post(&user, title).await;
    }

    let page = api.get("/posts?offset=1").await;
    assert_eq!(page.body["count"], json!(3));
    assert_eq!(page.body["results"][0]["title"], json!("two"));
    assert_eq!(page.body["next"], json!(null));
    assert_eq!(page.body["previous"], json!("http://localhost/posts?limit=2"));

    let empty = api.get("/posts?offset=10").await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body["results"], json!([]));
}

#[tokio::test]
async fn depth_and_field_selection() {
    let api = TestApi::new();
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Hello").await;
    let comment = api.create_comment(&user, post, "First").await;

    let flat = api.get(&format!("/posts/{post}")).await;
    assert_eq!(flat.body["comments"], json!([comment]));

    let nested = api.get(&format!("/posts/{post}?depth=1")).await;
    assert_eq!(
        nested.body["comments"],
        json!([{"id": comment, "post": post, "user": user.id, "text": "First"}])
    );

    // Deeper than allowed renders at the maximum depth of two.
    let deep = api.get(&format!("/posts/{post}?depth=50")).await;
    assert_eq!(deep.status, StatusCode::OK);
    let nested_comment = &deep.body["comments"][0];
    assert_eq!(nested_comment["user"], json!({"id": user.id, "handle": "ursula"}));
    assert_eq!(nested_comment["post"]["id"], json!(post));
    assert_eq!(nested_comment["post"]["comments"], json!([comment]));

    let selected = api
        .get(&format!("/posts/{post}?fields=id,title,unknown&omit=title"))
        .await;
    assert_eq!(selected.body, json!({"id": post}));

    let listed = api.get("/posts?fields=title").await;
    assert_eq!(listed.body["results"], json!([{"title": "Hello"}]));
}

#[tokio::test]
async fn comments_of_a_post() {
    let api = TestApi::new();
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "Hello").await;
    let other = api.create_post(&user, "Other").await;
    let first = api.create_comment(&user, post, "First").await;
    api.create_comment(&user, other, "Elsewhere").await;
    let second = api.create_comment(&user, post, "Second").await;

    let response = api.get(&format!("/posts/{post}/comments")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], json!(2));
    assert_eq!(response.body["results"][0]["id"], json!(first));
    assert_eq!(response.body["results"][1]["id"], json!(second));

    assert_eq!(
        api.get("/posts/1/comments").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn oversized_query_numbers_are_capped() {
    let api = TestApi::with_settings(ApiSettings {
        pagination: PaginationPolicy {
            style: PaginationStyle::PageNumber,
            page_size: NonZeroUsize::new(1).unwrap(),
            max_page_size: NonZeroUsize::new(2).unwrap(),
        },
        ..ApiSettings::default()
    });
    let user = api.register("ursula").await;
    let post = api.create_post(&user, "one").await;
    for title in ["two", "three"] {
        api.create_post(&user, title).await;
    }
    let comment = api.create_comment(&user, post, "First").await;

    let huge = "99999999999999999999999";
    let page = api.get(&format!("/posts?page_size={huge}")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["results"].as_array().unwrap().len(), 2);
    assert_eq!(
        page.body["next"],
        json!("http://localhost/posts?page=2&page_size=2")
    );

    assert_eq!(
        api.get(&format!("/posts?page={huge}")).await.status,
        StatusCode::NOT_FOUND
    );

    let deep = api.get(&format!("/posts/{post}?depth=256")).await;
    assert_eq!(deep.status, StatusCode::OK);
    assert_eq!(
        deep.body["comments"][0]["user"],
        json!({"id": user.id, "handle": "ursula"})
    );
    assert_eq!(deep.body["comments"][0]["post"]["comments"], json!([comment]));
}
