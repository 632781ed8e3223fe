use crate::helpers::TestApi;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn registration_issues_a_working_token() {
    let api = TestApi::new();

    let response = api.post(None, "/users", json!({"handle": "ursula"})).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.body["user"]["id"].as_u64().unwrap();
    assert_eq!(response.body["user"], json!({"id": id, "handle": "ursula"}));

    let token = response.body["token"].as_str().unwrap();
    assert!(token.starts_with(&format!("{id}.")));

    let created = api
        .request(
            axum::http::Method::POST,
            "/posts",
            Some(token),
            Some(json!({"title": "Hello", "text": "World"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
}

#[tokio::test]
async fn handles_are_validated_and_unique() {
    let api = TestApi::new();
    api.register("ursula").await;

    let taken = api.post(None, "/users", json!({"handle": "ursula"})).await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        taken.body,
        json!({"handle": ["user with this handle already exists."]})
    );

    let blank = api.post(None, "/users", json!({"handle": ""})).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body, json!({"handle": ["This field may not be blank."]}));

    let long = api
        .post(None, "/users", json!({"handle": "u".repeat(51)}))
        .await;
    assert_eq!(
        long.body,
        json!({"handle": ["Ensure this field has no more than 50 characters."]})
    );

    assert_eq!(api.get("/users").await.body["count"], json!(1));
}

#[tokio::test]
async fn users_can_be_read_by_anyone() {
    let api = TestApi::new();
    let ursula = api.register("ursula").await;
    let vera = api.register("vera").await;

    let listed = api.get("/users").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(
        listed.body["results"],
        json!([
            {"id": ursula.id, "handle": "ursula"},
            {"id": vera.id, "handle": "vera"},
        ])
    );

    let retrieved = api.get(&format!("/users/{}?omit=id", vera.id)).await;
    assert_eq!(retrieved.body, json!({"handle": "vera"}));

    let comments = api.get(&format!("/users/{}/comments", ursula.id)).await;
    assert_eq!(comments.status, StatusCode::OK);
    assert_eq!(comments.body["results"], json!([]));

    assert_eq!(api.get("/users/1").await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        api.get("/users/1/comments").await.status,
        StatusCode::NOT_FOUND
    );
}
