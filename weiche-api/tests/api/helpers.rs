use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use weiche_api::{
    config::ApiSettings,
    server::{self, ServerState},
};
use weiche_common::snowflake::{ProcessId, WorkerId};
use weiche_db::client::DbClient;

pub struct TestApi {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// A registered user and the token it acts with.
pub struct TestUser {
    pub id: u64,
    pub token: String,
}

impl TestApi {
    pub fn new() -> Self {
        Self::with_settings(ApiSettings::default())
    }

    pub fn with_settings(settings: ApiSettings) -> Self {
        let db_client = DbClient::in_memory(WorkerId::default(), ProcessId::default());

        Self {
            router: server::app(ServerState::new(db_client, settings)),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn get_as(&self, user: &TestUser, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, user: Option<&TestUser>, uri: &str, body: Value) -> TestResponse {
        let token = user.map(|user| user.token.as_str());
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn patch(&self, user: &TestUser, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn delete(&self, user: &TestUser, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&user.token), None)
            .await
    }

    pub async fn register(&self, handle: &str) -> TestUser {
        let response = self.post(None, "/users", json!({"handle": handle})).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        TestUser {
            id: response.body["user"]["id"].as_u64().unwrap(),
            token: response.body["token"].as_str().unwrap().to_owned(),
        }
    }

    /// Creates a post and returns its id.
    pub async fn create_post(&self, user: &TestUser, title: &str) -> u64 {
        let response = self
            .post(
                Some(user),
                "/posts",
                json!({"title": title, "text": format!("All about {title}")}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        response.body["id"].as_u64().unwrap()
    }

    /// Creates a comment and returns its id.
    pub async fn create_comment(&self, user: &TestUser, post: u64, text: &str) -> u64 {
        let response = self
            .post(Some(user), "/comments", json!({"post": post, "text": text}))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        response.body["id"].as_u64().unwrap()
    }
}
