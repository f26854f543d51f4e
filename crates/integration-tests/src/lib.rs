//! Shared fixtures for the HTTP integration tests: a router over a fresh
//! in-memory store and small request helpers.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use api_adapters::{build_router, AppState, RouterOptions};
use storage_adapters::MemoryStore;

pub struct TestApp {
    pub store: MemoryStore,
    router: Router,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let state = AppState::new(shared.clone(), shared);
        let router = build_router(state, RouterOptions::default());
        Self { store, router }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    pub async fn developer(&self, name: &str) -> i32 {
        self.store.insert_developer(name, None).await
    }

    /// Uploads a game through the API and returns its id.
    pub async fn upload_game(&self, developer_id: i32, name: &str, price: f64, genre: &[&str]) -> i32 {
        let response = self
            .post(
                "/api/Games",
                json!({
                    "name": name,
                    "price": price,
                    "genre": genre,
                    "developerId": developer_id,
                    "trailerUrl": format!("https://videos.example/{name}.mp4"),
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "upload failed: {:?}", response.body);
        response.body.as_i64().expect("id in body") as i32
    }

    /// Creates a purchase through the API and returns its id.
    pub async fn purchase(&self, user_id: i32, game_ids: &[i32]) -> i32 {
        let items: Vec<Value> = game_ids.iter().map(|id| json!({ "gameId": id })).collect();
        let response = self
            .post("/api/Purchases", json!({ "userId": user_id, "purchaseItems": items }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "purchase failed: {:?}", response.body);
        response.body["id"].as_i64().expect("id in body") as i32
    }
}

/// Ids of the games in a JSON list of game DTOs.
pub fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .expect("list body")
        .iter()
        .map(|g| g["id"].as_i64().expect("game id"))
        .collect()
}
