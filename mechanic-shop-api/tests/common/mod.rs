//! Common test utilities for integration tests
//!
//! Every test gets its own router on a fresh in-memory store, so the
//! limiter counters and the response cache start empty. Requests are
//! driven through the router in process with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use mechanic_shop_api::app::{build_router, AppState};
use mechanic_shop_api::config::Config;
use mechanic_shop_shared::store::memory::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Response captured for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Test context containing the router and its configuration
pub struct TestContext {
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Default policies on an empty in-memory store
    pub fn new() -> Self {
        Self::with_config(Config::local(JWT_SECRET))
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(Arc::new(InMemoryStore::new()), config.clone());
        Self {
            app: build_router(state),
            config,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(Method::PUT, uri, body, None).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, None).await
    }

    /// Creates a customer with password "test" and returns its id
    pub async fn create_customer(&self, email: &str) -> i64 {
        let response = self
            .post(
                "/customers",
                json!({
                    "name": "test_user",
                    "email": email,
                    "phone": "555-555-5555",
                    "password": "test"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        id_of(&response)
    }

    pub async fn create_mechanic(&self, name: &str) -> i64 {
        let response = self
            .post(
                "/mechanics",
                json!({
                    "name": name,
                    "email": format!("{}@shop.test", name.to_lowercase()),
                    "address": "123 Garage Lane",
                    "phone": "555-123-4567",
                    "salary": 55000.0
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        id_of(&response)
    }

    pub async fn create_item(&self, name: &str, price: f64) -> i64 {
        let response = self
            .post("/inventory", json!({ "name": name, "price": price }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        id_of(&response)
    }

    pub async fn create_ticket(&self, customer_id: i64) -> i64 {
        let response = self
            .post(
                "/service-tickets",
                json!({
                    "vin": "111111111111111",
                    "service_date": "2025-12-21",
                    "service_description": "test_ticket_description",
                    "customer_id": customer_id
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
        id_of(&response)
    }

    /// Logs in with password "test" and returns the bearer token
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post("/customers/login", json!({ "email": email, "password": "test" }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());
        response.json()["auth_token"]
            .as_str()
            .map(str::to_string)
            .unwrap()
    }
}

pub fn id_of(response: &TestResponse) -> i64 {
    response.json()["id"].as_i64().unwrap()
}

/// Mechanic ids of a ticket view, in membership order
pub fn mechanic_ids(ticket: &Value) -> Vec<i64> {
    ticket["mechanics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}
