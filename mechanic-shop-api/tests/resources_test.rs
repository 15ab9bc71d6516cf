//! Integration tests for customers, mechanics, inventory and health
//!
//! Also covers the most-worked ranking, which reads the membership set
//! written through the ticket endpoints.

mod common;

use axum::http::StatusCode;
use common::{id_of, TestContext};
use serde_json::{json, Value};

fn ranking(body: &Value) -> Vec<(i64, i64)> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["id"].as_i64().unwrap(),
                entry["ticket_count"].as_i64().unwrap(),
            )
        })
        .collect()
}

async fn assign(ctx: &TestContext, ticket: i64, mechanic: i64) {
    let response = ctx
        .put(
            &format!("/service-tickets/{}/assign-mechanic/{}", ticket, mechanic),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");
    assert_eq!(response.json()["store"], "connected");
    assert_eq!(response.headers["X-Content-Type-Options"], "nosniff");
}

#[tokio::test]
async fn test_customer_crud() {
    let ctx = TestContext::new();
    let id = ctx.create_customer("test@email.com").await;

    let response = ctx.get(&format!("/customers/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email"], "test@email.com");
    assert!(response.json().get("password_hash").is_none());
    assert!(response.json().get("password").is_none());

    let response = ctx
        .put(&format!("/customers/{}", id), Some(json!({ "name": "renamed" })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "renamed");
    assert_eq!(response.json()["phone"], "555-555-5555");

    let response = ctx.get("/customers/").await;
    assert_eq!(response.json().as_array().unwrap().len(), 1);

    let response = ctx.delete(&format!("/customers/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["message"],
        format!("Customer id: {}, successfully deleted.", id)
    );

    let response = ctx.get(&format!("/customers/{}", id)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    ctx.create_customer("test@email.com").await;

    let response = ctx
        .post(
            "/customers",
            json!({
                "name": "other",
                "email": "test@email.com",
                "phone": "555",
                "password": "pw"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["error"], "conflict");
}

#[tokio::test]
async fn test_customer_validation_errors() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/customers", json!({ "name": "test_user", "email": "not-an-email" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let fields: Vec<String> = response.json()["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_string())
        .collect();
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"phone".to_string()));
    assert!(fields.contains(&"password".to_string()));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx
        .request(
            axum::http::Method::POST,
            "/inventory",
            Some(json!("not an object")),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "bad_request");
}

#[tokio::test]
async fn test_customer_with_tickets_cannot_be_deleted() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    ctx.create_ticket(customer).await;

    let response = ctx.delete(&format!("/customers/{}", customer)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx.get(&format!("/customers/{}", customer)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login() {
    let ctx = TestContext::new();
    ctx.create_customer("test@email.com").await;

    let response = ctx
        .post(
            "/customers/login",
            json!({ "email": "test@email.com", "password": "test" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "success");
    assert!(response.json()["auth_token"].as_str().is_some());

    let response = ctx
        .post(
            "/customers/login",
            json!({ "email": "test@email.com", "password": "wrong" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["message"], "Invalid email or password.");

    let response = ctx
        .post(
            "/customers/login",
            json!({ "email": "nobody@email.com", "password": "test" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mechanic_crud() {
    let ctx = TestContext::new();
    let id = ctx.create_mechanic("Alice").await;

    let response = ctx
        .put(&format!("/mechanics/{}", id), Some(json!({ "salary": 61000.0 })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["salary"], 61000.0);
    assert_eq!(response.json()["email"], "alice@shop.test");

    let response = ctx
        .post(
            "/mechanics",
            json!({
                "name": "Alice Again",
                "email": "alice@shop.test",
                "address": "1 Bay",
                "phone": "555",
                "salary": 1.0
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx.delete(&format!("/mechanics/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["message"],
        format!("Mechanic id: {}, successfully deleted.", id)
    );

    let response = ctx.delete(&format!("/mechanics/{}", id)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_crud_and_restricted_delete() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let used = ctx.create_item("brake pad", 45.5).await;
    let unused = ctx.create_item("wiper", 12.0).await;

    let response = ctx.get("/inventory").await;
    assert_eq!(response.json().as_array().unwrap().len(), 2);

    let response = ctx
        .put(&format!("/inventory/{}", unused), Some(json!({ "price": 14.25 })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["price"], 14.25);

    ctx.put(
        &format!("/service-tickets/add-part/{}/to-ticket/{}", used, ticket),
        None,
    )
    .await;

    let response = ctx.delete(&format!("/inventory/{}", used)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = ctx.delete(&format!("/inventory/{}", unused)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["message"],
        format!("Item with id: {}, successfully deleted.", unused)
    );
}

#[tokio::test]
async fn test_most_worked_ranking() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let t1 = ctx.create_ticket(customer).await;
    let t2 = ctx.create_ticket(customer).await;
    let t3 = ctx.create_ticket(customer).await;

    let a = ctx.create_mechanic("Alice").await;
    let b = ctx.create_mechanic("Bob").await;
    let c = ctx.create_mechanic("Carol").await;
    ctx.create_mechanic("Idle").await;

    for ticket in [t1, t2, t3] {
        assign(&ctx, ticket, a).await;
    }
    assign(&ctx, t1, b).await;
    assign(&ctx, t1, c).await;
    assign(&ctx, t2, c).await;

    let response = ctx.get("/mechanics/most-worked").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ranking(&response.json()), vec![(a, 3), (c, 2), (b, 1)]);
    assert_eq!(response.json()[0]["name"], "Alice");
}

#[tokio::test]
async fn test_ticket_delete_drops_workload() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let t1 = ctx.create_ticket(customer).await;
    let t2 = ctx.create_ticket(customer).await;
    let a = ctx.create_mechanic("Alice").await;

    assign(&ctx, t1, a).await;
    assign(&ctx, t2, a).await;

    let response = ctx.delete(&format!("/service-tickets/{}", t1)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.get("/mechanics/most-worked").await;
    assert_eq!(ranking(&response.json()), vec![(a, 1)]);
}

#[tokio::test]
async fn test_most_worked_empty() {
    let ctx = TestContext::new();
    let id = ctx.create_mechanic("Alice").await;
    assert!(id > 0);

    let response = ctx.get("/mechanics/most-worked").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!([]));
}

#[tokio::test]
async fn test_created_entities_get_ids() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/inventory", json!({ "name": "oil filter", "price": 9.99 }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let first = id_of(&response);

    let second = ctx.create_item("air filter", 19.99).await;
    assert!(second > first);
}

#[tokio::test]
async fn test_non_numeric_ids_are_json_bad_requests() {
    let ctx = TestContext::new();

    for uri in ["/customers/abc", "/mechanics/1.5", "/inventory/x"] {
        let response = ctx.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.json()["error"], "bad_request", "{}", uri);
    }

    let response = ctx
        .put("/customers/abc", Some(json!({ "name": "renamed" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "bad_request");
}
