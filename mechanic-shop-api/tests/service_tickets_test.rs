//! Integration tests for the service ticket endpoints
//!
//! - Mechanic membership: assign, remove, bulk edit
//! - Parts consumption
//! - Customer-scoped lookup with bearer tokens
//! - Rate limits and the cached ticket list

mod common;

use axum::http::{Method, StatusCode};
use common::{mechanic_ids, TestContext, JWT_SECRET};
use mechanic_shop_api::config::Config;
use mechanic_shop_shared::auth::jwt::issue_token;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_assign_mechanic_twice() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let mechanic = ctx.create_mechanic("Alice").await;

    let uri = format!("/service-tickets/{}/assign-mechanic/{}", ticket, mechanic);

    let first = ctx.put(&uri, None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(mechanic_ids(&first.json()), vec![mechanic]);
    assert!(first.headers.get("X-RateLimit-Remaining").is_some());

    let second = ctx.put(&uri, None).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.json()["error"], "precondition_failed");
    assert_eq!(
        second.json()["message"],
        "Mechanic already assigned to this ticket."
    );
}

#[tokio::test]
async fn test_assign_unknown_ids() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let mechanic = ctx.create_mechanic("Alice").await;

    let response = ctx
        .put(&format!("/service-tickets/999/assign-mechanic/{}", mechanic), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "Service ticket not found.");

    let response = ctx
        .put(&format!("/service-tickets/{}/assign-mechanic/999", ticket), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "Mechanic not found.");
}

#[tokio::test]
async fn test_remove_mechanic() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let mechanic = ctx.create_mechanic("Alice").await;

    let remove = format!("/service-tickets/{}/remove-mechanic/{}", ticket, mechanic);

    let response = ctx.put(&remove, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        "Mechanic is not assigned to this ticket."
    );

    ctx.put(
        &format!("/service-tickets/{}/assign-mechanic/{}", ticket, mechanic),
        None,
    )
    .await;

    let response = ctx.put(&remove, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(mechanic_ids(&response.json()).is_empty());
}

#[tokio::test]
async fn test_bulk_edit_add_then_remove() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let a = ctx.create_mechanic("Alice").await;
    let b = ctx.create_mechanic("Bob").await;
    let uri = format!("/service-tickets/{}/edit", ticket);

    let response = ctx
        .put(
            &uri,
            Some(json!({ "add_mechanic_ids": [a, b, a, 999], "remove_mechanic_ids": [] })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(mechanic_ids(&response.json()), vec![a, b]);

    let response = ctx
        .put(
            &uri,
            Some(json!({ "add_mechanic_ids": [], "remove_mechanic_ids": [a, b] })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(mechanic_ids(&response.json()).is_empty());
    assert!(response.json()["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_edit_rejects_bad_payloads() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let uri = format!("/service-tickets/{}/edit", ticket);

    let response = ctx
        .put(&uri, Some(json!({ "add_mechanic_ids": "not a list" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "bad_request");

    let response = ctx.put(&uri, Some(json!({ "add_mechanic_ids": [1] }))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "validation_error");
    assert_eq!(response.json()["details"][0]["field"], "remove_mechanic_ids");

    let response = ctx
        .put(
            "/service-tickets/999/edit",
            Some(json!({ "add_mechanic_ids": [], "remove_mechanic_ids": [] })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_part_to_ticket() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let item = ctx.create_item("brake pad", 45.5).await;

    let response = ctx
        .put(
            &format!("/service-tickets/add-part/{}/to-ticket/{}", item, ticket),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx
        .put(
            &format!(
                "/service-tickets/add-part/{}/to-ticket/{}?quantity=4",
                item, ticket
            ),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let view = response.json();
    let items = view["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], item);
    assert_eq!(items[0]["name"], "brake pad");
    assert_eq!(items[0]["price"], 45.5);
    assert_eq!(items[0]["quantity"], 1);
    assert_eq!(items[1]["quantity"], 4);

    let fetched = ctx.get(&format!("/service-tickets/{}", ticket)).await;
    assert_eq!(fetched.json(), view);
}

#[tokio::test]
async fn test_add_part_errors() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let item = ctx.create_item("brake pad", 45.5).await;

    let response = ctx
        .put(
            &format!(
                "/service-tickets/add-part/{}/to-ticket/{}?quantity=0",
                item, ticket
            ),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"][0]["field"], "quantity");

    let response = ctx
        .put(&format!("/service-tickets/add-part/999/to-ticket/{}", ticket), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "Item not found.");

    let response = ctx
        .put(&format!("/service-tickets/add-part/{}/to-ticket/999", item), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_tickets_with_login_token() {
    let ctx = TestContext::new();
    let alice = ctx.create_customer("alice@email.com").await;
    let bob = ctx.create_customer("bob@email.com").await;
    let first = ctx.create_ticket(alice).await;
    let second = ctx.create_ticket(alice).await;
    ctx.create_ticket(bob).await;

    let token = ctx.login("alice@email.com").await;
    let response = ctx
        .request(Method::GET, "/service-tickets/my-tickets", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let ids: Vec<i64> = response
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_my_tickets_rejects_bad_tokens() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    ctx.create_ticket(customer).await;

    let response = ctx.get("/service-tickets/my-tickets").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx
        .request(Method::GET, "/service-tickets/my-tickets", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let expired = issue_token(customer, -120, JWT_SECRET).unwrap();
    let response = ctx
        .request(Method::GET, "/service-tickets/my-tickets", None, Some(&expired))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["message"], "Token expired");

    let forged = issue_token(customer, 3600, "another-secret-that-is-32-bytes-long!").unwrap();
    let response = ctx
        .request(Method::GET, "/service-tickets/my-tickets", None, Some(&forged))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_tickets_none() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;

    let token = issue_token(customer, 3600, JWT_SECRET).unwrap();
    let response = ctx
        .request(Method::GET, "/service-tickets/my-tickets", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "No tickets associated with you");
}

#[tokio::test]
async fn test_third_delete_is_rate_limited() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;

    let response = ctx.delete(&format!("/service-tickets/{}", ticket)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["message"],
        format!("Ticket id: {}, successfully deleted.", ticket)
    );

    let response = ctx.delete("/service-tickets/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.delete("/service-tickets/998").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json()["error"], "rate_limit_exceeded");
    assert!(response.headers.get("Retry-After").is_some());

    // other routes keep their own counters
    let response = ctx.get("/service-tickets/999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_delete_quota_resets_after_window() {
    let ctx = TestContext::new();

    for _ in 0..2 {
        assert_eq!(ctx.delete("/service-tickets/999").await.status, StatusCode::NOT_FOUND);
    }
    assert_eq!(
        ctx.delete("/service-tickets/999").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    tokio::time::advance(Duration::from_secs(3600)).await;

    assert_eq!(ctx.delete("/service-tickets/999").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ticket_list_served_from_cache() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    ctx.create_ticket(customer).await;

    let first = ctx.get("/service-tickets/").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json().as_array().unwrap().len(), 1);

    // a write inside the window is not visible yet
    ctx.create_ticket(customer).await;

    let second = ctx.get("/service-tickets").await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_ticket_list_refreshes_after_ttl() {
    let mut config = Config::local(JWT_SECRET);
    config.policy.ticket_list_ttl = Duration::from_secs(1);
    let ctx = TestContext::with_config(config);
    let customer = ctx.create_customer("test@email.com").await;

    let empty = ctx.get("/service-tickets/").await;
    assert_eq!(empty.json(), json!([]));

    ctx.create_ticket(customer).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let fresh = ctx.get("/service-tickets/").await;
    assert_eq!(fresh.json().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_ticket_partial() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;

    let response = ctx
        .put(
            &format!("/service-tickets/{}", ticket),
            Some(json!({ "service_description": "Replace brake pads" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let view = response.json();
    assert_eq!(view["service_description"], "Replace brake pads");
    assert_eq!(view["vin"], "111111111111111");
    assert_eq!(view["service_date"], "2025-12-21");
}

#[tokio::test]
async fn test_create_ticket_validation() {
    let ctx = TestContext::new();

    let response = ctx
        .post("/service-tickets", json!({ "vin": "111111111111111" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "validation_error");

    let response = ctx
        .post(
            "/service-tickets",
            json!({
                "vin": "111111111111111",
                "service_date": "2025-12-21",
                "service_description": "oil change",
                "customer_id": 42
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.json()["message"],
        "Customer not found. Please provide a valid customer_id."
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_assigns_admit_one() {
    let ctx = TestContext::new();
    let customer = ctx.create_customer("test@email.com").await;
    let ticket = ctx.create_ticket(customer).await;
    let mechanic = ctx.create_mechanic("Alice").await;
    let uri = format!("/service-tickets/{}/assign-mechanic/{}", ticket, mechanic);

    let responses =
        futures::future::join_all((0..8).map(|_| ctx.put(&uri, None))).await;

    let ok = responses
        .iter()
        .filter(|r| r.status == StatusCode::OK)
        .count();
    let rejected = responses
        .iter()
        .filter(|r| r.status == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!((ok, rejected), (1, 7));

    let view = ctx.get(&format!("/service-tickets/{}", ticket)).await.json();
    assert_eq!(mechanic_ids(&view), vec![mechanic]);
}

#[tokio::test]
async fn test_non_numeric_ids_are_json_bad_requests() {
    let ctx = TestContext::new();

    for (method, uri) in [
        (Method::PUT, "/service-tickets/abc/assign-mechanic/1"),
        (Method::PUT, "/service-tickets/1/remove-mechanic/abc"),
        (Method::PUT, "/service-tickets/add-part/abc/to-ticket/1"),
        (Method::GET, "/service-tickets/abc"),
        (Method::DELETE, "/service-tickets/abc"),
    ] {
        let response = ctx.request(method, uri, None, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.headers["content-type"], "application/json", "{}", uri);
        assert_eq!(response.json()["error"], "bad_request", "{}", uri);
        assert!(response.json()["message"].as_str().is_some(), "{}", uri);
    }
}
