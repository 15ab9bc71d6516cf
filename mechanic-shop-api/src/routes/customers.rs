/// Customer endpoints
///
/// - `POST /customers` - Create customer (password stored as argon2 hash)
/// - `GET /customers` - List customers
/// - `GET /customers/:customer_id` - Get customer
/// - `PUT /customers/:customer_id` - Partial update
/// - `DELETE /customers/:customer_id` - Delete (refused while tickets exist)
/// - `POST /customers/login` - Exchange credentials for a bearer token

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::rate_limit::rate_limit_layer,
    routes::{json_body, IdPath, route_limit, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use mechanic_shop_shared::models::{Customer, CustomerPatch, CustomerPayload, LoginPayload};
use serde::{Deserialize, Serialize};

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub message: String,

    /// Bearer token for `/service-tickets/my-tickets`
    pub auth_token: String,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let login_limit = route_limit(state, "login", state.config.policy.quotas.login);
    let collection = get(list_customers).post(create_customer);

    Router::new()
        .route("/customers", collection.clone())
        .route("/customers/", collection)
        .route(
            "/customers/login",
            post(login).route_layer(from_fn_with_state(login_limit, rate_limit_layer)),
        )
        .route(
            "/customers/:customer_id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CustomerPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.resources.create_customer(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.resources.list_customers().await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    IdPath(customer_id): IdPath<i64>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.resources.get_customer(customer_id).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    IdPath(customer_id): IdPath<i64>,
    payload: Result<Json<CustomerPatch>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .resources
        .update_customer(customer_id, json_body(payload)?)
        .await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    IdPath(customer_id): IdPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.resources.delete_customer(customer_id).await?;
    Ok(MessageResponse::new(format!(
        "Customer id: {}, successfully deleted.",
        customer_id
    )))
}

/// Login
///
/// ```text
/// POST /customers/login
/// Content-Type: application/json
///
/// { "email": "test@email.com", "password": "test" }
/// ```
///
/// Wrong email or password → 401.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let auth_token = state.resources.login(json_body(payload)?).await?;

    Ok(Json(LoginResponse {
        status: "success".to_string(),
        message: "Successfully logged in.".to_string(),
        auth_token,
    }))
}
