/// Service ticket endpoints
///
/// # Endpoints
///
/// | Method | Path | Notes |
/// |---|---|---|
/// | POST | `/service-tickets` | rate limited |
/// | GET | `/service-tickets` | served from the response cache |
/// | GET | `/service-tickets/my-tickets` | bearer token |
/// | GET | `/service-tickets/:ticket_id` | |
/// | PUT | `/service-tickets/:ticket_id` | rate limited |
/// | DELETE | `/service-tickets/:ticket_id` | rate limited |
/// | PUT | `/service-tickets/:ticket_id/assign-mechanic/:mechanic_id` | rate limited |
/// | PUT | `/service-tickets/:ticket_id/remove-mechanic/:mechanic_id` | rate limited |
/// | PUT | `/service-tickets/:ticket_id/edit` | `{add_mechanic_ids, remove_mechanic_ids}` |
/// | PUT | `/service-tickets/add-part/:item_id/to-ticket/:ticket_id` | `?quantity=n`, default 1 |
///
/// Every mutating endpoint answers with the full ticket view, mechanics and
/// consumed items nested.

use crate::{
    app::{customer_auth_layer, AppState},
    error::{ApiError, ApiResult},
    middleware::rate_limit::rate_limit_layer,
    routes::{json_body, IdPath, route_limit, MessageResponse},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use bytes::Bytes;
use mechanic_shop_shared::{
    auth::middleware::CustomerIdentity,
    models::{MechanicEdit, TicketPatch, TicketPayload, TicketView},
    ShopError,
};
use serde::Deserialize;
use validator::Validate;

/// Cache key of the serialized ticket list
pub const TICKET_LIST_CACHE_KEY: &str = "service_tickets:list";

/// Query string of the add-part endpoint
#[derive(Debug, Deserialize)]
pub struct AddPartQuery {
    pub quantity: Option<i64>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let quotas = &state.config.policy.quotas;
    let create_limit = route_limit(state, "create_ticket", quotas.create_ticket);
    let update_limit = route_limit(state, "update_ticket", quotas.update_ticket);
    let delete_limit = route_limit(state, "delete_ticket", quotas.delete_ticket);
    let assign_limit = route_limit(state, "assign_mechanic", quotas.assign_mechanic);
    let remove_limit = route_limit(state, "remove_mechanic", quotas.remove_mechanic);

    let collection = get(list_tickets).merge(
        post(create_ticket).route_layer(from_fn_with_state(create_limit, rate_limit_layer)),
    );

    let single = get(get_ticket)
        .merge(put(update_ticket).route_layer(from_fn_with_state(update_limit, rate_limit_layer)))
        .merge(
            delete(delete_ticket).route_layer(from_fn_with_state(delete_limit, rate_limit_layer)),
        );

    Router::new()
        .route("/service-tickets", collection.clone())
        .route("/service-tickets/", collection)
        .route(
            "/service-tickets/my-tickets",
            get(my_tickets).route_layer(from_fn_with_state(state.clone(), customer_auth_layer)),
        )
        .route("/service-tickets/:ticket_id", single)
        .route(
            "/service-tickets/:ticket_id/assign-mechanic/:mechanic_id",
            put(assign_mechanic).route_layer(from_fn_with_state(assign_limit, rate_limit_layer)),
        )
        .route(
            "/service-tickets/:ticket_id/remove-mechanic/:mechanic_id",
            put(remove_mechanic).route_layer(from_fn_with_state(remove_limit, rate_limit_layer)),
        )
        .route("/service-tickets/:ticket_id/edit", put(edit_mechanics))
        .route(
            "/service-tickets/add-part/:item_id/to-ticket/:ticket_id",
            put(add_part),
        )
}

pub async fn create_ticket(
    State(state): State<AppState>,
    payload: Result<Json<TicketPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TicketView>)> {
    let ticket = state.resources.create_ticket(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Ticket list behind the response cache
///
/// Within one TTL window every caller receives the same bytes; writes in
/// the meantime are not reflected until the entry expires.
pub async fn list_tickets(State(state): State<AppState>) -> ApiResult<Response> {
    let resources = state.resources.clone();

    let body = state
        .cache
        .get_or_load(TICKET_LIST_CACHE_KEY, async move {
            let views = resources.list_ticket_views().await?;
            serde_json::to_vec(&views)
                .map(Bytes::from)
                .map_err(|e| ShopError::Internal(format!("Failed to serialize tickets: {}", e)))
        })
        .await?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

/// Tickets of the authenticated customer
pub async fn my_tickets(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<Json<Vec<TicketView>>> {
    let tickets = state
        .resources
        .list_tickets_for_customer(identity.customer_id)
        .await?;
    Ok(Json(tickets))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    IdPath(ticket_id): IdPath<i64>,
) -> ApiResult<Json<TicketView>> {
    Ok(Json(state.resources.get_ticket(ticket_id).await?))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    IdPath(ticket_id): IdPath<i64>,
    payload: Result<Json<TicketPatch>, JsonRejection>,
) -> ApiResult<Json<TicketView>> {
    let ticket = state
        .resources
        .update_ticket(ticket_id, json_body(payload)?)
        .await?;
    Ok(Json(ticket))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    IdPath(ticket_id): IdPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.resources.delete_ticket(ticket_id).await?;
    Ok(MessageResponse::new(format!(
        "Ticket id: {}, successfully deleted.",
        ticket_id
    )))
}

pub async fn assign_mechanic(
    State(state): State<AppState>,
    IdPath((ticket_id, mechanic_id)): IdPath<(i64, i64)>,
) -> ApiResult<Json<TicketView>> {
    Ok(Json(state.engine.assign_mechanic(ticket_id, mechanic_id).await?))
}

pub async fn remove_mechanic(
    State(state): State<AppState>,
    IdPath((ticket_id, mechanic_id)): IdPath<(i64, i64)>,
) -> ApiResult<Json<TicketView>> {
    Ok(Json(state.engine.remove_mechanic(ticket_id, mechanic_id).await?))
}

/// Bulk membership edit
///
/// ```text
/// PUT /service-tickets/1/edit
///
/// { "add_mechanic_ids": [2, 3], "remove_mechanic_ids": [4] }
/// ```
///
/// Both lists are required (either may be empty).
pub async fn edit_mechanics(
    State(state): State<AppState>,
    IdPath(ticket_id): IdPath<i64>,
    payload: Result<Json<MechanicEdit>, JsonRejection>,
) -> ApiResult<Json<TicketView>> {
    let edit = json_body(payload)?;
    edit.validate().map_err(ShopError::from)?;

    Ok(Json(state.engine.bulk_edit_mechanics(ticket_id, &edit).await?))
}

pub async fn add_part(
    State(state): State<AppState>,
    IdPath((item_id, ticket_id)): IdPath<(i64, i64)>,
    query: Result<Query<AddPartQuery>, QueryRejection>,
) -> ApiResult<Json<TicketView>> {
    let Query(query) = query.map_err(ApiError::from)?;
    let quantity = query.quantity.unwrap_or(1);

    Ok(Json(
        state.engine.attach_item(ticket_id, item_id, quantity).await?,
    ))
}
