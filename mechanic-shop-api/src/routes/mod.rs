/// API route handlers
///
/// Handlers are organized by resource, each module exposing a `router`
/// with full paths:
///
/// - `health`: Health check endpoint
/// - `customers`: Customer CRUD and login
/// - `mechanics`: Mechanic CRUD and the most-worked ranking
/// - `items`: Inventory CRUD
/// - `service_tickets`: Ticket CRUD, membership and parts endpoints

pub mod customers;
pub mod health;
pub mod items;
pub mod mechanics;
pub mod service_tickets;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::rate_limit::RouteLimit,
};
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path},
    Json,
};
use mechanic_shop_shared::policy::Quota;
use serde::{Deserialize, Serialize};

/// Body of a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Path parameters whose parse failures render as JSON `bad_request` errors
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct IdPath<T>(pub T);

/// Unwraps a JSON body, turning a rejection into a 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = payload?;
    Ok(value)
}

/// Binds a quota to a named route on the shared limiter
pub(crate) fn route_limit(state: &AppState, route: &'static str, quota: Quota) -> RouteLimit {
    RouteLimit::new(state.limiter.clone(), route, quota)
}
