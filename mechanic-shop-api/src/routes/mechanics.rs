/// Mechanic endpoints
///
/// - `POST /mechanics`, `GET /mechanics`
/// - `GET|PUT|DELETE /mechanics/:mechanic_id`
/// - `GET /mechanics/most-worked` - Mechanics ranked by ticket count

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{json_body, IdPath, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use mechanic_shop_shared::models::{Mechanic, MechanicPatch, MechanicPayload, MechanicWorkload};

pub fn router() -> Router<AppState> {
    let collection = get(list_mechanics).post(create_mechanic);

    Router::new()
        .route("/mechanics", collection.clone())
        .route("/mechanics/", collection)
        .route("/mechanics/most-worked", get(most_worked))
        .route(
            "/mechanics/:mechanic_id",
            get(get_mechanic).put(update_mechanic).delete(delete_mechanic),
        )
}

pub async fn create_mechanic(
    State(state): State<AppState>,
    payload: Result<Json<MechanicPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Mechanic>)> {
    let mechanic = state.resources.create_mechanic(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(mechanic)))
}

pub async fn list_mechanics(State(state): State<AppState>) -> ApiResult<Json<Vec<Mechanic>>> {
    Ok(Json(state.resources.list_mechanics().await?))
}

pub async fn get_mechanic(
    State(state): State<AppState>,
    IdPath(mechanic_id): IdPath<i64>,
) -> ApiResult<Json<Mechanic>> {
    Ok(Json(state.resources.get_mechanic(mechanic_id).await?))
}

pub async fn update_mechanic(
    State(state): State<AppState>,
    IdPath(mechanic_id): IdPath<i64>,
    payload: Result<Json<MechanicPatch>, JsonRejection>,
) -> ApiResult<Json<Mechanic>> {
    let mechanic = state
        .resources
        .update_mechanic(mechanic_id, json_body(payload)?)
        .await?;
    Ok(Json(mechanic))
}

pub async fn delete_mechanic(
    State(state): State<AppState>,
    IdPath(mechanic_id): IdPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.resources.delete_mechanic(mechanic_id).await?;
    Ok(MessageResponse::new(format!(
        "Mechanic id: {}, successfully deleted.",
        mechanic_id
    )))
}

/// Busiest mechanics first; mechanics without tickets are omitted
pub async fn most_worked(State(state): State<AppState>) -> ApiResult<Json<Vec<MechanicWorkload>>> {
    Ok(Json(state.workload.most_worked_mechanics().await?))
}
