/// Inventory endpoints
///
/// - `POST /inventory`, `GET /inventory`
/// - `GET|PUT|DELETE /inventory/:item_id`
///
/// An item recorded as consumed on any ticket cannot be deleted (409).

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
use mechanic_shop_shared::models::{Item, ItemPatch, ItemPayload};

pub fn router() -> Router<AppState> {
    let collection = get(list_items).post(create_item);

    Router::new()
        .route("/inventory", collection.clone())
        .route("/inventory/", collection)
        .route(
            "/inventory/:item_id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let item = state.resources.create_item(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.resources.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    IdPath(item_id): IdPath<i64>,
) -> ApiResult<Json<Item>> {
    Ok(Json(state.resources.get_item(item_id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    IdPath(item_id): IdPath<i64>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> ApiResult<Json<Item>> {
    let item = state.resources.update_item(item_id, json_body(payload)?).await?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    IdPath(item_id): IdPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.resources.delete_item(item_id).await?;
    Ok(MessageResponse::new(format!(
        "Item with id: {}, successfully deleted.",
        item_id
    )))
}
