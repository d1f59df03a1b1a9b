use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    error::AppError,
    model::{NewTodo, ObjectId},
    schema::CreateTodoSchema,
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler(
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    const MESSAGE: &str = "Todo API with Rust, SQLx and Axum";

    data.store.ping().await.map_err(AppError::Unavailable)?;

    let json_response = json!({
        "status": "success",
        "message": MESSAGE
    });

    Ok(Json(json_response))
}

// Handler for getting all Todo items
pub async fn get_todos(State(data): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let todos = data.store.list_all().await?;
    tracing::debug!(count = todos.len(), "listed todos");

    Ok((StatusCode::OK, Json(todos)))
}

// Handler for creating a new Todo
pub async fn create_todo(
    State(data): State<Arc<AppState>>,
    payload: Result<Json<CreateTodoSchema>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected create payload");
        AppError::InvalidRequest
    })?;

    let body = match payload.body {
        Some(body) if !body.is_empty() => body,
        _ => return Err(AppError::BodyRequired),
    };

    let todo = data.store.insert(NewTodo::new(body)).await?;
    tracing::info!(id = %todo.id, "created todo");

    Ok((StatusCode::CREATED, Json(todo)))
}

// Handler for deleting a Todo by ID
pub async fn delete_todo(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    data.store.delete_by_id(&id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "msg": "todo deleted"})),
    ))
}

// Handler for marking a Todo as completed. This is not a general patch:
// the request body is ignored and `completed` is always set to true.
pub async fn update_todo(
    Path(id): Path<String>,
    State(data): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    data.store.mark_complete(&id).await?;
    tracing::info!(%id, "marked todo complete");

    Ok((
        StatusCode::OK,
        Json(json!({"success": true, "msg": "todo updated"})),
    ))
}

fn parse_id(raw: &str) -> Result<ObjectId, AppError> {
    raw.parse().map_err(|_| AppError::InvalidId)
}
