//! services/api/src/web/history.rs
//!
//! Handlers for the per-user problem history. Every read and write is
//! scoped by the `user_id` query parameter; a record owned by someone else
//! answers exactly like a missing one.

use crate::error::ApiError;
use crate::web::extract::{ApiJson, ApiQuery};
use crate::web::protocol::{
    parse_mode, turns_from_wire, HistoryRecord, MessageResponse, SaveHistoryRequest,
    SaveHistoryResponse, UpdateChatRequest, UserQuery,
};
use crate::web::rest::require_user;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use math_tutor_core::{NewProblem, RecordId};
use std::sync::Arc;
use tracing::{info, warn};

/// How many records the history listing returns.
pub const HISTORY_PAGE_SIZE: usize = 20;

fn parse_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|_| ApiError::NotFound)
}

/// Tags a freshly saved record in the background. Failures are only logged.
fn spawn_topic_classification(state: &Arc<AppState>, id: RecordId, equation: String) {
    let store = state.store.clone();
    let tutor = state.tutor.clone();
    tokio::spawn(async move {
        let topic = tutor.classify_topic(&equation).await;
        match store.set_topic(id, &topic).await {
            Ok(()) => info!(%id, %topic, "Record tagged"),
            Err(e) => warn!(%id, "Failed to store topic: {}", e),
        }
    });
}

/// Save a problem to the user's history.
#[utoipa::path(
    post,
    path = "/api/history",
    request_body = SaveHistoryRequest,
    responses(
        (status = 201, description = "Saved", body = SaveHistoryResponse),
        (status = 400, description = "Blank user_id"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn save_history_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SaveHistoryRequest>,
) -> Result<(StatusCode, Json<SaveHistoryResponse>), ApiError> {
    if payload.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }

    let record = state
        .store
        .insert(NewProblem {
            user_id: payload.user_id.trim().to_string(),
            equation: payload.equation,
            solution: payload.solution,
            explanation: payload.explanation,
        })
        .await?;
    info!(id = %record.id, mode = record.mode_used.as_str(), "Saved problem to history");

    spawn_topic_classification(&state, record.id, record.equation.clone());

    Ok((
        StatusCode::CREATED,
        Json(SaveHistoryResponse {
            message: "Saved to History".to_string(),
            id: record.id.to_string(),
        }),
    ))
}

/// List the user's most recent problems, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    params(UserQuery),
    responses(
        (status = 200, description = "Up to 20 records", body = [HistoryRecord]),
        (status = 400, description = "Missing user_id")
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let user_id = require_user(query)?;
    let records = state.store.list_recent(&user_id, HISTORY_PAGE_SIZE).await?;
    Ok(Json(records.into_iter().map(HistoryRecord::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/history/{id}",
    params(("id" = String, Path, description = "Record id"), UserQuery),
    responses(
        (status = 200, description = "The record", body = HistoryRecord),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<HistoryRecord>, ApiError> {
    let user_id = require_user(query)?;
    let id = parse_id(&id)?;
    let record = state.store.get(id, &user_id).await?;
    Ok(Json(HistoryRecord::from(record)))
}

/// Replace one chat transcript of a record. The other transcript is untouched.
#[utoipa::path(
    put,
    path = "/api/history/{id}",
    params(("id" = String, Path, description = "Record id"), UserQuery),
    request_body = UpdateChatRequest,
    responses(
        (status = 200, description = "Chat updated", body = MessageResponse),
        (status = 400, description = "Unknown mode or malformed history"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<UserQuery>,
    ApiJson(payload): ApiJson<UpdateChatRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = require_user(query)?;
    let id = parse_id(&id)?;
    let mode = parse_mode(payload.mode.as_deref())?;
    let turns = turns_from_wire(payload.chat_history)?;

    state.store.update_chat(id, &user_id, mode, turns).await?;
    Ok(Json(MessageResponse {
        message: "Chat updated".to_string(),
    }))
}

/// Empty both chat transcripts of a record.
#[utoipa::path(
    delete,
    path = "/api/history/{id}/chat",
    params(("id" = String, Path, description = "Record id"), UserQuery),
    responses(
        (status = 200, description = "Chat cleared", body = MessageResponse),
        (status = 404, description = "Item not found")
    )
)]
pub async fn clear_chat_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = require_user(query)?;
    let id = parse_id(&id)?;
    state.store.clear_chat(id, &user_id).await?;
    Ok(Json(MessageResponse {
        message: "Chat cleared".to_string(),
    }))
}
