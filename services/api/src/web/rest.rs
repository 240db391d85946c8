//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the stateless REST endpoints (status,
//! extraction, calculation, chat, dashboard) and the master definition for
//! the OpenAPI specification.

use crate::adapters::vision::media_type_for;
use crate::error::ApiError;
use crate::web::extract::{ApiJson, ApiQuery};
use crate::web::history;
use crate::web::protocol::{
    parse_mode, turns_from_wire, CalculateRequest, CalculateResponse, ChatMessage, ChatRequest,
    ChatResponse, ExtractResponse, HistoryRecord, MessageResponse, SaveHistoryRequest,
    SaveHistoryResponse, StatusResponse, TopicCountResponse, UpdateChatRequest, UserQuery,
    WireChatTurn, WirePart,
};
use crate::web::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
};
use math_tutor_core::{text, ImageUpload};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        status_handler,
        extract_handler,
        calculate_handler,
        chat_handler,
        topics_handler,
        history::save_history_handler,
        history::list_history_handler,
        history::get_history_handler,
        history::update_chat_handler,
        history::clear_chat_handler,
    ),
    components(
        schemas(
            StatusResponse,
            ExtractResponse,
            CalculateRequest,
            CalculateResponse,
            ChatRequest,
            ChatResponse,
            WireChatTurn,
            WirePart,
            ChatMessage,
            SaveHistoryRequest,
            SaveHistoryResponse,
            UpdateChatRequest,
            MessageResponse,
            HistoryRecord,
            TopicCountResponse,
        )
    ),
    tags(
        (name = "Math Tutor API", description = "Image extraction, solving, tutoring chat and per-user history.")
    )
)]
pub struct ApiDoc;

/// Rejects a missing or blank `user_id` query parameter.
pub(crate) fn require_user(query: UserQuery) -> Result<String, ApiError> {
    match query.user_id {
        Some(user_id) if !user_id.trim().is_empty() => Ok(user_id.trim().to_string()),
        _ => Err(ApiError::BadRequest("user_id is required".to_string())),
    }
}

/// Keeps only the final path component of a client-supplied file name.
fn safe_basename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check that also reports database reachability.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Server is running", body = StatusResponse))
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let db_status = match state.store.ping().await {
        Ok(()) => "Connected".to_string(),
        Err(e) => format!("Unavailable: {}", e),
    };
    Json(StatusResponse {
        status: "Server is running".to_string(),
        db_status,
    })
}

/// Extract the text and math of an uploaded image.
///
/// Accepts a multipart/form-data request with a single image part.
#[utoipa::path(
    post,
    path = "/api/extract",
    request_body(content_type = "multipart/form-data", description = "The image to read."),
    responses(
        (status = 200, description = "Extracted text, possibly empty", body = ExtractResponse),
        (status = 400, description = "No file in the request"),
        (status = 502, description = "The vision provider failed")
    )
)]
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let media_type = field
            .content_type()
            .filter(|ct| ct.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for(&file_name).to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        upload = Some(ImageUpload {
            file_name,
            media_type,
            bytes: bytes.to_vec(),
        });
        break;
    }
    let upload =
        upload.ok_or_else(|| ApiError::BadRequest("Multipart form must include a file".to_string()))?;

    let config = &state.config;
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let stored_path = config
        .upload_dir
        .join(format!("{}-{}", Uuid::new_v4(), safe_basename(&upload.file_name)));
    tokio::fs::write(&stored_path, &upload.bytes).await?;

    let extracted = state.ocr.extract_text(&upload).await;

    if !config.keep_uploads {
        if let Err(e) = tokio::fs::remove_file(&stored_path).await {
            warn!(path = %stored_path.display(), "Failed to remove upload: {}", e);
        }
    }

    let raw = extracted.map_err(ApiError::upstream)?;
    let equation = text::clean_extracted_text(&raw);
    info!(chars = equation.len(), "Extraction complete");
    Ok(Json(ExtractResponse { equation }))
}

/// Solve a problem and explain the solution.
#[utoipa::path(
    post,
    path = "/api/calculate",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Solution and explanation", body = CalculateResponse),
        (status = 400, description = "Blank equation")
    )
)]
pub async fn calculate_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    if payload.equation.trim().is_empty() {
        return Err(ApiError::BadRequest("equation is required".to_string()));
    }
    let calculation = state.tutor.calculate(&payload.equation).await;
    info!(source = ?calculation.source, "Calculation complete");
    Ok(Json(CalculateResponse {
        solution: calculation.solution,
        explanation: calculation.explanation,
    }))
}

/// One hint or tutor conversation turn.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The tutor's reply", body = ChatResponse),
        (status = 400, description = "Unknown mode or malformed history"),
        (status = 502, description = "The completion provider failed")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let mode = parse_mode(payload.mode.as_deref())?;
    let history = turns_from_wire(payload.history)?;
    info!(user_id = ?payload.user_id, mode = mode.as_str(), turns = history.len(), "Chat request");

    let reply = state
        .tutor
        .chat(mode, &payload.context, &history, &payload.message)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(ChatResponse { reply }))
}

/// Per-topic counts of the user's saved problems.
#[utoipa::path(
    get,
    path = "/api/dashboard/topics",
    params(UserQuery),
    responses(
        (status = 200, description = "Topic histogram, largest first", body = [TopicCountResponse]),
        (status = 400, description = "Missing user_id")
    )
)]
pub async fn topics_handler(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<TopicCountResponse>>, ApiError> {
    let user_id = require_user(query)?;
    let counts = state.store.topic_counts(&user_id).await?;
    Ok(Json(counts.into_iter().map(TopicCountResponse::from).collect()))
}
