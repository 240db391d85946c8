//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged over the REST API and their
//! conversions to and from the core domain types.

use math_tutor_core::{ChatMode, ChatRole, ChatTurn, PortError, PortResult, ProblemRecord, TopicCount};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Chat Turns
//=========================================================================================

/// One piece of a provider-style `parts` array.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum WirePart {
    Text(String),
    Object { text: String },
}

impl WirePart {
    fn into_text(self) -> String {
        match self {
            WirePart::Text(text) | WirePart::Object { text } => text,
        }
    }
}

/// A chat turn as sent by clients. Either `content` or `parts` carries the text.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WireChatTurn {
    /// `user`, `assistant`, or `model` (read as `assistant`).
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<WirePart>>,
}

impl WireChatTurn {
    pub fn into_domain(self) -> PortResult<ChatTurn> {
        let role = self.role.parse::<ChatRole>()?;
        let content = match (self.content, self.parts) {
            (Some(content), _) => content,
            (None, Some(parts)) => parts
                .into_iter()
                .map(WirePart::into_text)
                .collect::<Vec<_>>()
                .join("\n"),
            (None, None) => {
                return Err(PortError::InvalidInput(
                    "Chat turn needs either content or parts".to_string(),
                ))
            }
        };
        Ok(ChatTurn { role, content })
    }
}

pub fn turns_from_wire(turns: Vec<WireChatTurn>) -> PortResult<Vec<ChatTurn>> {
    turns.into_iter().map(WireChatTurn::into_domain).collect()
}

/// A chat turn as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Reads an optional mode string, falling back to tutor.
pub fn parse_mode(mode: Option<&str>) -> PortResult<ChatMode> {
    match mode {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<ChatMode>(),
        _ => Ok(ChatMode::default()),
    }
}

//=========================================================================================
// Query Parameters
//=========================================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// The owner of the records being read or changed.
    pub user_id: Option<String>,
}

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CalculateRequest {
    #[serde(default)]
    pub equation: String,
}

/// A problem to store. Any `mode_used` sent by the client is ignored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveHistoryRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub equation: String,
    pub solution: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateChatRequest {
    #[serde(default)]
    pub chat_history: Vec<WireChatTurn>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub history: Vec<WireChatTurn>,
    #[serde(default)]
    pub message: String,
    pub mode: Option<String>,
    pub user_id: Option<String>,
}

//=========================================================================================
// Response Payloads
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub db_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractResponse {
    pub equation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalculateResponse {
    pub solution: String,
    pub explanation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveHistoryResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

/// A stored problem as rendered to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub equation: String,
    pub solution: Option<String>,
    pub explanation: Option<String>,
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub hint_chat_history: Vec<ChatMessage>,
    pub tutor_chat_history: Vec<ChatMessage>,
    /// `solve` or `hint`.
    pub mode_used: String,
    pub topic: Option<String>,
}

impl From<ProblemRecord> for HistoryRecord {
    fn from(record: ProblemRecord) -> Self {
        Self {
            id: record.id.to_string(),
            timestamp: record.created_at.to_rfc3339(),
            hint_chat_history: record.hint_chat.iter().map(ChatMessage::from).collect(),
            tutor_chat_history: record.tutor_chat.iter().map(ChatMessage::from).collect(),
            mode_used: record.mode_used.as_str().to_string(),
            user_id: record.user_id,
            equation: record.equation,
            solution: record.solution,
            explanation: record.explanation,
            topic: record.topic,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicCountResponse {
    pub topic: String,
    pub count: u64,
}

impl From<TopicCount> for TopicCountResponse {
    fn from(bucket: TopicCount) -> Self {
        Self {
            topic: bucket.topic,
            count: bucket.count,
        }
    }
}
