//! crates/math_tutor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{ChatMode, ChatTurn, ImageUpload, NewProblem, ProblemRecord, RecordId, TopicCount};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Completion Request Types
//=========================================================================================

/// The output shape requested from a completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// The provider must answer with a single JSON object.
    Json,
}

/// A single provider-neutral completion call: a system instruction followed by
/// the full turn sequence. Providers are treated as stateless, so every call
/// carries the whole conversation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub turns: Vec<ChatTurn>,
    pub temperature: f32,
    pub format: ResponseFormat,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Returns the full textual and mathematical content of an image.
    /// An empty string means the image held nothing readable.
    async fn extract_text(&self, image: &ImageUpload) -> PortResult<String>;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Runs one text-generation call and returns the raw generated text.
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Checks that the backing store is reachable.
    async fn ping(&self) -> PortResult<()>;

    /// Persists a new record with a server-assigned id and timestamp.
    async fn insert(&self, problem: NewProblem) -> PortResult<ProblemRecord>;

    /// Returns at most `limit` records for the user, newest first.
    async fn list_recent(&self, user_id: &str, limit: usize) -> PortResult<Vec<ProblemRecord>>;

    /// Returns the record only if it belongs to `user_id`. A record owned by
    /// someone else is reported exactly like a missing one.
    async fn get(&self, id: RecordId, user_id: &str) -> PortResult<ProblemRecord>;

    /// Replaces one transcript wholesale, leaving the other untouched.
    async fn update_chat(
        &self,
        id: RecordId,
        user_id: &str,
        mode: ChatMode,
        turns: Vec<ChatTurn>,
    ) -> PortResult<()>;

    /// Empties both transcripts.
    async fn clear_chat(&self, id: RecordId, user_id: &str) -> PortResult<()>;

    async fn set_topic(&self, id: RecordId, topic: &str) -> PortResult<()>;

    /// Counts the user's records per non-null topic, descending by count.
    async fn topic_counts(&self, user_id: &str) -> PortResult<Vec<TopicCount>>;
}
