//! crates/math_tutor_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

/// The store-assigned identifier of a problem record.
///
/// Rendered at the boundary in its canonical hyphenated form. Parsing a
/// malformed string yields `PortError::NotFound` so that callers cannot tell
/// a garbage id apart from one that simply does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, PortError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| PortError::NotFound(format!("Record {} not found", raw)))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Who authored a single chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl FromStr for ChatRole {
    type Err = PortError;

    /// Accepts the provider-specific `model` spelling as an assistant turn.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(ChatRole::User),
            "assistant" | "model" => Ok(ChatRole::Assistant),
            other => Err(PortError::InvalidInput(format!("Unknown chat role '{}'", other))),
        }
    }
}

/// One provider-neutral conversational turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Selects which transcript of a record a chat operation targets, and which
/// system instruction the tutor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    Hint,
    #[default]
    Tutor,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Hint => "hint",
            ChatMode::Tutor => "tutor",
        }
    }
}

impl FromStr for ChatMode {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hint" => Ok(ChatMode::Hint),
            "tutor" => Ok(ChatMode::Tutor),
            other => Err(PortError::InvalidInput(format!("Unknown chat mode '{}'", other))),
        }
    }
}

/// How a record was produced: solved outright, or saved for hint-driven work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    Solve,
    Hint,
}

impl SolveMode {
    /// A record with a non-blank solution was solved; anything else is a hint session.
    pub fn for_solution(solution: Option<&str>) -> Self {
        match solution {
            Some(s) if !s.trim().is_empty() => SolveMode::Solve,
            _ => SolveMode::Hint,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveMode::Solve => "solve",
            SolveMode::Hint => "hint",
        }
    }
}

impl FromStr for SolveMode {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solve" => Ok(SolveMode::Solve),
            "hint" => Ok(SolveMode::Hint),
            other => Err(PortError::Unexpected(format!("Unknown solve mode '{}'", other))),
        }
    }
}

/// A persisted problem with its solution and both chat transcripts.
#[derive(Debug, Clone)]
pub struct ProblemRecord {
    pub id: RecordId,
    pub user_id: String,
    pub equation: String,
    pub solution: Option<String>,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub hint_chat: Vec<ChatTurn>,
    pub tutor_chat: Vec<ChatTurn>,
    pub mode_used: SolveMode,
    pub topic: Option<String>,
}

impl ProblemRecord {
    /// Builds a fresh record from an insert payload. The id and timestamp are
    /// always assigned here, never taken from the caller.
    pub fn from_new(new: NewProblem) -> Self {
        let mode_used = SolveMode::for_solution(new.solution.as_deref());
        Self {
            id: RecordId::new(),
            user_id: new.user_id,
            equation: new.equation,
            solution: new.solution,
            explanation: new.explanation,
            created_at: Utc::now(),
            hint_chat: Vec::new(),
            tutor_chat: Vec::new(),
            mode_used,
            topic: None,
        }
    }
}

/// The insert payload for a problem record.
#[derive(Debug, Clone)]
pub struct NewProblem {
    pub user_id: String,
    pub equation: String,
    pub solution: Option<String>,
    pub explanation: Option<String>,
}

/// One bucket of the per-user topic histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

/// An uploaded image handed to the vision provider.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}
