//! services/api/src/adapters/db.rs
//!
//! This module contains the Postgres adapter, the concrete implementation of
//! the `DocumentStore` port. Each problem is one row and both transcripts are
//! JSONB columns, so a transcript update is a single column overwrite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use math_tutor_core::{
    ChatMode, ChatRole, ChatTurn, DocumentStore, NewProblem, PortError, PortResult,
    ProblemRecord, RecordId, SolveMode, TopicCount,
};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

const RECORD_COLUMNS: &str =
    "id, user_id, equation, solution, explanation, created_at, hint_chat, tutor_chat, mode_used, topic";

/// Newest first; `seq` orders records that share a timestamp by insertion.
const RECENT_ORDER: &str = "ORDER BY created_at DESC, seq DESC";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

/// The JSONB shape of one transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatTurnRecord {
    role: String,
    content: String,
}

impl ChatTurnRecord {
    pub(crate) fn from_domain(turn: &ChatTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }

    pub(crate) fn to_domain(self) -> PortResult<ChatTurn> {
        Ok(ChatTurn {
            role: self.role.parse::<ChatRole>()?,
            content: self.content,
        })
    }
}

fn transcript_to_records(turns: &[ChatTurn]) -> Json<Vec<ChatTurnRecord>> {
    Json(turns.iter().map(ChatTurnRecord::from_domain).collect())
}

fn records_to_transcript(records: Vec<ChatTurnRecord>) -> PortResult<Vec<ChatTurn>> {
    records.into_iter().map(ChatTurnRecord::to_domain).collect()
}

#[derive(FromRow)]
struct ProblemRow {
    id: Uuid,
    user_id: String,
    equation: String,
    solution: Option<String>,
    explanation: Option<String>,
    created_at: DateTime<Utc>,
    hint_chat: Json<Vec<ChatTurnRecord>>,
    tutor_chat: Json<Vec<ChatTurnRecord>>,
    mode_used: String,
    topic: Option<String>,
}

impl ProblemRow {
    fn to_domain(self) -> PortResult<ProblemRecord> {
        Ok(ProblemRecord {
            id: RecordId::from(self.id),
            user_id: self.user_id,
            equation: self.equation,
            solution: self.solution,
            explanation: self.explanation,
            created_at: self.created_at,
            hint_chat: records_to_transcript(self.hint_chat.0)?,
            tutor_chat: records_to_transcript(self.tutor_chat.0)?,
            mode_used: self.mode_used.parse::<SolveMode>()?,
            topic: self.topic,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(id: RecordId) -> PortError {
    PortError::NotFound(format!("Record {} not found", id))
}

fn ensure_affected(rows: u64, id: RecordId) -> PortResult<()> {
    if rows == 0 {
        Err(not_found(id))
    } else {
        Ok(())
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn insert(&self, problem: NewProblem) -> PortResult<ProblemRecord> {
        let record = ProblemRecord::from_new(problem);
        let sql = format!(
            "INSERT INTO problems ({RECORD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {RECORD_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProblemRow>(&sql)
            .bind(record.id.as_uuid())
            .bind(&record.user_id)
            .bind(&record.equation)
            .bind(&record.solution)
            .bind(&record.explanation)
            .bind(record.created_at)
            .bind(transcript_to_records(&record.hint_chat))
            .bind(transcript_to_records(&record.tutor_chat))
            .bind(record.mode_used.as_str())
            .bind(&record.topic)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        row.to_domain()
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> PortResult<Vec<ProblemRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM problems WHERE user_id = $1 {RECENT_ORDER} LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ProblemRow>(&sql)
            .bind(user_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        rows.into_iter().map(ProblemRow::to_domain).collect()
    }

    async fn get(&self, id: RecordId, user_id: &str) -> PortResult<ProblemRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM problems WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, ProblemRow>(&sql)
            .bind(id.as_uuid())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| not_found(id))?;
        row.to_domain()
    }

    async fn update_chat(
        &self,
        id: RecordId,
        user_id: &str,
        mode: ChatMode,
        turns: Vec<ChatTurn>,
    ) -> PortResult<()> {
        // Column names cannot be bound, so each mode gets its own statement.
        let sql = match mode {
            ChatMode::Hint => "UPDATE problems SET hint_chat = $1 WHERE id = $2 AND user_id = $3",
            ChatMode::Tutor => "UPDATE problems SET tutor_chat = $1 WHERE id = $2 AND user_id = $3",
        };
        let result = sqlx::query(sql)
            .bind(transcript_to_records(&turns))
            .bind(id.as_uuid())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), id)
    }

    async fn clear_chat(&self, id: RecordId, user_id: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE problems SET hint_chat = '[]'::jsonb, tutor_chat = '[]'::jsonb WHERE id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), id)
    }

    async fn set_topic(&self, id: RecordId, topic: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE problems SET topic = $1 WHERE id = $2")
            .bind(topic)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), id)
    }

    async fn topic_counts(&self, user_id: &str) -> PortResult<Vec<TopicCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT topic, COUNT(*) AS count FROM problems \
             WHERE user_id = $1 AND topic IS NOT NULL \
             GROUP BY topic ORDER BY count DESC, topic ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows
            .into_iter()
            .map(|(topic, count)| TopicCount {
                topic,
                count: u64::try_from(count).unwrap_or(0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transcript_records_use_provider_neutral_roles() {
        let turns = vec![ChatTurn::user("why?"), ChatTurn::assistant("because")];
        let json = serde_json::to_value(transcript_to_records(&turns).0).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "user", "content": "why?" },
                { "role": "assistant", "content": "because" },
            ])
        );
    }

    #[test]
    fn recent_listing_breaks_timestamp_ties_by_insertion_order() {
        assert!(RECENT_ORDER.ends_with("created_at DESC, seq DESC"));
        let migration = include_str!("../../migrations/0002_add_problem_sequence.sql");
        assert!(migration.contains("seq BIGSERIAL"));
    }

    #[test]
    fn stored_model_role_reads_back_as_assistant() {
        let records: Vec<ChatTurnRecord> =
            serde_json::from_str(r#"[{"role": "model", "content": "hi"}]"#).unwrap();
        assert_eq!(
            records_to_transcript(records).unwrap(),
            vec![ChatTurn::assistant("hi")]
        );
    }
}
