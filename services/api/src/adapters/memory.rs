//! services/api/src/adapters/memory.rs
//!
//! A process-local `DocumentStore`. It backs the HTTP tests and local runs
//! without Postgres, and answers every query the same way the SQL adapter does.

use async_trait::async_trait;
use math_tutor_core::{
    ChatMode, ChatTurn, DocumentStore, NewProblem, PortError, PortResult, ProblemRecord,
    RecordId, TopicCount,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    records: RwLock<Vec<ProblemRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: RecordId) -> PortError {
    PortError::NotFound(format!("Record {} not found", id))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ping(&self) -> PortResult<()> {
        Ok(())
    }

    async fn insert(&self, problem: NewProblem) -> PortResult<ProblemRecord> {
        let record = ProblemRecord::from_new(problem);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> PortResult<Vec<ProblemRecord>> {
        let records = self.records.read().await;
        // Insertion order breaks timestamp ties, later inserts first.
        let mut owned: Vec<(usize, &ProblemRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.user_id == user_id)
            .collect();
        owned.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        Ok(owned
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn get(&self, id: RecordId, user_id: &str) -> PortResult<ProblemRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update_chat(
        &self,
        id: RecordId,
        user_id: &str,
        mode: ChatMode,
        turns: Vec<ChatTurn>,
    ) -> PortResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
            .ok_or_else(|| not_found(id))?;
        match mode {
            ChatMode::Hint => record.hint_chat = turns,
            ChatMode::Tutor => record.tutor_chat = turns,
        }
        Ok(())
    }

    async fn clear_chat(&self, id: RecordId, user_id: &str) -> PortResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id && r.user_id == user_id)
            .ok_or_else(|| not_found(id))?;
        record.hint_chat.clear();
        record.tutor_chat.clear();
        Ok(())
    }

    async fn set_topic(&self, id: RecordId, topic: &str) -> PortResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        record.topic = Some(topic.to_string());
        Ok(())
    }

    async fn topic_counts(&self, user_id: &str) -> PortResult<Vec<TopicCount>> {
        let records = self.records.read().await;
        let mut buckets: BTreeMap<&str, u64> = BTreeMap::new();
        for topic in records
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| r.topic.as_deref())
        {
            *buckets.entry(topic).or_default() += 1;
        }
        let mut counts: Vec<TopicCount> = buckets
            .into_iter()
            .map(|(topic, count)| TopicCount {
                topic: topic.to_string(),
                count,
            })
            .collect();
        // BTreeMap already yields topics ascending; a stable sort keeps that for ties.
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }
}
