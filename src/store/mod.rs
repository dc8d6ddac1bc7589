// Storage collaborator interface and the models that round-trip through it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    #[error("Storage read failed: {0}")]
    ReadFailed(String),
}

/// One generated interview session. Owned by the generation subsystem;
/// read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: i64,
    #[serde(rename = "mockId")]
    pub mock_id: String,
    #[serde(rename = "jsonMockResp")]
    pub json_mock_resp: String,
    #[serde(rename = "jobPosition")]
    pub job_position: String,
    #[serde(rename = "jobDescription")]
    pub job_description: String,
    #[serde(rename = "jobExperience")]
    pub job_experience: String,
    #[serde(rename = "file_data")]
    pub file_data: Option<String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl Interview {
    /// Parse the stored question blob into its ordered question sequence.
    pub fn questions(&self) -> Result<Vec<InterviewQuestion>, serde_json::Error> {
        serde_json::from_str(&self.json_mock_resp)
    }
}

/// One prompt/reference-answer pair from an interview's question blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

/// The persisted answer row. Field names are the wire contract with the
/// storage collaborator and must round-trip unchanged; rating travels as
/// numeric-as-text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "mockIdRef")]
    pub mock_id_ref: String,
    pub question: String,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
    #[serde(rename = "UserAns")]
    pub user_ans: String,
    pub feedback: String,
    pub rating: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl AnswerRecord {
    pub fn key(&self) -> AnswerKey {
        AnswerKey {
            mock_id: self.mock_id_ref.clone(),
            question: self.question.clone(),
            user_email: self.user_email.clone(),
        }
    }
}

/// Upsert key: at most one record exists per (interview, question, user).
/// The question text itself is the join key, not a surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnswerKey {
    pub mock_id: String,
    pub question: String,
    pub user_email: String,
}

/// Keyed answer storage with atomic single-row upsert semantics.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Insert or update the record at its (mockId, question, userEmail) key.
    async fn write_answer(&self, record: AnswerRecord) -> Result<(), StoreError>;

    async fn read_answer(&self, key: &AnswerKey) -> Result<Option<AnswerRecord>, StoreError>;

    /// All answers for one interview, in insertion order.
    async fn list_answers(&self, mock_id: &str) -> Result<Vec<AnswerRecord>, StoreError>;
}

/// In-memory reference store. Upsert keeps the original insertion slot so
/// listing order is stable across updates.
#[derive(Default)]
pub struct MemoryAnswerStore {
    rows: Mutex<MemoryRows>,
}

#[derive(Default)]
struct MemoryRows {
    by_key: HashMap<AnswerKey, usize>,
    records: Vec<AnswerRecord>,
}

impl MemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AnswerStore for MemoryAnswerStore {
    async fn write_answer(&self, record: AnswerRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let key = record.key();
        if let Some(&slot) = rows.by_key.get(&key) {
            tracing::debug!("Updating answer for question '{}'", key.question);
            rows.records[slot] = record;
        } else {
            tracing::debug!("Inserting answer for question '{}'", key.question);
            rows.records.push(record);
            let slot = rows.records.len() - 1;
            rows.by_key.insert(key, slot);
        }
        Ok(())
    }

    async fn read_answer(&self, key: &AnswerKey) -> Result<Option<AnswerRecord>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.by_key.get(key).map(|&slot| rows.records[slot].clone()))
    }

    async fn list_answers(&self, mock_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .records
            .iter()
            .filter(|r| r.mock_id_ref == mock_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answer: &str) -> AnswerRecord {
        AnswerRecord {
            mock_id_ref: "mock-1".to_string(),
            question: question.to_string(),
            correct_answer: "A reference answer.".to_string(),
            user_ans: answer.to_string(),
            feedback: "Good.".to_string(),
            rating: "7".to_string(),
            user_email: "dev@example.com".to_string(),
            created_at: "2026-01-05 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_wire_field_names_round_trip() {
        let json = serde_json::to_value(record("Tell me about yourself", "I build things")).unwrap();
        let object = json.as_object().unwrap();

        let expected = [
            "mockIdRef",
            "question",
            "correctAnswer",
            "UserAns",
            "feedback",
            "rating",
            "userEmail",
            "createdAt",
        ];
        assert_eq!(object.len(), expected.len());
        for field in expected {
            assert!(object.contains_key(field), "missing wire field {field}");
        }
        assert_eq!(object["rating"], "7");

        let back: AnswerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record("Tell me about yourself", "I build things"));
    }

    #[test]
    fn test_interview_question_blob_parses() {
        let interview = Interview {
            id: 1,
            mock_id: "mock-1".to_string(),
            json_mock_resp: r#"[{"Question":"Why Rust?","Answer":"Safety."}]"#.to_string(),
            job_position: "Backend Engineer".to_string(),
            job_description: "APIs".to_string(),
            job_experience: "3".to_string(),
            file_data: None,
            created_by: "dev@example.com".to_string(),
            created_at: "2026-01-05 09:00:00".to_string(),
        };

        let questions = interview.questions().unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Why Rust?");
        assert_eq!(questions[0].answer, "Safety.");
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryAnswerStore::new();
        store.write_answer(record("Q1", "first take")).await.unwrap();
        store.write_answer(record("Q2", "other")).await.unwrap();
        store.write_answer(record("Q1", "second take")).await.unwrap();

        assert_eq!(store.len().await, 2);
        let answers = store.list_answers("mock-1").await.unwrap();
        assert_eq!(answers[0].question, "Q1");
        assert_eq!(answers[0].user_ans, "second take");
        assert_eq!(answers[1].question, "Q2");
    }

    #[tokio::test]
    async fn test_read_by_key() {
        let store = MemoryAnswerStore::new();
        store.write_answer(record("Q1", "take")).await.unwrap();

        let hit = store
            .read_answer(&record("Q1", "take").key())
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .read_answer(&AnswerKey {
                mock_id: "mock-1".to_string(),
                question: "Q9".to_string(),
                user_email: "dev@example.com".to_string(),
            })
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
