// Feedback evaluator client: scores a canonical-language question/answer
// pair through the internal scoring service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/generate-feedback";
const TIMEOUT_SECS: u64 = 30;

/// Rating scale is evaluator-defined; the pipeline only range-checks it.
pub const RATING_MIN: i64 = 0;
pub const RATING_MAX: i64 = 10;

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Evaluator error: {0}")]
    Provider(String),

    #[error("Malformed evaluator payload: {0}")]
    MalformedPayload(String),

    #[error("Rating {0} outside the {RATING_MIN}-{RATING_MAX} scale")]
    InvalidRating(i64),
}

/// A graded answer: numeric rating plus free-text critique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: u8,
    pub feedback: String,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, question: &str, answer: &str) -> Result<Feedback, EvaluateError>;
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawFeedback {
    rating: i64,
    feedback: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    feedback: RawFeedback,
}

pub struct HttpEvaluator {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpEvaluator {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { endpoint, client }
    }

    pub fn from_env() -> Self {
        let endpoint = std::env::var("EVALUATOR_ENDPOINT")
            .ok()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn evaluate(&self, question: &str, answer: &str) -> Result<Feedback, EvaluateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EvaluateRequest { question, answer })
            .send()
            .await
            .map_err(|e| EvaluateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluateError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let payload: EvaluateResponse = response
            .json()
            .await
            .map_err(|e| EvaluateError::MalformedPayload(e.to_string()))?;

        let rating = payload.feedback.rating;
        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(EvaluateError::InvalidRating(rating));
        }

        Ok(Feedback {
            rating: rating as u8,
            feedback: payload.feedback.feedback,
        })
    }
}
