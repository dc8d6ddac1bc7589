// AssemblyAI v2 transcription provider: upload, create job, poll.

use super::{JobPoll, TranscribeError, TranscriptionProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com/v2";
const TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    audio_url: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct AssemblyAiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AssemblyAiProvider {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        tracing::info!("AssemblyAI provider initialized");

        Self {
            api_key,
            base_url: ASSEMBLYAI_BASE_URL.to_string(),
            client,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("ASSEMBLYAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(Self::new)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, TranscribeError> {
        match response {
            Ok(resp) => {
                let status = resp.status();

                if status.is_success() {
                    resp.json::<T>()
                        .await
                        .map_err(|e| TranscribeError::Provider(e.to_string()))
                } else if status.as_u16() == 401 {
                    Err(TranscribeError::Authentication)
                } else if status.as_u16() == 429 {
                    Err(TranscribeError::RateLimit)
                } else {
                    let error_text = resp.text().await.unwrap_or_default();
                    Err(TranscribeError::Provider(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )))
                }
            }
            Err(e) => Err(TranscribeError::Network(e.to_string())),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAiProvider {
    async fn upload(&self, audio_wav: Vec<u8>) -> Result<String, TranscribeError> {
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("Authorization", &self.api_key)
            .body(audio_wav)
            .send()
            .await;

        let upload: UploadResponse = Self::decode(response).await?;
        Ok(upload.upload_url)
    }

    async fn create_job(
        &self,
        audio_url: &str,
        language_code: &str,
    ) -> Result<String, TranscribeError> {
        let response = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&CreateJobRequest {
                audio_url,
                language_code,
            })
            .send()
            .await;

        let job: CreateJobResponse = Self::decode(response).await?;
        Ok(job.id)
    }

    async fn poll_job(&self, job_id: &str) -> Result<JobPoll, TranscribeError> {
        let response = self
            .client
            .get(format!("{}/transcript/{}", self.base_url, job_id))
            .header("Authorization", &self.api_key)
            .send()
            .await;

        let status: JobStatusResponse = Self::decode(response).await?;

        match status.status.as_str() {
            "completed" => Ok(JobPoll::Completed {
                text: status.text.unwrap_or_default(),
            }),
            "error" => Ok(JobPoll::Failed {
                detail: status
                    .error
                    .unwrap_or_else(|| "unspecified provider error".to_string()),
            }),
            _ => Ok(JobPoll::Pending),
        }
    }

    fn name(&self) -> &str {
        "AssemblyAI"
    }
}
