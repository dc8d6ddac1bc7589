// Speech-to-text via a hosted upload-then-poll provider.

mod assemblyai;

pub use assemblyai::AssemblyAiProvider;

use crate::audio::AudioBuffer;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const MAX_POLL_DURATION: Duration = Duration::from_secs(120);

/// Transcription errors with retry classification
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Transcription credential missing: {0}")]
    Configuration(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed")]
    Authentication,

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid audio buffer")]
    InvalidAudio,

    #[error("Transcription failed: {0}")]
    JobFailed(String),

    #[error("Transcription timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl TranscribeError {
    /// Returns true if re-submitting the same audio may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscribeError::Network(_) | TranscribeError::RateLimit | TranscribeError::Timeout(_)
        )
    }
}

/// One poll of a transcription job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPoll {
    Pending,
    Completed { text: String },
    Failed { detail: String },
}

/// Upload/create/poll surface of a hosted transcription service
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Upload raw audio bytes, returning an upload reference URL
    async fn upload(&self, audio_wav: Vec<u8>) -> Result<String, TranscribeError>;

    /// Create a transcription job for an uploaded file
    async fn create_job(
        &self,
        audio_url: &str,
        language_code: &str,
    ) -> Result<String, TranscribeError>;

    /// Fetch the current status of a job
    async fn poll_job(&self, job_id: &str) -> Result<JobPoll, TranscribeError>;

    fn name(&self) -> &str;
}

/// Drives one audio buffer through upload, job creation and a bounded poll
/// loop. Failed jobs are not retried here; re-submitting is the caller's
/// call. Dropping the `transcribe` future abandons the loop.
pub struct TranscriptionClient {
    provider: Box<dyn TranscriptionProvider>,
    poll_interval: Duration,
    max_poll_duration: Duration,
}

impl TranscriptionClient {
    pub fn new(provider: Box<dyn TranscriptionProvider>) -> Self {
        Self {
            provider,
            poll_interval: POLL_INTERVAL,
            max_poll_duration: MAX_POLL_DURATION,
        }
    }

    /// Build against AssemblyAI using `ASSEMBLYAI_API_KEY`.
    ///
    /// The credential is checked here, before any network call.
    pub fn from_env() -> Result<Self, TranscribeError> {
        let provider = AssemblyAiProvider::from_env()
            .ok_or(TranscribeError::Configuration("ASSEMBLYAI_API_KEY"))?;
        Ok(Self::new(Box::new(provider)))
    }

    pub fn with_poll_timing(mut self, interval: Duration, max_duration: Duration) -> Self {
        self.poll_interval = interval;
        self.max_poll_duration = max_duration;
        self
    }

    /// Transcribe `audio` spoken in `language_code`.
    pub async fn transcribe(
        &self,
        audio: &AudioBuffer,
        language_code: &str,
    ) -> Result<String, TranscribeError> {
        let wav_bytes = audio.to_wav_bytes().ok_or(TranscribeError::InvalidAudio)?;

        tracing::info!(
            "{}: uploading {:.1}s audio ({})",
            self.provider.name(),
            audio.duration_secs,
            language_code
        );

        let upload_url = self.provider.upload(wav_bytes).await?;
        let job_id = self.provider.create_job(&upload_url, language_code).await?;

        tracing::info!("{}: created job {}", self.provider.name(), job_id);

        let max_attempts =
            (self.max_poll_duration.as_millis() / self.poll_interval.as_millis().max(1)).max(1);

        for _ in 0..max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            match self.provider.poll_job(&job_id).await? {
                JobPoll::Pending => continue,
                JobPoll::Completed { text } => {
                    tracing::info!(
                        "{}: job {} completed, {} chars",
                        self.provider.name(),
                        job_id,
                        text.len()
                    );
                    return Ok(text);
                }
                JobPoll::Failed { detail } => {
                    tracing::error!("{}: job {} failed: {}", self.provider.name(), job_id, detail);
                    return Err(TranscribeError::JobFailed(detail));
                }
            }
        }

        tracing::error!(
            "{}: job {} still pending after {}s, giving up",
            self.provider.name(),
            job_id,
            self.max_poll_duration.as_secs()
        );
        Err(TranscribeError::Timeout(self.max_poll_duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedProvider {
        polls_until_done: usize,
        outcome: JobPoll,
        poll_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TranscriptionProvider for ScriptedProvider {
        async fn upload(&self, _audio_wav: Vec<u8>) -> Result<String, TranscribeError> {
            Ok("https://upload.test/audio".to_string())
        }

        async fn create_job(
            &self,
            _audio_url: &str,
            _language_code: &str,
        ) -> Result<String, TranscribeError> {
            Ok("job-1".to_string())
        }

        async fn poll_job(&self, _job_id: &str) -> Result<JobPoll, TranscribeError> {
            let n = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
            if n < self.polls_until_done {
                Ok(JobPoll::Pending)
            } else {
                Ok(self.outcome.clone())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn audio() -> AudioBuffer {
        let mut buffer = AudioBuffer::new(16000, 1);
        buffer.append(&vec![0i16; 1600]);
        buffer
    }

    fn client(provider: ScriptedProvider) -> TranscriptionClient {
        TranscriptionClient::new(Box::new(provider)).with_poll_timing(
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_polls_until_completed() {
        let polls = Arc::new(AtomicUsize::new(0));
        let client = client(ScriptedProvider {
            polls_until_done: 3,
            outcome: JobPoll::Completed {
                text: "Bonjour le monde".to_string(),
            },
            poll_count: polls.clone(),
        });

        let text = client.transcribe(&audio(), "fr").await.unwrap();
        assert_eq!(text, "Bonjour le monde");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_job_is_terminal() {
        let client = client(ScriptedProvider {
            polls_until_done: 1,
            outcome: JobPoll::Failed {
                detail: "audio unreadable".to_string(),
            },
            poll_count: Arc::default(),
        });

        let err = client.transcribe(&audio(), "en").await.unwrap_err();
        assert!(matches!(err, TranscribeError::JobFailed(d) if d == "audio unreadable"));
    }

    #[tokio::test]
    async fn test_poll_loop_is_bounded() {
        let polls = Arc::new(AtomicUsize::new(0));
        let client = client(ScriptedProvider {
            polls_until_done: usize::MAX,
            outcome: JobPoll::Pending,
            poll_count: polls.clone(),
        });

        let err = client.transcribe(&audio(), "en").await.unwrap_err();
        assert!(matches!(err, TranscribeError::Timeout(_)));
        assert_eq!(polls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_empty_audio_rejected_before_upload() {
        let client = client(ScriptedProvider {
            polls_until_done: 1,
            outcome: JobPoll::Pending,
            poll_count: Arc::default(),
        });

        let empty = AudioBuffer::new(16000, 1);
        let err = client.transcribe(&empty, "en").await.unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidAudio));
    }

    #[test]
    fn test_retry_classification() {
        assert!(TranscribeError::Network("reset".into()).is_retryable());
        assert!(TranscribeError::Timeout(Duration::from_secs(120)).is_retryable());
        assert!(!TranscribeError::JobFailed("bad audio".into()).is_retryable());
        assert!(!TranscribeError::Configuration("ASSEMBLYAI_API_KEY").is_retryable());
    }
}
