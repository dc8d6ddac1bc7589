// Answer session controller: drives one question's answer through
// record -> transcribe -> translate -> evaluate -> persist.

use crate::audio::{AudioBuffer, AudioRecorder, CaptureError};
use crate::evaluate::{EvaluateError, Evaluator, Feedback};
use crate::identity::IdentityProvider;
use crate::store::{AnswerKey, AnswerRecord, AnswerStore, InterviewQuestion, StoreError};
use crate::transcribe::{TranscribeError, TranscriptionClient};
use crate::translate::{TranslateError, TranslationClient};
use crate::voice::Speaker;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::Mutex as TokioMutex;
use uuid::Uuid;

/// Pipeline stage the controller is in. One enumerable state at a time;
/// "recording" and "evaluating" can never both be true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Idle,
    Recording,
    Transcribing,
    Translating,
    Evaluating,
    Persisting,
    Complete,
    Failed(FailedStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailedStage {
    Recording,
    Transcribing,
    Translating,
    Evaluating,
    Persisting,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Recording failed: {0}")]
    Recording(#[from] CaptureError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscribeError),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslateError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluateError),

    #[error("Saving the answer failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("User identity not loaded")]
    Identity,

    #[error("No evaluated answer available to save")]
    NothingToSave,

    #[error("Question abandoned, result discarded")]
    Abandoned,
}

impl PipelineError {
    /// Stage the failure belongs to, if the question was still active.
    pub fn stage(&self) -> Option<FailedStage> {
        match self {
            PipelineError::Recording(_) => Some(FailedStage::Recording),
            PipelineError::Transcription(_) => Some(FailedStage::Transcribing),
            PipelineError::Translation(_) => Some(FailedStage::Translating),
            PipelineError::Evaluation(_) => Some(FailedStage::Evaluating),
            PipelineError::Persistence(_) => Some(FailedStage::Persisting),
            // Ownership is a storage concern: report under the save step.
            PipelineError::Identity | PipelineError::NothingToSave => {
                Some(FailedStage::Persisting)
            }
            PipelineError::Abandoned => None,
        }
    }

    /// Short non-technical message for the UI, paired with a retry action.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Recording(_) => {
                "We couldn't access your microphone. Check permissions and try again."
            }
            PipelineError::Transcription(_) => {
                "We couldn't transcribe your answer. Please record it again."
            }
            PipelineError::Translation(_) => {
                "Translation is unavailable right now. Please record your answer again."
            }
            PipelineError::Evaluation(_) => {
                "We couldn't grade your answer. Please record it again."
            }
            PipelineError::Persistence(_) => {
                "Your feedback is ready but saving failed. Try saving again."
            }
            PipelineError::Identity => "Sign in to record and save answers.",
            PipelineError::NothingToSave => "Record an answer before saving.",
            PipelineError::Abandoned => "This question is no longer active.",
        }
    }
}

/// Shared collaborators every controller instance borrows. All handles are
/// cheap clones; the recorder and speaker wrap the device-wide singletons.
#[derive(Clone)]
pub struct PipelineHandles {
    pub recorder: Arc<StdMutex<AudioRecorder>>,
    pub speaker: Arc<Speaker>,
    pub transcriber: Arc<TranscriptionClient>,
    pub translator: Arc<TranslationClient>,
    pub evaluator: Arc<dyn Evaluator>,
    pub store: Arc<dyn AnswerStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

struct SessionState {
    stage: Stage,
    canonical_answer: Option<String>,
    feedback: Option<Feedback>,
}

/// Per-question pipeline driver.
///
/// Stages run strictly sequentially; a failure at stage N never reaches
/// stage N+1 and never persists a partial record. Results arriving after
/// `abandon` are discarded, not written.
pub struct AnswerSessionController {
    session_id: String,
    mock_id: String,
    question: InterviewQuestion,
    handles: PipelineHandles,
    state: TokioMutex<SessionState>,
    epoch: AtomicU64,
}

impl AnswerSessionController {
    pub fn new(handles: PipelineHandles, mock_id: String, question: InterviewQuestion) -> Self {
        let session_id = Uuid::new_v4().to_string();
        tracing::info!(
            "Answer session {} started for question '{}'",
            session_id,
            question.question
        );

        Self {
            session_id,
            mock_id,
            question,
            handles,
            state: TokioMutex::new(SessionState {
                stage: Stage::Idle,
                canonical_answer: None,
                feedback: None,
            }),
            epoch: AtomicU64::new(0),
        }
    }

    pub async fn stage(&self) -> Stage {
        self.state.lock().await.stage
    }

    pub async fn canonical_answer(&self) -> Option<String> {
        self.state.lock().await.canonical_answer.clone()
    }

    pub async fn feedback(&self) -> Option<Feedback> {
        self.state.lock().await.feedback.clone()
    }

    fn answer_key(&self, user_email: &str) -> AnswerKey {
        AnswerKey {
            mock_id: self.mock_id.clone(),
            question: self.question.question.clone(),
            user_email: user_email.to_string(),
        }
    }

    /// Look up a previously persisted answer for this question and user.
    ///
    /// When one exists the state machine short-circuits straight to
    /// `Complete`, pre-populated, until the user explicitly re-records.
    pub async fn load_existing(&self) -> Result<Option<Feedback>, PipelineError> {
        let user = self.handles.identity.current_user();
        if !user.is_usable() {
            return Ok(None);
        }

        let existing = self
            .handles
            .store
            .read_answer(&self.answer_key(&user.email))
            .await?;

        let Some(record) = existing else {
            return Ok(None);
        };

        let rating = match record.rating.parse::<u8>() {
            Ok(r) => r,
            Err(_) => {
                tracing::warn!(
                    "Session {}: stored rating '{}' is not numeric, ignoring persisted answer",
                    self.session_id,
                    record.rating
                );
                return Ok(None);
            }
        };

        let feedback = Feedback {
            rating,
            feedback: record.feedback.clone(),
        };

        let mut state = self.state.lock().await;
        state.stage = Stage::Complete;
        state.canonical_answer = Some(record.user_ans);
        state.feedback = Some(feedback.clone());

        tracing::info!("Session {}: restored persisted answer", self.session_id);
        Ok(Some(feedback))
    }

    /// Begin capturing. Any prior capture or playback is stopped first:
    /// microphone and speech output are exclusive, device-wide.
    pub async fn start_recording(&self) -> Result<(), PipelineError> {
        self.handles.speaker.stop();

        let result = {
            let mut recorder = self
                .handles
                .recorder
                .lock()
                .map_err(|_| PipelineError::Recording(CaptureError::DeviceUnavailable))?;
            if recorder.is_recording() {
                recorder.discard_recording();
            }
            recorder.start_recording()
        };

        match result {
            Ok(()) => {
                self.state.lock().await.stage = Stage::Recording;
                Ok(())
            }
            Err(e) => {
                let err = PipelineError::Recording(e);
                self.fail(&err).await;
                Err(err)
            }
        }
    }

    /// Stop capturing and push the buffer through the rest of the pipeline.
    pub async fn stop_and_submit(&self, source_language: &str) -> Result<Feedback, PipelineError> {
        let buffer = {
            let mut recorder = self
                .handles
                .recorder
                .lock()
                .map_err(|_| PipelineError::Recording(CaptureError::DeviceUnavailable))?;
            recorder.stop_recording()
        };

        let buffer = match buffer {
            Ok(b) => b,
            Err(e) => {
                let err = PipelineError::Recording(e);
                self.fail(&err).await;
                return Err(err);
            }
        };

        self.submit_buffer(buffer, source_language).await
    }

    /// Run transcribe -> translate -> evaluate -> persist on a finalized
    /// buffer. Public so callers owning their own capture path can reuse
    /// the pipeline.
    pub async fn submit_buffer(
        &self,
        audio: AudioBuffer,
        source_language: &str,
    ) -> Result<Feedback, PipelineError> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        match self.run_pipeline(audio, source_language, epoch).await {
            Ok(feedback) => Ok(feedback),
            Err(err) => {
                tracing::error!(
                    "Session {} pipeline failed (mock {}, lang {}): {}",
                    self.session_id,
                    self.mock_id,
                    source_language,
                    err
                );
                self.fail_if_current(&err, epoch).await;
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        audio: AudioBuffer,
        source_language: &str,
        epoch: u64,
    ) -> Result<Feedback, PipelineError> {
        let user = self.handles.identity.current_user();
        if !user.is_usable() {
            return Err(PipelineError::Identity);
        }

        self.advance(Stage::Transcribing, epoch).await?;
        let transcript = self
            .handles
            .transcriber
            .transcribe(&audio, source_language)
            .await?;

        self.advance(Stage::Translating, epoch).await?;
        let canonical = self
            .handles
            .translator
            .to_canonical(&transcript, source_language)
            .await?;

        self.advance(Stage::Evaluating, epoch).await?;
        let feedback = self
            .handles
            .evaluator
            .evaluate(&self.question.question, &canonical)
            .await?;

        // The store write serializes with `abandon` under the state lock:
        // an abandon that wins the lock invalidates the epoch before the
        // check below, and one that loses it waits until the write is done.
        {
            let mut state = self.state.lock().await;
            if self.epoch.load(Ordering::SeqCst) != epoch {
                tracing::warn!(
                    "Session {}: discarding result, question abandoned before persist",
                    self.session_id
                );
                return Err(PipelineError::Abandoned);
            }
            state.stage = Stage::Persisting;
            // Keep the evaluated result in memory before attempting the
            // write, so a storage failure can be retried save-only.
            state.canonical_answer = Some(canonical.clone());
            state.feedback = Some(feedback.clone());

            let record = self.build_record(&user.email, &canonical, &feedback);
            self.handles.store.write_answer(record).await?;
            state.stage = Stage::Complete;
        }

        tracing::info!(
            "Session {}: answer persisted, rating {}",
            self.session_id,
            feedback.rating
        );
        Ok(feedback)
    }

    /// Retry only the save step after a `Persistence` failure. Never forces
    /// re-recording: rating and critique are still held in memory.
    pub async fn retry_save(&self) -> Result<(), PipelineError> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let user = self.handles.identity.current_user();
        if !user.is_usable() {
            let err = PipelineError::Identity;
            self.fail_if_current(&err, epoch).await;
            return Err(err);
        }

        let (canonical, feedback) = {
            let state = self.state.lock().await;
            match (&state.canonical_answer, &state.feedback) {
                (Some(c), Some(f)) => (c.clone(), f.clone()),
                _ => return Err(PipelineError::NothingToSave),
            }
        };

        let mut state = self.state.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Err(PipelineError::Abandoned);
        }
        state.stage = Stage::Persisting;

        let record = self.build_record(&user.email, &canonical, &feedback);
        match self.handles.store.write_answer(record).await {
            Ok(()) => {
                state.stage = Stage::Complete;
                Ok(())
            }
            Err(e) => {
                state.stage = Stage::Failed(FailedStage::Persisting);
                Err(PipelineError::Persistence(e))
            }
        }
    }

    /// Drop this question: stop capture and playback, discard in-memory
    /// results, and invalidate any in-flight pipeline so late results are
    /// thrown away instead of persisted.
    pub async fn abandon(&self) {
        // The epoch bump happens under the state lock, so it cannot land in
        // the middle of the pipeline's locked persist step.
        let mut state = self.state.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.handles.speaker.stop();

        if let Ok(mut recorder) = self.handles.recorder.lock() {
            if recorder.is_recording() {
                recorder.discard_recording();
            }
        }

        state.stage = Stage::Idle;
        state.canonical_answer = None;
        state.feedback = None;

        tracing::info!("Session {}: abandoned", self.session_id);
    }

    fn build_record(
        &self,
        user_email: &str,
        canonical: &str,
        feedback: &Feedback,
    ) -> AnswerRecord {
        AnswerRecord {
            mock_id_ref: self.mock_id.clone(),
            question: self.question.question.clone(),
            correct_answer: self.question.answer.clone(),
            user_ans: canonical.to_string(),
            feedback: feedback.feedback.clone(),
            rating: feedback.rating.to_string(),
            user_email: user_email.to_string(),
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Move to `stage` unless the question was abandoned in the meantime.
    /// The epoch is read under the state lock so it is consistent with the
    /// stage it guards.
    async fn advance(&self, stage: Stage, epoch: u64) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::warn!(
                "Session {}: discarding result, question abandoned before {:?}",
                self.session_id,
                stage
            );
            return Err(PipelineError::Abandoned);
        }
        state.stage = stage;
        Ok(())
    }

    async fn fail(&self, err: &PipelineError) {
        if let Some(stage) = err.stage() {
            self.state.lock().await.stage = Stage::Failed(stage);
        }
    }

    async fn fail_if_current(&self, err: &PipelineError, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.fail(err).await;
        }
    }
}
