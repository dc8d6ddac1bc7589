pub mod audio;
pub mod config;
pub mod display;
pub mod evaluate;
pub mod identity;
pub mod session;
pub mod store;
pub mod transcribe;
pub mod translate;
pub mod voice;

pub use audio::{AudioBuffer, AudioRecorder, CaptureBackend, CaptureError};
pub use config::AppConfig;
pub use display::{DisplayTranslator, TranslationEntry, TranslationStatus};
pub use evaluate::{Evaluator, Feedback, HttpEvaluator};
pub use identity::{IdentityProvider, StaticIdentity, UserIdentity};
pub use session::{AnswerSessionController, PipelineError, PipelineHandles, Stage};
pub use store::{AnswerKey, AnswerRecord, AnswerStore, Interview, MemoryAnswerStore};
pub use transcribe::{TranscribeError, TranscriptionClient, TranscriptionProvider};
pub use translate::{TranslateError, TranslationClient, TranslationProvider};
pub use voice::{LanguageOption, Speaker, SpeechSynthesizer, SystemSynthesizer, Voice};
