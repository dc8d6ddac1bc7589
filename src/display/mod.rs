// Multilingual presentation of persisted canonical-language content:
// lazy per-field translation plus spoken playback in the viewer's language.

use crate::translate::{TranslationClient, CANONICAL_LANGUAGE};
use crate::voice::Speaker;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TranslationStatus {
    Pending,
    Done,
    Error,
}

/// Per-field translation state. The original is always kept so the UI can
/// render it as a placeholder while pending and fall back to it on error;
/// a field is never blank.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationEntry {
    pub original: String,
    pub translated: Option<String>,
    pub status: TranslationStatus,
}

impl TranslationEntry {
    fn canonical(original: String) -> Self {
        Self {
            original,
            translated: None,
            status: TranslationStatus::Done,
        }
    }

    pub fn display_text(&self) -> &str {
        match (&self.status, &self.translated) {
            (TranslationStatus::Done, Some(text)) => text,
            _ => &self.original,
        }
    }
}

struct DisplayState {
    language: String,
    fields: HashMap<String, TranslationEntry>,
}

/// Translates a set of stored canonical-language fields into the selected
/// display language and speaks them on demand.
///
/// Fields resolve independently; switching back to the canonical language
/// shows originals immediately and orphans any in-flight translations.
pub struct DisplayTranslator {
    translator: Arc<TranslationClient>,
    speaker: Arc<Speaker>,
    state: Mutex<DisplayState>,
    epoch: AtomicU64,
}

impl DisplayTranslator {
    pub fn new(translator: Arc<TranslationClient>, speaker: Arc<Speaker>) -> Self {
        Self {
            translator,
            speaker,
            state: Mutex::new(DisplayState {
                language: CANONICAL_LANGUAGE.to_string(),
                fields: HashMap::new(),
            }),
            epoch: AtomicU64::new(0),
        }
    }

    /// Register the canonical-language fields to present. Resets any prior
    /// translation state.
    pub async fn set_fields(&self, fields: Vec<(String, String)>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.fields = fields
            .into_iter()
            .map(|(key, original)| (key, TranslationEntry::canonical(original)))
            .collect();

        let language = state.language.clone();
        drop(state);

        if language != CANONICAL_LANGUAGE {
            self.refresh(&language).await;
        }
    }

    /// Switch the display language.
    ///
    /// Canonical target: originals show immediately, nothing is fetched,
    /// and unresolved translations from the previous language are
    /// discarded on arrival. Any other target: every field is marked
    /// pending and re-translated in one batch of independent calls.
    pub async fn set_language(&self, language: &str) {
        self.epoch.fetch_add(1, Ordering::SeqCst);

        {
            let mut state = self.state.lock().await;
            state.language = language.to_string();

            if language == CANONICAL_LANGUAGE {
                for entry in state.fields.values_mut() {
                    entry.translated = None;
                    entry.status = TranslationStatus::Done;
                }
                return;
            }

            for entry in state.fields.values_mut() {
                entry.translated = None;
                entry.status = TranslationStatus::Pending;
            }
        }

        self.refresh(language).await;
    }

    /// Current text for a field: translated when resolved, otherwise the
    /// original placeholder.
    pub async fn display_text(&self, key: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.fields.get(key).map(|e| e.display_text().to_string())
    }

    pub async fn entry(&self, key: &str) -> Option<TranslationEntry> {
        self.state.lock().await.fields.get(key).cloned()
    }

    pub async fn language(&self) -> String {
        self.state.lock().await.language.clone()
    }

    /// Speak one field's current text in the display language.
    pub async fn speak_field(&self, key: &str) {
        let (text, language) = {
            let state = self.state.lock().await;
            let Some(entry) = state.fields.get(key) else {
                return;
            };
            (entry.display_text().to_string(), state.language.clone())
        };
        self.speaker.speak(&text, &language);
    }

    /// Stop playback for every field. Global, idempotent.
    pub fn stop_speaking(&self) {
        self.speaker.stop();
    }

    /// Translate all fields into `language`, applying each result as it
    /// lands. Results arriving after the language changed again are
    /// dropped.
    async fn refresh(&self, language: &str) {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let pending: Vec<(String, String)> = {
            let state = self.state.lock().await;
            state
                .fields
                .iter()
                .map(|(key, entry)| (key.clone(), entry.original.clone()))
                .collect()
        };

        let mut set = JoinSet::new();
        for (key, original) in pending {
            let translator = Arc::clone(&self.translator);
            let language = language.to_string();
            set.spawn(async move {
                let result = translator
                    .translate(&original, CANONICAL_LANGUAGE, &language)
                    .await;
                (key, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            let Ok((key, result)) = joined else {
                continue;
            };

            if self.epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!("Display language changed, dropping translation for '{}'", key);
                continue;
            }

            let mut state = self.state.lock().await;
            if let Some(entry) = state.fields.get_mut(&key) {
                match result {
                    Ok(translated) => {
                        entry.translated = Some(translated);
                        entry.status = TranslationStatus::Done;
                    }
                    Err(e) => {
                        tracing::warn!("Translation of field '{}' failed: {}", key, e);
                        entry.translated = None;
                        entry.status = TranslationStatus::Error;
                    }
                }
            }
        }
    }
}
