// Text translation with a primary/fallback provider chain.

mod libre;
mod mymemory;

pub use libre::LibreTranslateProvider;
pub use mymemory::MyMemoryProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// The fixed base language all persisted text is stored in.
pub const CANONICAL_LANGUAGE: &str = "en";

/// Languages offered for recording spoken answers.
pub const RECORDING_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("hi", "Hindi"),
    ("es", "Spanish"),
    ("de", "German"),
];

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    #[error("Translation unavailable (primary: {primary}; fallback: {fallback})")]
    Unavailable { primary: String, fallback: String },
}

/// A single translation backend
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError>;

    fn name(&self) -> &str;
}

/// Primary-then-fallback translation chain with an identity fast path and a
/// per-session memo keyed by (text, target language).
pub struct TranslationClient {
    primary: Box<dyn TranslationProvider>,
    fallback: Box<dyn TranslationProvider>,
    memo: std::sync::Mutex<HashMap<(String, String), String>>,
}

impl TranslationClient {
    pub fn new(
        primary: Box<dyn TranslationProvider>,
        fallback: Box<dyn TranslationProvider>,
    ) -> Self {
        Self {
            primary,
            fallback,
            memo: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Default chain: LibreTranslate primary, MyMemory fallback.
    pub fn with_default_providers() -> Self {
        Self::new(
            Box::new(LibreTranslateProvider::new()),
            Box::new(MyMemoryProvider::new()),
        )
    }

    /// Translate `text` from `source` to `target`.
    ///
    /// When source and target agree, or the text is empty, the input comes
    /// back unchanged with no network call. Otherwise the primary provider
    /// is tried, then the fallback exactly once.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        if text.is_empty() || source == target {
            return Ok(text.to_string());
        }

        let memo_key = (text.to_string(), target.to_string());
        if let Ok(memo) = self.memo.lock() {
            if let Some(hit) = memo.get(&memo_key) {
                return Ok(hit.clone());
            }
        }

        let primary_err = match self.primary.translate(text, source, target).await {
            Ok(translated) => {
                self.remember(memo_key, &translated);
                return Ok(translated);
            }
            Err(e) => {
                tracing::warn!(
                    "Primary translator '{}' failed ({} -> {}): {}, trying fallback",
                    self.primary.name(),
                    source,
                    target,
                    e
                );
                e
            }
        };

        match self.fallback.translate(text, source, target).await {
            Ok(translated) => {
                self.remember(memo_key, &translated);
                Ok(translated)
            }
            Err(fallback_err) => {
                tracing::error!(
                    "Fallback translator '{}' also failed ({} -> {}): {}",
                    self.fallback.name(),
                    source,
                    target,
                    fallback_err
                );
                Err(TranslateError::Unavailable {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    /// Translate into the canonical storage language.
    pub async fn to_canonical(&self, text: &str, source: &str) -> Result<String, TranslateError> {
        self.translate(text, source, CANONICAL_LANGUAGE).await
    }

    /// Translate a batch of keyed items concurrently.
    ///
    /// Items are independent: one failure never aborts its siblings, and
    /// each key resolves to its own result.
    pub async fn translate_batch<K>(
        self: &Arc<Self>,
        items: Vec<(K, String)>,
        source: &str,
        target: &str,
    ) -> Vec<(K, Result<String, TranslateError>)>
    where
        K: Send + 'static,
    {
        let mut set = JoinSet::new();

        for (key, text) in items {
            let client = Arc::clone(self);
            let source = source.to_string();
            let target = target.to_string();
            set.spawn(async move {
                let result = client.translate(&text, &source, &target).await;
                (key, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(pair) => results.push(pair),
                Err(e) => tracing::error!("Batch translation task panicked: {}", e),
            }
        }
        results
    }

    fn remember(&self, key: (String, String), translated: &str) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, translated.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        prefix: &'static str,
        fail_on: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn ok(prefix: &'static str) -> (Box<dyn TranslationProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    prefix,
                    fail_on: None,
                    calls: calls.clone(),
                }),
                calls,
            )
        }

        fn failing(prefix: &'static str) -> (Box<dyn TranslationProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    prefix,
                    fail_on: Some("*"),
                    calls: calls.clone(),
                }),
                calls,
            )
        }

        fn failing_on(
            prefix: &'static str,
            text: &'static str,
        ) -> (Box<dyn TranslationProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    prefix,
                    fail_on: Some(text),
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl TranslationProvider for FakeProvider {
        async fn translate(
            &self,
            text: &str,
            _source: &str,
            target: &str,
        ) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_on {
                Some("*") => Err(TranslateError::Network("connection refused".into())),
                Some(t) if t == text => Err(TranslateError::Network("connection refused".into())),
                _ => Ok(format!("{}:{}:{}", self.prefix, target, text)),
            }
        }

        fn name(&self) -> &str {
            self.prefix
        }
    }

    #[tokio::test]
    async fn test_identity_fast_path_makes_no_network_call() {
        let (primary, primary_calls) = FakeProvider::ok("p");
        let (fallback, fallback_calls) = FakeProvider::ok("f");
        let client = TranslationClient::new(primary, fallback);

        let out = client.translate("Hello world", "en", "en").await.unwrap();
        assert_eq!(out, "Hello world");

        let empty = client.translate("", "fr", "en").await.unwrap();
        assert_eq!(empty, "");

        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_attempted_exactly_once() {
        let (primary, primary_calls) = FakeProvider::failing("p");
        let (fallback, fallback_calls) = FakeProvider::ok("f");
        let client = TranslationClient::new(primary, fallback);

        let out = client.translate("Bonjour", "fr", "en").await.unwrap();
        assert_eq!(out, "f:en:Bonjour");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_providers_exhausted() {
        let (primary, primary_calls) = FakeProvider::failing("p");
        let (fallback, fallback_calls) = FakeProvider::failing("f");
        let client = TranslationClient::new(primary, fallback);

        let err = client.translate("Bonjour", "fr", "en").await.unwrap_err();
        assert!(matches!(err, TranslateError::Unavailable { .. }));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memo_avoids_repeat_calls() {
        let (primary, primary_calls) = FakeProvider::ok("p");
        let (fallback, _) = FakeProvider::ok("f");
        let client = TranslationClient::new(primary, fallback);

        let first = client.translate("Great answer", "en", "es").await.unwrap();
        let second = client.translate("Great answer", "en", "es").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_items_fail_independently() {
        let (primary, _) = FakeProvider::failing_on("p", "bad");
        let (fallback, _) = FakeProvider::failing_on("f", "bad");
        let client = Arc::new(TranslationClient::new(primary, fallback));

        let items = vec![
            ("q", "question text".to_string()),
            ("bad", "bad".to_string()),
            ("a", "answer text".to_string()),
        ];
        let mut results = client.translate_batch(items, "en", "es").await;
        results.sort_by_key(|(k, _)| *k);

        assert_eq!(results.len(), 3);
        let by_key: HashMap<_, _> = results.into_iter().collect();
        assert!(by_key["q"].is_ok());
        assert!(by_key["a"].is_ok());
        assert!(by_key["bad"].is_err());
    }
}
