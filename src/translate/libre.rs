// LibreTranslate provider (primary).

use super::{TranslateError, TranslationProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LIBRETRANSLATE_URL: &str = "https://libretranslate.de/translate";
const TIMEOUT_SECS: u64 = 15;

/// Canonical codes LibreTranslate understands directly. Unknown codes pass
/// through unmapped.
const CODE_TABLE: &[(&str, &str)] = &[
    ("en", "en"),
    ("es", "es"),
    ("fr", "fr"),
    ("de", "de"),
    ("it", "it"),
    ("pt", "pt"),
    ("ru", "ru"),
    ("zh", "zh"),
    ("ja", "ja"),
    ("hi", "hi"),
    ("ar", "ar"),
    ("ko", "ko"),
    ("nl", "nl"),
    ("pl", "pl"),
    ("tr", "tr"),
    ("cs", "cs"),
    ("uk", "uk"),
    ("vi", "vi"),
    ("sv", "sv"),
    ("fa", "fa"),
    ("id", "id"),
];

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct LibreTranslateProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl LibreTranslateProvider {
    pub fn new() -> Self {
        Self::with_endpoint(LIBRETRANSLATE_URL.to_string())
    }

    pub fn with_endpoint(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { endpoint, client }
    }

    fn map_code(code: &str) -> &str {
        CODE_TABLE
            .iter()
            .find(|(canonical, _)| *canonical == code)
            .map(|(_, mapped)| *mapped)
            .unwrap_or(code)
    }
}

impl Default for LibreTranslateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslateProvider {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: Self::map_code(source),
            target: Self::map_code(target),
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let payload: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedPayload(e.to_string()))?;

        Ok(payload.translated_text)
    }

    fn name(&self) -> &str {
        "LibreTranslate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_through_table() {
        assert_eq!(LibreTranslateProvider::map_code("hi"), "hi");
        assert_eq!(LibreTranslateProvider::map_code("uk"), "uk");
    }

    #[test]
    fn test_unknown_codes_pass_through() {
        assert_eq!(LibreTranslateProvider::map_code("fil"), "fil");
        assert_eq!(LibreTranslateProvider::map_code("sw"), "sw");
    }
}
