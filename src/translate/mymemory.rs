// MyMemory provider (fallback). Query-string GET form:
// /get?q=...&langpair=SOURCE|TARGET

use super::{TranslateError, TranslationProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";
const TIMEOUT_SECS: u64 = 15;

/// MyMemory expects region-qualified tags for a few languages; everything
/// else passes through unmapped.
const CODE_TABLE: &[(&str, &str)] = &[
    ("zh", "zh-CN"),
    ("pt", "pt-PT"),
    ("fil", "tl"),
];

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: ResponseData,
}

pub struct MyMemoryProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl MyMemoryProvider {
    pub fn new() -> Self {
        Self::with_endpoint(MYMEMORY_URL.to_string())
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

impl Default for MyMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryProvider {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let langpair = format!("{}|{}", Self::map_code(source), Self::map_code(target));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", text), ("langpair", &langpair)])
            .send()
            .await
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Provider(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let payload: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedPayload(e.to_string()))?;

        payload
            .response_data
            .translated_text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TranslateError::MalformedPayload("empty translatedText".to_string()))
    }

    fn name(&self) -> &str {
        "MyMemory"
    }
}
