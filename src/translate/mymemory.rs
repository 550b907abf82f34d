//! Translation via the MyMemory REST API.

use crate::error::{RedubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.mymemory.translated.net";

pub struct MyMemoryTranslator {
    client: Client,
    base_url: String,
    source_lang: String,
}

impl MyMemoryTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            source_lang: "en".to_string(),
        }
    }

    /// Override the endpoint, used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the source language (MyMemory requires an explicit pair).
    pub fn with_source(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }

    fn provider_error(message: impl Into<String>) -> RedubError {
        RedubError::TranslationProvider {
            provider: "mymemory".to_string(),
            message: message.into(),
        }
    }
}

impl Default for MyMemoryTranslator {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" => "zh-CN".to_string(),
        "zh-tw" => "zh-TW".to_string(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseData")]
    response_data: Option<MyMemoryData>,
    #[serde(rename = "responseStatus")]
    response_status: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let langpair = format!(
            "{}|{}",
            self.source_lang,
            normalize_language(target_lang)
        );
        debug!("MyMemory translate request, langpair {}", langpair);

        let url = format!("{}/get", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", text), ("langpair", &langpair)])
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::provider_error(format!("HTTP {status}")));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("invalid response body: {e}")))?;

        // responseStatus is sometimes a number, sometimes a string.
        let ok = match &body.response_status {
            Some(serde_json::Value::Number(n)) => n.as_i64() == Some(200),
            Some(serde_json::Value::String(s)) => s == "200",
            _ => false,
        };
        if !ok {
            return Err(Self::provider_error("non-200 response status"));
        }

        let translated = body
            .response_data
            .and_then(|d| d.translated_text)
            .unwrap_or_default();

        if translated.trim().is_empty() {
            return Err(Self::provider_error("empty translation"));
        }

        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "mymemory"
    }
}
