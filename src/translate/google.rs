//! Translation via the public Google Translate web endpoint.

use crate::error::{RedubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

pub struct GoogleTranslator {
    client: Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the endpoint, used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn provider_error(message: impl Into<String>) -> RedubError {
        RedubError::TranslationProvider {
            provider: "google".to_string(),
            message: message.into(),
        }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

/// Map generic language codes onto the variants this endpoint accepts.
fn normalize_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" => "zh-CN".to_string(),
        "zh-tw" => "zh-TW".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let url = format!("{}/translate_a/single", self.base_url);
        debug!("Google translate request for {} chars", text.chars().count());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", &normalize_language(target_lang)),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::provider_error(format!("HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("invalid response body: {e}")))?;

        // The gtx response is a nested array; element [0] holds the
        // translated sentence fragments as [translated, source, ...].
        let fragments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| Self::provider_error("unexpected response shape"))?;

        let translated: String = fragments
            .iter()
            .filter_map(|f| f.get(0).and_then(|t| t.as_str()))
            .collect();

        if translated.trim().is_empty() {
            return Err(Self::provider_error("empty translation"));
        }

        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
