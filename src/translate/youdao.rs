//! Translation via the Youdao web endpoint.

use crate::error::{RedubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://fanyi.youdao.com";

pub struct YoudaoTranslator {
    client: Client,
    base_url: String,
}

impl YoudaoTranslator {
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
            provider: "youdao".to_string(),
            message: message.into(),
        }
    }
}

impl Default for YoudaoTranslator {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "zh" | "zh-cn" => "zh-CHS".to_string(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct YoudaoResponse {
    #[serde(rename = "translateResult")]
    translate_result: Option<Vec<Vec<YoudaoSegment>>>,
}

#[derive(Deserialize)]
struct YoudaoSegment {
    tgt: Option<String>,
}

#[async_trait]
impl Translator for YoudaoTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        debug!("Youdao translate request for {} chars", text.chars().count());

        let url = format!("{}/translate", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("doctype", "json"),
                ("type", "AUTO"),
                ("i", text),
                ("to", &normalize_language(target_lang)),
            ])
            .send()
            .await
            .map_err(|e| Self::provider_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::provider_error(format!("HTTP {status}")));
        }

        let body: YoudaoResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("invalid response body: {e}")))?;

        let rows = body
            .translate_result
            .ok_or_else(|| Self::provider_error("missing translateResult"))?;

        // One row per input line; segments within a row concatenate.
        let translated = rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|seg| seg.tgt.as_deref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");

        if translated.trim().is_empty() {
            return Err(Self::provider_error("empty translation"));
        }

        Ok(translated)
    }

    fn name(&self) -> &'static str {
        "youdao"
    }
}
