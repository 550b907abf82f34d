//! Speech synthesis via the Azure Cognitive Services TTS REST API.

use crate::error::{RedubError, Result};
use crate::tts::rate::format_rate;
use crate::tts::Synthesizer;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Output format requested from the service; the rest of the pipeline
/// normalizes sample rate and channels during composition.
const OUTPUT_FORMAT: &str = "riff-44100hz-16bit-mono-pcm";

pub struct AzureSynthesizer {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AzureSynthesizer {
    pub fn new(api_key: String, region: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: format!("https://{region}.tts.speech.microsoft.com"),
        }
    }

    /// Override the endpoint, used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_ssml(text: &str, voice_id: &str, rate_percent: i32) -> String {
        let lang = voice_language(voice_id);
        format!(
            "<speak version='1.0' xml:lang='{lang}'><voice name='{voice_id}'>\
             <prosody rate='{}'>{}</prosody></voice></speak>",
            format_rate(rate_percent),
            escape_xml(text)
        )
    }
}

/// The locale prefix of a provider voice id, e.g. `zh-CN` of
/// `zh-CN-XiaoxiaoNeural`.
fn voice_language(voice_id: &str) -> String {
    voice_id
        .splitn(3, '-')
        .take(2)
        .collect::<Vec<_>>()
        .join("-")
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Synthesizer for AzureSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str, rate_percent: i32) -> Result<Vec<u8>> {
        let ssml = Self::build_ssml(text, voice_id, rate_percent);
        debug!(
            "Synthesizing {} chars with voice {} at {}",
            text.chars().count(),
            voice_id,
            format_rate(rate_percent)
        );

        let url = format!("{}/cognitiveservices/v1", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "redub")
            .body(ssml)
            .send()
            .await
            .map_err(|e| RedubError::SynthesisProvider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedubError::SynthesisProvider(format!(
                "HTTP {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RedubError::SynthesisProvider(format!("failed to read audio: {e}")))?;

        if bytes.is_empty() {
            return Err(RedubError::SynthesisProvider(
                "provider returned empty audio".to_string(),
            ));
        }

        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}
