use crate::error::{RedubError, Result};
use crate::subtitle::Cue;
use crate::transcribe::Transcriber;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Upload cap enforced by the API (25 MB).
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_MS: u64 = 1000;

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    language: Option<String>,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            language: None,
        }
    }

    /// Hint the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Override the endpoint, used by tests.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn request(&self, audio_path: &Path) -> Result<WhisperResponse> {
        // The form is consumed by send, so each attempt rebuilds it.
        let bytes = tokio::fs::read(audio_path).await?;
        let name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(name).mime_str("audio/wav")?)
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");
        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Whisper API responded {status}");

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let detail = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(RedubError::Transcription(format!(
            "Whisper API error ({status}): {detail}"
        )))
    }

    fn retryable(error: &RedubError) -> bool {
        // Client errors (bad key, malformed request) won't improve.
        !matches!(error, RedubError::Transcription(msg) if msg.contains("(4"))
    }

    /// Map API segments onto numbered cues. A response without segments
    /// degrades to one cue covering the whole audio.
    fn into_cues(response: WhisperResponse) -> Vec<Cue> {
        match response.segments {
            Some(segments) if !segments.is_empty() => segments
                .into_iter()
                .enumerate()
                .map(|(i, seg)| Cue {
                    index: i + 1,
                    start: Duration::from_secs_f64(seg.start.max(0.0)),
                    end: Duration::from_secs_f64(seg.end.max(0.0)),
                    text: seg.text.trim().to_string(),
                })
                .collect(),
            _ => vec![Cue {
                index: 1,
                start: Duration::ZERO,
                end: Duration::from_secs_f64(response.duration.max(0.0)),
                text: response.text.trim().to_string(),
            }],
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Cue>> {
        let size = tokio::fs::metadata(audio_path).await?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(RedubError::Transcription(format!(
                "File too large for Whisper API: {size} bytes (max {MAX_UPLOAD_BYTES} bytes)"
            )));
        }

        debug!("Transcribing {}", audio_path.display());

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = RETRY_BASE_MS * 2u64.pow(attempt - 1);
                debug!("Retrying transcription after {delay}ms");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.request(audio_path).await {
                Ok(response) => {
                    let cues = Self::into_cues(response);
                    debug!("Whisper returned {} cues", cues.len());
                    return Ok(cues);
                }
                Err(e) if Self::retryable(&e) => {
                    warn!("Transcription attempt {} failed: {e}", attempt + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| RedubError::Transcription("unknown error".to_string())))
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
