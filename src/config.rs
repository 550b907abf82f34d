use crate::error::{RedubError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunables for subtitle merging and translation batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Merge cues whose inter-cue gap is at most this many milliseconds.
    pub merge_threshold_ms: u64,
    /// Maximum characters for one merged cue.
    pub max_chars: usize,
    /// Maximum cues per translation batch.
    pub batch_size: usize,
    /// Maximum characters per translation batch.
    pub max_chars_per_batch: usize,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            merge_threshold_ms: 200,
            max_chars: 50,
            batch_size: 5,
            max_chars_per_batch: 500,
        }
    }
}

/// Tunables for the translation fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Attempts per backend before moving to the next one.
    pub max_retries: u32,
    /// Fixed delay between retries of one backend, in milliseconds.
    pub retry_delay_ms: u64,
    /// Politeness delay between consecutive successful requests, in milliseconds.
    pub request_interval_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            request_interval_ms: 1500,
            timeout_secs: 10,
        }
    }
}

/// Tunables for speech-rate calculation and synthesis scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Lower bound for the rate percentage (maximum slow-down).
    pub min_speed: i32,
    /// Upper bound for the rate percentage (maximum speed-up).
    pub max_speed: i32,
    /// Dampening factor applied to the computed rate.
    pub adjust_factor: f64,
    /// Maximum allowed rate difference between adjacent cues.
    pub max_speed_diff: i32,
    /// Number of synthesis requests issued concurrently per chunk.
    pub chunk_size: usize,
    /// Retries per cue on transient synthesis failure.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff multiplier applied after each failed attempt.
    pub backoff_factor: f64,
    /// Pause between chunks in milliseconds (provider rate limiting).
    pub chunk_interval_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Skip failed cues instead of aborting the run.
    pub ignore_errors: bool,
    /// Sample rate of the dubbed track.
    pub sample_rate: u32,
    /// Channel count of the dubbed track.
    pub channels: u16,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            min_speed: -5,
            max_speed: 25,
            adjust_factor: 0.9,
            max_speed_diff: 10,
            chunk_size: 4,
            max_retries: 3,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            chunk_interval_ms: 1000,
            timeout_secs: 30,
            ignore_errors: false,
            sample_rate: 44100,
            channels: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub azure_speech_key: Option<String>,
    pub azure_speech_region: Option<String>,
    /// Target language for translation and dubbing.
    pub target_language: String,
    /// Voice name override; the per-language default is used when unset.
    pub voice: Option<String>,
    pub subtitle: SubtitleConfig,
    pub translation: TranslationConfig,
    pub tts: TtsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            azure_speech_key: None,
            azure_speech_region: None,
            target_language: "zh-cn".to_string(),
            voice: None,
            subtitle: SubtitleConfig::default(),
            translation: TranslationConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("AZURE_SPEECH_KEY") {
            config.azure_speech_key = Some(key);
        }
        if let Ok(region) = std::env::var("AZURE_SPEECH_REGION") {
            config.azure_speech_region = Some(region);
        }
        if let Ok(lang) = std::env::var("REDUB_TARGET_LANGUAGE") {
            config.target_language = lang;
        }
        if let Ok(chunk_size) = std::env::var("REDUB_CONCURRENCY") {
            if let Ok(c) = chunk_size.parse() {
                config.tts.chunk_size = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tts.chunk_size == 0 {
            return Err(RedubError::Config(
                "tts.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.tts.min_speed > self.tts.max_speed {
            return Err(RedubError::Config(format!(
                "tts.min_speed ({}) must not exceed tts.max_speed ({})",
                self.tts.min_speed, self.tts.max_speed
            )));
        }
        if self.tts.backoff_factor < 1.0 {
            return Err(RedubError::Config(
                "tts.backoff_factor must be at least 1.0".to_string(),
            ));
        }
        if self.subtitle.batch_size == 0 || self.subtitle.max_chars_per_batch == 0 {
            return Err(RedubError::Config(
                "subtitle batch limits must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that the keys needed for transcription are present.
    pub fn validate_transcription(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            return Err(RedubError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that the keys needed for speech synthesis are present.
    pub fn validate_synthesis(&self) -> Result<()> {
        if self.azure_speech_key.is_none() {
            return Err(RedubError::Config(
                "AZURE_SPEECH_KEY not set. Create a Speech resource in the Azure portal."
                    .to_string(),
            ));
        }
        if self.azure_speech_region.is_none() {
            return Err(RedubError::Config(
                "AZURE_SPEECH_REGION not set (e.g. eastus)".to_string(),
            ));
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("redub").join("config.toml"))
    }
}
