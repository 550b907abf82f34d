use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedubError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation provider '{provider}' failed: {message}")]
    TranslationProvider { provider: String, message: String },

    #[error("All translation providers exhausted, last error: {0}")]
    AllProvidersExhausted(String),

    #[error("Translated line count does not match source at batch {batch}: expected {expected}, got {actual}")]
    TranslationAlignment {
        batch: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Speech synthesis provider failed: {0}")]
    SynthesisProvider(String),

    #[error("Synthesis failed for cue {index}: {message}")]
    Synthesis { index: usize, message: String },

    #[error("Composition failed: {0}")]
    Composition(String),

    #[error("Subtitle parse error: {0}")]
    SubtitleParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, RedubError>;
