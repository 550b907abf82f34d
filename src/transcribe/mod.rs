pub mod whisper;

pub use whisper::WhisperClient;

use crate::error::Result;
use crate::subtitle::Cue;
use async_trait::async_trait;
use std::path::Path;

/// Speech-to-text backend producing timed cues from an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Cue>>;

    fn name(&self) -> &'static str;
}
