pub mod audio;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod tts;

pub use config::Config;
pub use error::{RedubError, Result};
pub use pipeline::{Artifacts, Pipeline, PipelineOptions, Step};
