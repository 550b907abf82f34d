//! Stage driver for the dubbing pipeline.
//!
//! Each stage reads the previous stage's artifact from disk and writes its
//! own, so any stage can be re-run in isolation via `--steps`.

use crate::audio::Compositor;
use crate::config::Config;
use crate::error::{RedubError, Result};
use crate::media;
use crate::subtitle::{self, merge, srt, TimingTable};
use crate::subtitle::batch;
use crate::transcribe::{Transcriber, WhisperClient};
use crate::translate::{default_backends, FallbackChain};
use crate::tts::{rate, resolve_voice, AzureSynthesizer, SynthesisScheduler};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// A runnable pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ExtractAudio,
    GenerateSrt,
    Translate,
    Tts,
    RemoveSubs,
    Compose,
    All,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "extract-audio" => Ok(Step::ExtractAudio),
            "generate-srt" => Ok(Step::GenerateSrt),
            "translate" => Ok(Step::Translate),
            "tts" => Ok(Step::Tts),
            "remove-subs" => Ok(Step::RemoveSubs),
            "compose" => Ok(Step::Compose),
            "all" => Ok(Step::All),
            _ => Err(format!(
                "unknown step '{s}' (expected: extract-audio, generate-srt, translate, tts, remove-subs, compose, all)"
            )),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ExtractAudio => "extract-audio",
            Step::GenerateSrt => "generate-srt",
            Step::Translate => "translate",
            Step::Tts => "tts",
            Step::RemoveSubs => "remove-subs",
            Step::Compose => "compose",
            Step::All => "all",
        };
        f.write_str(name)
    }
}

/// Options resolved from the command line.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub steps: Vec<Step>,
    /// Strip hard-coded subtitles before burning the translated ones.
    pub remove_subs: bool,
    /// Keep intermediate clip files for inspection.
    pub keep_temp: bool,
    /// Source language hint for transcription.
    pub source_language: Option<String>,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            steps: vec![Step::All],
            remove_subs: false,
            keep_temp: false,
            source_language: None,
            show_progress: true,
        }
    }
}

/// Per-run artifact paths derived from the input file name.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub audio: PathBuf,
    pub original_srt: PathBuf,
    pub translated_srt: PathBuf,
    pub dubbed_audio: PathBuf,
    pub video_no_subs: PathBuf,
    pub final_video: PathBuf,
}

impl Artifacts {
    pub fn derive(input: &Path, output: Option<&Path>) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        let named = |suffix: &str| dir.join(format!("{stem}{suffix}"));

        Self {
            audio: named("_audio.wav"),
            original_srt: named("_original.srt"),
            translated_srt: named("_translated.srt"),
            dubbed_audio: named("_dubbed.wav"),
            video_no_subs: named("_no_subs.mp4"),
            final_video: output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| named("_final.mp4")),
        }
    }
}

pub struct Pipeline {
    config: Config,
    options: PipelineOptions,
    input: PathBuf,
    artifacts: Artifacts,
}

impl Pipeline {
    pub fn new(
        config: Config,
        options: PipelineOptions,
        input: PathBuf,
        output: Option<PathBuf>,
    ) -> Result<Self> {
        if !input.exists() {
            return Err(RedubError::Validation(format!(
                "input file not found: {}",
                input.display()
            )));
        }
        let artifacts = Artifacts::derive(&input, output.as_deref());
        Ok(Self {
            config,
            options,
            input,
            artifacts,
        })
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub async fn run(&self) -> Result<()> {
        media::check_ffmpeg()?;
        media::check_ffprobe()?;

        let steps = self.resolve_steps();
        for (i, step) in steps.iter().enumerate() {
            info!("Stage {}/{}: {}", i + 1, steps.len(), step);
            match step {
                Step::ExtractAudio => self.extract_audio()?,
                Step::GenerateSrt => self.generate_srt().await?,
                Step::Translate => self.translate().await?,
                Step::Tts => self.synthesize().await?,
                Step::RemoveSubs => self.remove_subs()?,
                Step::Compose => self.compose()?,
                Step::All => unreachable!("expanded by resolve_steps"),
            }
        }
        Ok(())
    }

    /// Expand `all` into the concrete stage list. The subtitle-removal
    /// stage only participates when requested.
    fn resolve_steps(&self) -> Vec<Step> {
        if !self.options.steps.contains(&Step::All) {
            return self.options.steps.clone();
        }

        let mut steps = vec![
            Step::ExtractAudio,
            Step::GenerateSrt,
            Step::Translate,
            Step::Tts,
        ];
        if self.options.remove_subs {
            steps.push(Step::RemoveSubs);
        }
        steps.push(Step::Compose);
        steps
    }

    fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn extract_audio(&self) -> Result<()> {
        let pb = self.spinner("Extracting audio...");
        media::extract_audio(&self.input, &self.artifacts.audio)?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!("Audio: {}", self.artifacts.audio.display()));
        }
        Ok(())
    }

    async fn generate_srt(&self) -> Result<()> {
        self.config.validate_transcription()?;
        let api_key = self
            .config
            .openai_api_key
            .clone()
            .ok_or_else(|| RedubError::Config("OPENAI_API_KEY not set".to_string()))?;

        let mut client = WhisperClient::new(api_key);
        if let Some(ref lang) = self.options.source_language {
            client = client.with_language(lang.clone());
        }

        let pb = self.spinner("Transcribing audio...");
        let cues = client.transcribe(&self.artifacts.audio).await?;
        srt::write_file(&self.artifacts.original_srt, &cues)?;

        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} cues transcribed", cues.len()));
        }
        info!(
            "Transcript written to {}",
            self.artifacts.original_srt.display()
        );
        Ok(())
    }

    async fn translate(&self) -> Result<()> {
        let cues = srt::read_file(&self.artifacts.original_srt)?;
        if cues.is_empty() {
            return Err(RedubError::Validation(format!(
                "no cues in {}",
                self.artifacts.original_srt.display()
            )));
        }

        // Original timings are captured before merging so translated text
        // can be laid back onto the source timing grid.
        let timings = TimingTable::capture(&cues);
        let merged = merge::merge(&cues, &self.config.subtitle);

        let texts: Vec<String> = merged.iter().map(|c| c.text.clone()).collect();
        let batches = batch::partition(&texts, &self.config.subtitle);

        let pb = self.spinner(&format!("Translating {} batches...", batches.len()));
        let chain = FallbackChain::new(default_backends(), self.config.translation.clone());
        let translated_batches = chain
            .translate_texts(&batches, &self.config.target_language)
            .await?;
        let translated_texts = batch::reassemble(&batches, &translated_batches)?;

        // Batching skipped blank cues; hand translations back to the
        // non-blank merged cues in order.
        let mut translated = merged.clone();
        let mut next = translated_texts.into_iter();
        for cue in translated.iter_mut().filter(|c| !c.is_blank()) {
            match next.next() {
                Some(text) => cue.text = text,
                None => {
                    warn!("Ran out of translated texts at cue {}", cue.index);
                    break;
                }
            }
        }

        let restored = merge::restore(&translated, &timings);
        srt::write_file(&self.artifacts.translated_srt, &restored)?;

        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} cues translated", restored.len()));
        }
        info!(
            "Translated subtitles written to {}",
            self.artifacts.translated_srt.display()
        );
        Ok(())
    }

    async fn synthesize(&self) -> Result<()> {
        self.config.validate_synthesis()?;
        let (api_key, region) = match (
            self.config.azure_speech_key.clone(),
            self.config.azure_speech_region.clone(),
        ) {
            (Some(key), Some(region)) => (key, region),
            _ => {
                return Err(RedubError::Config(
                    "AZURE_SPEECH_KEY and AZURE_SPEECH_REGION must be set".to_string(),
                ))
            }
        };

        let cues = srt::read_file(&self.artifacts.translated_srt)?;
        let cues = subtitle::sort_by_start(cues);
        let rates = rate::smooth(&cues, &self.config.tts);

        let voice = resolve_voice(
            &self.config.target_language,
            self.config.voice.as_deref(),
        )?;
        info!("Synthesizing {} cues with voice {voice}", cues.len());

        let temp_dir = TempDir::new()?;
        let synthesizer = Arc::new(AzureSynthesizer::new(api_key, &region));
        let scheduler = SynthesisScheduler::new(synthesizer, self.config.tts.clone(), voice)
            .with_progress(self.options.show_progress);

        let segments = scheduler.run(&cues, &rates, temp_dir.path()).await?;

        // The dubbed track spans the whole video, not just the last cue.
        let total_duration = media::probe_duration(&self.input)?;
        let compositor = Compositor::new(self.config.tts.sample_rate, self.config.tts.channels);
        compositor.compose(&segments, total_duration, &self.artifacts.dubbed_audio)?;

        info!("Dubbed track: {}", self.artifacts.dubbed_audio.display());

        if self.options.keep_temp {
            let kept = temp_dir.keep();
            info!("Keeping temp files in {}", kept.display());
        }
        Ok(())
    }

    fn remove_subs(&self) -> Result<()> {
        let pb = self.spinner("Removing hard-coded subtitles...");
        media::remove_subtitles(&self.input, &self.artifacts.video_no_subs)?;
        if let Some(pb) = pb {
            pb.finish_with_message("Subtitles removed");
        }
        Ok(())
    }

    /// Burn the translated subtitles and swap in the dubbed track. A fatal
    /// failure leaves no partial final video behind.
    fn compose(&self) -> Result<()> {
        let source = if self.options.remove_subs && self.artifacts.video_no_subs.exists() {
            &self.artifacts.video_no_subs
        } else {
            &self.input
        };
        debug!("Composing final video from {}", source.display());

        let temp_dir = TempDir::new()?;
        let burned = temp_dir.path().join("burned.mp4");

        let pb = self.spinner("Composing final video...");
        let result = media::burn_subtitles(source, &self.artifacts.translated_srt, &burned)
            .and_then(|_| {
                media::mux_audio(&burned, &self.artifacts.dubbed_audio, &self.artifacts.final_video)
            });

        if let Err(e) = result {
            if self.artifacts.final_video.exists() {
                if let Err(rm) = std::fs::remove_file(&self.artifacts.final_video) {
                    warn!(
                        "Failed to remove partial output {}: {rm}",
                        self.artifacts.final_video.display()
                    );
                }
            }
            return Err(e);
        }

        if let Some(pb) = pb {
            pb.finish_with_message(format!(
                "Final video: {}",
                self.artifacts.final_video.display()
            ));
        }
        info!("Done: {}", self.artifacts.final_video.display());
        Ok(())
    }
}
