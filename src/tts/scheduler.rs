//! Chunked synthesis scheduling with retries and rate limiting.
//!
//! Cues are processed in fixed-size chunks. Chunks run strictly in order;
//! requests within a chunk run concurrently. Clips land as per-cue WAV
//! files in the work directory, keyed by cue index.

use crate::audio::AudioSegment;
use crate::config::TtsConfig;
use crate::error::{RedubError, Result};
use crate::media;
use crate::subtitle::Cue;
use crate::tts::rate::format_rate;
use crate::tts::Synthesizer;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rate magnitude above which the provider's prosody shift alone sounds
/// unnatural; the remainder is applied as an audio-level tempo change.
const MODERATE_RATE_THRESHOLD: i32 = 20;
/// Share of the rate the provider is asked for in the moderated path.
const MODERATE_RATE_SHARE: f64 = 0.7;

pub struct SynthesisScheduler {
    synthesizer: Arc<dyn Synthesizer>,
    config: TtsConfig,
    voice_id: String,
    show_progress: bool,
}

impl SynthesisScheduler {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, config: TtsConfig, voice_id: String) -> Self {
        Self {
            synthesizer,
            config,
            voice_id,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Synthesize every cue into `work_dir`, returning the produced clips
    /// ordered by cue index. Blank cues produce no clip. A cue that fails
    /// after all retries aborts the run, or is skipped with a warning when
    /// `ignore_errors` is set.
    pub async fn run(&self, cues: &[Cue], rates: &[i32], work_dir: &Path) -> Result<Vec<AudioSegment>> {
        let mut segments: Vec<(usize, AudioSegment)> = Vec::with_capacity(cues.len());
        let jobs: Vec<(usize, &Cue, i32)> = cues
            .iter()
            .zip(rates.iter())
            .enumerate()
            .filter(|(_, (cue, _))| !cue.text.trim().is_empty())
            .map(|(i, (cue, rate))| (i, cue, *rate))
            .collect();

        info!(
            "Synthesizing {} cues in chunks of {}",
            jobs.len(),
            self.config.chunk_size
        );

        let progress = self.progress_bar(jobs.len() as u64);
        let chunks: Vec<_> = jobs.chunks(self.config.chunk_size.max(1)).collect();
        let chunk_count = chunks.len();

        for (chunk_no, chunk) in chunks.into_iter().enumerate() {
            debug!("Processing chunk {}/{}", chunk_no + 1, chunk_count);

            let mut futures = FuturesUnordered::new();
            for &(index, cue, rate) in chunk {
                futures.push(self.synthesize_cue(index, cue, rate, work_dir));
            }

            // A fatal failure lets in-flight siblings finish, then blocks
            // later chunks.
            let mut fatal: Option<RedubError> = None;
            while let Some(result) = futures.next().await {
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                match result {
                    Ok((index, segment)) => segments.push((index, segment)),
                    Err(RedubError::Synthesis { index, message }) if self.config.ignore_errors => {
                        warn!("Skipping cue {index} after exhausted retries: {message}");
                    }
                    Err(e) => {
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = fatal {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                return Err(e);
            }

            if chunk_no + 1 < chunk_count && self.config.chunk_interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.chunk_interval_ms)).await;
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Synthesis complete");
        }

        segments.sort_by_key(|(index, _)| *index);
        Ok(segments.into_iter().map(|(_, segment)| segment).collect())
    }

    fn progress_bar(&self, total: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{bar:40.green} {pos}/{len} {msg}")
        {
            pb.set_style(style);
        }
        Some(pb)
    }

    /// Synthesize one cue with retries, writing the clip to
    /// `cue_{index}.wav` in the work directory.
    async fn synthesize_cue(
        &self,
        index: usize,
        cue: &Cue,
        rate: i32,
        work_dir: &Path,
    ) -> Result<(usize, AudioSegment)> {
        let path = work_dir.join(format!("cue_{index}.wav"));

        let mut delay = Duration::from_millis(self.config.base_delay_ms);
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!(
                    "Retry {attempt}/{} for cue {index} after {:?}",
                    self.config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(delay.as_secs_f64() * self.config.backoff_factor);
            }

            match self.synthesize_once(cue, rate, &path).await {
                Ok(()) => {
                    let segment = AudioSegment {
                        path: path.clone(),
                        start: cue.start,
                        end: cue.end,
                    };
                    return Ok((index, segment));
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!("Synthesis attempt {} for cue {index} failed: {e}", attempt + 1);
                }
            }
        }

        Err(RedubError::Synthesis {
            index,
            message: last_error,
        })
    }

    async fn synthesize_once(&self, cue: &Cue, rate: i32, path: &Path) -> Result<()> {
        if rate.abs() > MODERATE_RATE_THRESHOLD {
            return self.synthesize_moderated(cue, rate, path).await;
        }

        let audio = self.call_provider(&cue.text, rate).await?;
        tokio::fs::write(path, audio).await?;
        Ok(())
    }

    /// Extreme rates split into a moderated provider rate plus an ffmpeg
    /// tempo pass covering the remainder.
    async fn synthesize_moderated(&self, cue: &Cue, rate: i32, path: &Path) -> Result<()> {
        let base_rate = (rate as f64 * MODERATE_RATE_SHARE) as i32;
        let remaining = rate - base_rate;
        let factor = if remaining >= 0 {
            1.0 + remaining as f64 / 100.0
        } else {
            1.0 / (1.0 - remaining as f64 / 100.0)
        };

        debug!(
            "Rate {} split into provider {} + tempo {:.3}x",
            format_rate(rate),
            format_rate(base_rate),
            factor
        );

        let audio = self.call_provider(&cue.text, base_rate).await?;
        let raw_path = raw_clip_path(path);
        tokio::fs::write(&raw_path, audio).await?;

        media::change_speed(&raw_path, path, factor)?;
        if let Err(e) = tokio::fs::remove_file(&raw_path).await {
            warn!("Failed to remove intermediate clip {}: {e}", raw_path.display());
        }
        Ok(())
    }

    async fn call_provider(&self, text: &str, rate: i32) -> Result<Vec<u8>> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(timeout, self.synthesizer.synthesize(text, &self.voice_id, rate))
            .await
            .map_err(|_| {
                RedubError::SynthesisProvider(format!(
                    "{} timed out after {}s",
                    self.synthesizer.name(),
                    self.config.timeout_secs
                ))
            })?
    }
}

fn raw_clip_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .to_string();
    name.push_str("_raw.wav");
    path.with_file_name(name)
}
