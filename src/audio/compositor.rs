//! Timeline composition: clips are overlaid onto a silent master track.
//!
//! Clips are mixed additively at their start offsets, with channel and
//! sample-rate normalization to the output format. Overlapping clips sum;
//! samples clamp at the 16-bit range instead of wrapping.

use crate::audio::AudioSegment;
use crate::error::{RedubError, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Compositor {
    sample_rate: u32,
    channels: u16,
}

impl Compositor {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Mix all clips onto a silent track of `total_duration` and write the
    /// result to `output`. The track grows if a clip runs past the end.
    /// Clip files are deleted after a successful merge.
    pub fn compose(
        &self,
        segments: &[AudioSegment],
        total_duration: Duration,
        output: &Path,
    ) -> Result<()> {
        let total_frames = (total_duration.as_secs_f64() * self.sample_rate as f64) as usize;
        let mut track: Vec<i32> = vec![0; total_frames * self.channels as usize];

        info!(
            "Composing {} clips onto a {:.1}s track",
            segments.len(),
            total_duration.as_secs_f64()
        );

        for segment in segments {
            let samples = self.read_clip(&segment.path)?;
            let offset_frame = (segment.start.as_secs_f64() * self.sample_rate as f64) as usize;
            let offset = offset_frame * self.channels as usize;

            let end = offset + samples.len();
            if end > track.len() {
                debug!(
                    "Clip {} overruns the track by {} samples, growing",
                    segment.path.display(),
                    end - track.len()
                );
                track.resize(end, 0);
            }

            for (i, sample) in samples.iter().enumerate() {
                track[offset + i] += *sample as i32;
            }
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(output, spec)?;
        for sample in &track {
            writer.write_sample((*sample).clamp(i16::MIN as i32, i16::MAX as i32) as i16)?;
        }
        writer.finalize()?;

        let metadata = std::fs::metadata(output)?;
        if metadata.len() == 0 {
            return Err(RedubError::Composition(format!(
                "composed track is empty: {}",
                output.display()
            )));
        }

        for segment in segments {
            if let Err(e) = std::fs::remove_file(&segment.path) {
                warn!("Failed to remove clip {}: {e}", segment.path.display());
            }
        }

        info!("Dubbed track written to {}", output.display());
        Ok(())
    }

    /// Read a clip and normalize it to the output channel count and
    /// sample rate, returning interleaved 16-bit samples.
    fn read_clip(&self, path: &Path) -> Result<Vec<i16>> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<_, _>>()?,
        };

        let samples = normalize_channels(samples, spec.channels, self.channels);
        let samples = resample(samples, self.channels, spec.sample_rate, self.sample_rate);
        Ok(samples)
    }
}

/// Convert interleaved samples between channel layouts. Mono to stereo
/// duplicates, stereo to mono averages; anything else keeps the first
/// `to` channels of each frame.
fn normalize_channels(samples: Vec<i16>, from: u16, to: u16) -> Vec<i16> {
    if from == to || from == 0 {
        return samples;
    }

    let from = from as usize;
    let to = to as usize;

    if from == 1 && to == 2 {
        let mut out = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            out.push(sample);
            out.push(sample);
        }
        return out;
    }

    if from == 2 && to == 1 {
        return samples
            .chunks_exact(2)
            .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
            .collect();
    }

    samples
        .chunks(from)
        .flat_map(|frame| {
            let mut out: Vec<i16> = frame.iter().take(to).copied().collect();
            out.resize(to, *frame.first().unwrap_or(&0));
            out
        })
        .collect()
}

/// Linear-interpolation resampling of interleaved samples.
fn resample(samples: Vec<i16>, channels: u16, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 {
        return samples;
    }

    let channels = channels.max(1) as usize;
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }

    let out_frames = (in_frames as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for frame in 0..out_frames {
        let src_pos = frame as f64 * from_rate as f64 / to_rate as f64;
        let src_frame = src_pos as usize;
        let frac = src_pos - src_frame as f64;
        let next_frame = (src_frame + 1).min(in_frames - 1);

        for ch in 0..channels {
            let a = samples[src_frame * channels + ch] as f64;
            let b = samples[next_frame * channels + ch] as f64;
            out.push((a + (b - a) * frac) as i16);
        }
    }

    out
}
