//! Media transcoder collaborator: thin wrappers over ffmpeg/ffprobe.
//!
//! The only contract with the transcoder is that the produced file exists
//! and is non-empty; anything else is treated as failure.

use crate::error::{RedubError, Result};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Check that ffmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        RedubError::Composition(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(RedubError::Composition("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check that ffprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        RedubError::Composition(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(RedubError::Composition("FFprobe check failed".to_string()));
    }

    Ok(())
}

/// Verify the transcoder contract: output exists and is non-empty.
fn verify_output(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| RedubError::Composition(format!("output file missing: {}", path.display())))?;
    if metadata.len() == 0 {
        return Err(RedubError::Composition(format!(
            "output file is empty: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Total duration of a media file.
pub fn probe_duration(input: &Path) -> Result<Duration> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| RedubError::Composition(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RedubError::Composition(format!("ffprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        RedubError::Composition(format!(
            "failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(Duration::from_secs_f64(duration_secs))
}

/// Width and height of the first video stream.
pub fn probe_dimensions(input: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(input)
        .output()
        .map_err(|e| RedubError::Composition(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RedubError::Composition(format!("ffprobe failed: {stderr}")));
    }

    let dims = String::from_utf8_lossy(&output.stdout);
    let mut parts = dims.trim().split('x');
    let width = parts
        .next()
        .and_then(|w| w.parse().ok())
        .ok_or_else(|| RedubError::Composition(format!("bad dimensions: {}", dims.trim())))?;
    let height = parts
        .next()
        .and_then(|h| h.parse().ok())
        .ok_or_else(|| RedubError::Composition(format!("bad dimensions: {}", dims.trim())))?;

    Ok((width, height))
}

/// Codec name of the first video stream.
fn probe_video_codec(input: &Path) -> Result<String> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name",
            "-of",
            "csv=p=0",
        ])
        .arg(input)
        .output()
        .map_err(|e| RedubError::Composition(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RedubError::Composition(format!("ffprobe failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Extract the audio track as 44.1 kHz stereo 16-bit PCM WAV.
pub fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    info!("Extracting audio from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "44100", "-ac", "2"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Composition(
            "ffmpeg audio extraction failed".to_string(),
        ));
    }

    verify_output(output)?;
    info!("Audio extracted to {}", output.display());
    Ok(())
}

/// Build an `atempo` filter chain for an arbitrary speed factor.
///
/// A single atempo stage only accepts factors in [0.5, 2.0], so larger
/// adjustments are expressed as a product of stages.
fn atempo_chain(factor: f64) -> String {
    let mut stages: Vec<f64> = Vec::new();
    let mut remaining = factor;

    while remaining > 2.0 {
        stages.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push(0.5);
        remaining /= 0.5;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|s| format!("atempo={s:.6}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Change audio playback speed by `factor` (>1.0 is faster).
pub fn change_speed(input: &Path, output: &Path, factor: f64) -> Result<()> {
    if factor <= 0.0 {
        return Err(RedubError::Composition(format!(
            "invalid speed factor: {factor}"
        )));
    }

    debug!("Changing speed of {} by {:.3}x", input.display(), factor);

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-filter:a", &atempo_chain(factor), "-acodec", "pcm_s16le"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Composition(
            "ffmpeg speed change failed".to_string(),
        ));
    }

    verify_output(output)
}

/// Remove hard-coded subtitles from the bottom quarter of the frame with
/// a delogo filter, falling back to cropping the bottom of the frame.
pub fn remove_subtitles(input: &Path, output: &Path) -> Result<()> {
    let (width, height) = probe_dimensions(input)?;
    let codec = probe_video_codec(input)?;

    let subtitle_y = (height as f64 * 0.75) as u32;
    let subtitle_h = (height as f64 * 0.25) as u32;
    let filter = format!("[0:v]delogo=x=0:y={subtitle_y}:w={width}:h={subtitle_h}:show=0[v]");

    info!("Removing subtitles from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-filter_complex", &filter])
        .args(["-map", "[v]", "-map", "0:a", "-c:a", "copy"])
        .args(["-c:v", &codec, "-sn", "-dn"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if status.success() && verify_output(output).is_ok() {
        return Ok(());
    }

    warn!("delogo subtitle removal failed, trying crop fallback");
    remove_subtitles_fallback(input, output)
}

/// Fallback subtitle removal: crop off the bottom 15% of the frame.
fn remove_subtitles_fallback(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vf", "crop=iw:ih*0.85:0:0"])
        .args(["-map", "0:v", "-map", "0:a", "-c:a", "copy"])
        .args(["-sn", "-dn", "-max_muxing_queue_size", "1024"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Composition(
            "fallback subtitle removal failed".to_string(),
        ));
    }

    verify_output(output)
}

/// Burn a subtitle file into the video stream.
///
/// `.ass` files carry their own style block and are passed through to the
/// `ass` filter untouched; SRT gets a force_style with a font size picked
/// for the orientation (portrait video uses the smaller font).
pub fn burn_subtitles(input: &Path, subtitles: &Path, output: &Path) -> Result<()> {
    let (width, height) = probe_dimensions(input)?;
    let font_size = if height > width { 12 } else { 18 };

    let subtitle_path = subtitles.display();
    let is_ass = subtitles
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ass"))
        .unwrap_or(false);

    let filter = if is_ass {
        format!("ass={subtitle_path}")
    } else {
        format!(
            "subtitles={subtitle_path}:force_style='Fontname=STHeiti,FontSize={font_size},\
             PrimaryColour=&HFFFFFF&,BorderStyle=1,Outline=1.5,Shadow=0.5,Alignment=2,MarginV=10'"
        )
    };

    info!("Burning subtitles into {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vf", &filter, "-c:a", "copy"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(RedubError::Composition(
            "subtitle burn-in failed".to_string(),
        ));
    }

    verify_output(output)
}

/// Replace the video's audio track with the dubbed one.
///
/// On failure no partial output file is left behind.
pub fn mux_audio(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    info!("Muxing {} + {}", video.display(), audio.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(video)
        .arg("-i")
        .arg(audio)
        .args(["-c:v", "copy", "-c:a", "aac"])
        .args(["-map", "0:v:0", "-map", "1:a:0", "-shortest"])
        .arg(output)
        .status()
        .map_err(|e| RedubError::Composition(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() || verify_output(output).is_err() {
        if output.exists() {
            if let Err(e) = std::fs::remove_file(output) {
                warn!("Failed to remove partial output {}: {e}", output.display());
            }
        }
        return Err(RedubError::Composition("audio mux failed".to_string()));
    }

    Ok(())
}
