//! SRT parsing and composition.

use super::Cue;
use crate::error::{RedubError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

fn timing_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{1,3})")
            .expect("valid regex")
    })
}

/// Parse SRT content into cues.
///
/// Blocks are separated by blank lines: index, timing line, then one or more
/// text lines. A leading BOM is tolerated.
pub fn parse(content: &str) -> Result<Vec<Cue>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    let mut cues = Vec::new();
    for block in content.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let mut lines = block.lines();

        let index_line = lines
            .next()
            .ok_or_else(|| RedubError::SubtitleParse("empty block".to_string()))?;
        let index: usize = index_line.trim().parse().map_err(|_| {
            RedubError::SubtitleParse(format!("invalid cue index: {index_line:?}"))
        })?;

        let timing_line = lines.next().ok_or_else(|| {
            RedubError::SubtitleParse(format!("cue {index}: missing timing line"))
        })?;
        let (start, end) = parse_timing_line(timing_line)
            .ok_or_else(|| RedubError::SubtitleParse(format!("cue {index}: bad timing line: {timing_line:?}")))?;

        let text = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        cues.push(Cue {
            index,
            start,
            end,
            text,
        });
    }

    Ok(cues)
}

fn parse_timing_line(line: &str) -> Option<(Duration, Duration)> {
    let caps = timing_line_regex().captures(line)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

    let start = timestamp(field(1)?, field(2)?, field(3)?, field(4)?);
    let end = timestamp(field(5)?, field(6)?, field(7)?, field(8)?);
    Some((start, end))
}

fn timestamp(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Duration {
    Duration::from_millis(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Compose cues into SRT text.
pub fn compose(cues: &[Cue]) -> String {
    cues.iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n",
                cue.index,
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Read and parse an SRT file.
pub fn read_file(path: &Path) -> Result<Vec<Cue>> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Compose and write cues to an SRT file.
pub fn write_file(path: &Path, cues: &[Cue]) -> Result<()> {
    std::fs::write(path, compose(cues))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n2\n00:00:04,500 --> 00:00:07,000\nSecond line\nwith a wrap\n";

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(Duration::from_millis(1500)),
            "00:00:01,500"
        );
        assert_eq!(
            format_timestamp(Duration::from_secs(3661) + Duration::from_millis(123)),
            "01:01:01,123"
        );
    }

    #[test]
    fn test_parse_sample() {
        let cues = parse(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, Duration::from_millis(1500));
        assert_eq!(cues[0].end, Duration::from_millis(4000));
        assert_eq!(cues[0].text, "Hello, world!");
        assert_eq!(cues[1].text, "Second line\nwith a wrap");
    }

    #[test]
    fn test_parse_tolerates_bom_and_crlf() {
        let input = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        let cues = parse(&input).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello, world!");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_timing() {
        let input = "1\nnot a timing line\nText\n";
        assert!(parse(input).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_index() {
        let input = "one\n00:00:01,000 --> 00:00:02,000\nText\n";
        assert!(parse(input).is_err());
    }

    #[test]
    fn test_round_trip() {
        let cues = parse(SAMPLE).unwrap();
        let recomposed = compose(&cues);
        let reparsed = parse(&recomposed).unwrap();
        assert_eq!(cues, reparsed);
    }

    #[test]
    fn test_compose_format() {
        let cues = vec![Cue {
            index: 1,
            start: Duration::from_millis(1500),
            end: Duration::from_millis(4000),
            text: "Hello".to_string(),
        }];
        assert_eq!(compose(&cues), "1\n00:00:01,500 --> 00:00:04,000\nHello\n");
    }
}
