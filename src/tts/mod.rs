pub mod azure;
pub mod rate;
pub mod scheduler;

pub use azure::AzureSynthesizer;
pub use scheduler::SynthesisScheduler;

use crate::error::{RedubError, Result};
use async_trait::async_trait;

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize speech for the text with a signed percentage rate
    /// adjustment, returning encoded audio bytes (a complete WAV payload).
    async fn synthesize(&self, text: &str, voice_id: &str, rate_percent: i32) -> Result<Vec<u8>>;

    fn name(&self) -> &'static str;
}

/// Voice catalog: language -> (voice name, provider voice id).
/// The first entry per language is the documented default.
const VOICE_CATALOG: &[(&str, &[(&str, &str)])] = &[
    (
        "zh",
        &[
            ("xiaoxiao", "zh-CN-XiaoxiaoNeural"),
            ("yunxi", "zh-CN-YunxiNeural"),
            ("xiaoyi", "zh-CN-XiaoyiNeural"),
        ],
    ),
    (
        "en",
        &[
            ("jenny", "en-US-JennyNeural"),
            ("guy", "en-US-GuyNeural"),
            ("aria", "en-US-AriaNeural"),
        ],
    ),
    (
        "ja",
        &[
            ("nanami", "ja-JP-NanamiNeural"),
            ("keita", "ja-JP-KeitaNeural"),
        ],
    ),
    (
        "ko",
        &[
            ("sunhi", "ko-KR-SunHiNeural"),
            ("injoon", "ko-KR-InJoonNeural"),
        ],
    ),
];

/// Reduce a generic code like `zh-cn` to the catalog's language key.
fn language_key(code: &str) -> String {
    code.to_lowercase()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Default provider voice id for a language.
pub fn default_voice(language: &str) -> Option<&'static str> {
    let key = language_key(language);
    VOICE_CATALOG
        .iter()
        .find(|(lang, _)| *lang == key)
        .and_then(|(_, voices)| voices.first())
        .map(|(_, id)| *id)
}

/// Resolve a voice for a language: an explicit name is looked up in the
/// catalog (or passed through as a raw provider id); otherwise the
/// language's default is used.
pub fn resolve_voice(language: &str, name: Option<&str>) -> Result<String> {
    if let Some(name) = name {
        let key = language_key(language);
        if let Some((_, voices)) = VOICE_CATALOG.iter().find(|(lang, _)| *lang == key) {
            if let Some((_, id)) = voices.iter().find(|(n, _)| *n == name.to_lowercase()) {
                return Ok(id.to_string());
            }
        }
        // Not in the catalog: assume a raw provider voice id.
        return Ok(name.to_string());
    }

    default_voice(language)
        .map(str::to_string)
        .ok_or_else(|| {
            RedubError::Config(format!("no default voice for language '{language}'"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice_per_language() {
        assert_eq!(default_voice("zh"), Some("zh-CN-XiaoxiaoNeural"));
        assert_eq!(default_voice("zh-cn"), Some("zh-CN-XiaoxiaoNeural"));
        assert_eq!(default_voice("zh-CN"), Some("zh-CN-XiaoxiaoNeural"));
        assert_eq!(default_voice("en"), Some("en-US-JennyNeural"));
        assert_eq!(default_voice("ja"), Some("ja-JP-NanamiNeural"));
        assert_eq!(default_voice("ko"), Some("ko-KR-SunHiNeural"));
        assert_eq!(default_voice("xx"), None);
    }

    #[test]
    fn test_resolve_named_voice() {
        assert_eq!(
            resolve_voice("zh-cn", Some("yunxi")).unwrap(),
            "zh-CN-YunxiNeural"
        );
    }

    #[test]
    fn test_resolve_raw_voice_id_passthrough() {
        assert_eq!(
            resolve_voice("zh-cn", Some("zh-CN-CustomNeural")).unwrap(),
            "zh-CN-CustomNeural"
        );
    }

    #[test]
    fn test_resolve_default() {
        assert_eq!(resolve_voice("ja", None).unwrap(), "ja-JP-NanamiNeural");
        assert!(resolve_voice("xx", None).is_err());
    }
}
