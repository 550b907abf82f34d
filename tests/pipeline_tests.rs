//! End-to-end tests for the subtitle processing flow and the HTTP clients,
//! using wiremock instead of live services.

use redub::config::{Config, SubtitleConfig, TranslationConfig};
use redub::subtitle::{self, batch, merge, srt, Cue, TimingTable};
use redub::transcribe::{Transcriber, WhisperClient};
use redub::translate::{FallbackChain, GoogleTranslator, MyMemoryTranslator, Translator};
use redub::tts::{AzureSynthesizer, Synthesizer};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cue(index: usize, start_ms: u64, end_ms: u64, text: &str) -> Cue {
    Cue {
        index,
        start: Duration::from_millis(start_ms),
        end: Duration::from_millis(end_ms),
        text: text.to_string(),
    }
}

// ============================================================================
// Subtitle flow: parse -> merge -> batch -> reassemble -> restore -> compose
// ============================================================================

#[test]
fn test_translation_flow_preserves_original_timing_grid() {
    let content = "\
1
00:00:00,000 --> 00:00:02,000
Hello there

2
00:00:02,100 --> 00:00:04,000
my old friend.

3
00:00:06,000 --> 00:00:08,000
Goodbye now.
";
    let cues = srt::parse(content).unwrap();
    let timings = TimingTable::capture(&cues);

    let config = SubtitleConfig::default();
    let merged = merge::merge(&cues, &config);
    // Cues 1 and 2 are 100ms apart with no terminal punctuation between
    // them; cue 3 is separated by 2s.
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].text, "Hello there my old friend.");

    let texts: Vec<String> = merged.iter().map(|c| c.text.clone()).collect();
    let batches = batch::partition(&texts, &config);
    assert_eq!(batches.len(), 1);

    // Simulate a line-preserving translation of the single batch.
    let translated_batches = vec!["你好老朋友。\n再见。".to_string()];
    let translated_texts = batch::reassemble(&batches, &translated_batches).unwrap();
    assert_eq!(translated_texts.len(), 2);

    let mut translated = merged.clone();
    for (cue, text) in translated.iter_mut().zip(&translated_texts) {
        cue.text = text.clone();
    }

    // Position-based restore: translated cue i pairs with original index
    // i + 1, so two merged cues land on the first two original timings and
    // the third original timing is dropped.
    let restored = merge::restore(&translated, &timings);
    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].start, Duration::ZERO);
    assert_eq!(restored[0].end, Duration::from_secs(2));
    assert_eq!(restored[0].text, "你好老朋友。");
    assert_eq!(restored[1].start, Duration::from_millis(2100));

    let composed = srt::compose(&restored);
    let reparsed = srt::parse(&composed).unwrap();
    assert_eq!(reparsed, restored);
}

#[test]
fn test_srt_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cues.srt");

    let cues = vec![
        cue(1, 0, 1500, "第一句话"),
        cue(2, 2000, 4000, "第二句话\n有两行"),
    ];
    srt::write_file(&path, &cues).unwrap();

    let read = srt::read_file(&path).unwrap();
    assert_eq!(read, cues);
}

#[test]
fn test_sorting_and_renumbering_derived_sequences() {
    let cues = vec![cue(7, 5000, 6000, "late"), cue(3, 0, 1000, "early")];
    let sorted = subtitle::renumber(subtitle::sort_by_start(cues));
    assert_eq!(sorted[0].text, "early");
    assert_eq!(sorted[0].index, 1);
    assert_eq!(sorted[1].index, 2);
}

// ============================================================================
// Translation backends against a mock server
// ============================================================================

#[tokio::test]
async fn test_google_translator_parses_gtx_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [["你好", "Hello", null], ["世界", "world", null]],
            null,
            "en"
        ])))
        .mount(&server)
        .await;

    let translator = GoogleTranslator::new().with_base_url(server.uri());
    let result = translator.translate("Hello world", "zh-cn").await.unwrap();
    assert_eq!(result, "你好世界");
}

#[tokio::test]
async fn test_mymemory_translator_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseData": { "translatedText": "你好" },
            "responseStatus": 200
        })))
        .mount(&server)
        .await;

    let translator = MyMemoryTranslator::new().with_base_url(server.uri());
    let result = translator.translate("Hello", "zh-cn").await.unwrap();
    assert_eq!(result, "你好");
}

#[tokio::test]
async fn test_fallback_chain_switches_backend_on_failure() {
    let server = MockServer::start().await;
    // Google backend answers with a server error every time.
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseData": { "translatedText": "谢谢" },
            "responseStatus": 200
        })))
        .mount(&server)
        .await;

    let backends: Vec<Box<dyn Translator>> = vec![
        Box::new(GoogleTranslator::new().with_base_url(server.uri())),
        Box::new(MyMemoryTranslator::new().with_base_url(server.uri())),
    ];
    let config = TranslationConfig {
        max_retries: 2,
        retry_delay_ms: 1,
        request_interval_ms: 1,
        timeout_secs: 5,
    };
    let chain = FallbackChain::new(backends, config);

    let result = chain.translate("Thanks", "zh-cn").await.unwrap();
    assert_eq!(result, "谢谢");
}

// ============================================================================
// Whisper transcription client
// ============================================================================

#[tokio::test]
async fn test_whisper_client_maps_segments_to_cues() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "text": "Hello world. How are you?",
            "language": "en",
            "duration": 4.0,
            "segments": [
                { "start": 0.0, "end": 2.0, "text": " Hello world. " },
                { "start": 2.5, "end": 4.0, "text": "How are you?" }
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.wav");
    std::fs::write(&audio, b"RIFFdata").unwrap();

    let client = WhisperClient::new("sk-test".to_string()).with_api_url(server.uri());
    let cues = client.transcribe(&audio).await.unwrap();

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].index, 1);
    assert_eq!(cues[0].text, "Hello world.");
    assert_eq!(cues[1].start, Duration::from_millis(2500));
}

#[tokio::test]
async fn test_whisper_client_surfaces_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid API key", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.wav");
    std::fs::write(&audio, b"RIFFdata").unwrap();

    let client = WhisperClient::new("bad-key".to_string()).with_api_url(server.uri());
    let err = client.transcribe(&audio).await.unwrap_err();
    assert!(err.to_string().contains("Invalid API key"));
}

// ============================================================================
// Azure synthesis client
// ============================================================================

#[tokio::test]
async fn test_azure_synthesizer_returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfakewav".to_vec()))
        .mount(&server)
        .await;

    let synth = AzureSynthesizer::new("key".to_string(), "eastus").with_base_url(server.uri());
    let audio = synth
        .synthesize("你好", "zh-CN-XiaoxiaoNeural", 10)
        .await
        .unwrap();
    assert_eq!(audio, b"RIFFfakewav");
}

#[tokio::test]
async fn test_azure_synthesizer_rejects_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let synth = AzureSynthesizer::new("key".to_string(), "eastus").with_base_url(server.uri());
    let result = synth.synthesize("你好", "zh-CN-XiaoxiaoNeural", 0).await;
    assert!(result.is_err());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_validation_catches_bad_tunables() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.tts.backoff_factor = 0.5;
    assert!(config.validate().is_err());
}
