//! Translation fallback chain: a fixed priority list of backends, each
//! retried with a fixed delay before moving on to the next one.

use crate::config::TranslationConfig;
use crate::error::{RedubError, Result};
use crate::translate::Translator;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

pub struct FallbackChain {
    backends: Vec<Box<dyn Translator>>,
    config: TranslationConfig,
}

impl FallbackChain {
    pub fn new(backends: Vec<Box<dyn Translator>>, config: TranslationConfig) -> Self {
        Self { backends, config }
    }

    /// Translate one text, trying each backend in priority order.
    ///
    /// Every backend gets `max_retries` attempts separated by the fixed
    /// retry delay; the first success wins. When the whole chain is
    /// exhausted the last underlying error is surfaced.
    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let mut last_error = "no backends configured".to_string();

        for backend in &self.backends {
            for attempt in 1..=self.config.max_retries {
                let call = backend.translate(text, target_lang);
                let result = match timeout(Duration::from_secs(self.config.timeout_secs), call)
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(RedubError::TranslationProvider {
                        provider: backend.name().to_string(),
                        message: format!("timed out after {}s", self.config.timeout_secs),
                    }),
                };

                match result {
                    Ok(translated) if !translated.trim().is_empty() => return Ok(translated),
                    Ok(_) => {
                        last_error = format!("{}: empty translation", backend.name());
                    }
                    Err(e) => {
                        last_error = e.to_string();
                    }
                }

                warn!(
                    "Translation retry ({}/{}) on '{}': {}",
                    attempt,
                    self.config.max_retries,
                    backend.name(),
                    last_error
                );
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
            warn!("Backend '{}' exhausted, switching", backend.name());
        }

        Err(RedubError::AllProvidersExhausted(last_error))
    }

    /// Translate a list of texts sequentially, preserving order.
    ///
    /// A politeness delay separates consecutive successful calls; this is a
    /// provider rate-limiting knob, distinct from the chain's retry delay.
    pub async fn translate_texts(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>> {
        let mut translated = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            info!("Translating {}/{}", i + 1, texts.len());
            let result = self.translate(text, target_lang).await?;
            translated.push(result);
            tokio::time::sleep(Duration::from_millis(self.config.request_interval_ms)).await;
        }

        info!("Translation complete, {} texts processed", translated.len());
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_config() -> TranslationConfig {
        TranslationConfig {
            max_retries: 2,
            retry_delay_ms: 1,
            request_interval_ms: 1,
            timeout_secs: 5,
        }
    }

    struct MockTranslator {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail_first: usize,
    }

    impl MockTranslator {
        fn always_ok(name: &'static str, calls: Arc<AtomicUsize>) -> Self {
            Self {
                name,
                calls,
                fail_first: 0,
            }
        }

        fn failing(name: &'static str, calls: Arc<AtomicUsize>, fail_first: usize) -> Self {
            Self {
                name,
                calls,
                fail_first,
            }
        }
    }

    #[async_trait]
    impl Translator for MockTranslator {
        async fn translate(&self, text: &str, _target_lang: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(RedubError::TranslationProvider {
                    provider: self.name.to_string(),
                    message: "mock failure".to_string(),
                });
            }
            Ok(format!("{}:{}", self.name, text))
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[tokio::test]
    async fn test_first_backend_success_short_circuits() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            vec![
                Box::new(MockTranslator::always_ok("a", first.clone())),
                Box::new(MockTranslator::always_ok("b", second.clone())),
            ],
            test_config(),
        );

        let result = chain.translate("hi", "zh-cn").await.unwrap();
        assert_eq!(result, "a:hi");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retry_within_backend_before_switching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            vec![Box::new(MockTranslator::failing("a", calls.clone(), 1))],
            test_config(),
        );

        let result = chain.translate("hi", "zh-cn").await.unwrap();
        assert_eq!(result, "a:hi");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_backend() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            vec![
                Box::new(MockTranslator::failing("a", first.clone(), usize::MAX)),
                Box::new(MockTranslator::always_ok("b", second.clone())),
            ],
            test_config(),
        );

        let result = chain.translate("hi", "zh-cn").await.unwrap();
        assert_eq!(result, "b:hi");
        // First backend used all its retries.
        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_backends_exhausted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            vec![
                Box::new(MockTranslator::failing("a", calls.clone(), usize::MAX)),
                Box::new(MockTranslator::failing("b", calls.clone(), usize::MAX)),
            ],
            test_config(),
        );

        match chain.translate("hi", "zh-cn").await.unwrap_err() {
            RedubError::AllProvidersExhausted(msg) => assert!(msg.contains("mock failure")),
            other => panic!("unexpected error: {other}"),
        }
        // Two backends, two attempts each.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_translate_texts_preserves_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new(
            vec![Box::new(MockTranslator::always_ok("a", calls))],
            test_config(),
        );

        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let results = chain.translate_texts(&texts, "zh-cn").await.unwrap();

        assert_eq!(results, vec!["a:one", "a:two", "a:three"]);
    }
}
