pub mod chain;
pub mod google;
pub mod mymemory;
pub mod youdao;

pub use chain::FallbackChain;
pub use google::GoogleTranslator;
pub use mymemory::MyMemoryTranslator;
pub use youdao::YoudaoTranslator;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate text into the target language, given a generic language code.
    /// Each backend normalizes the code through its own table.
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Build the default backend priority list. Order is fixed, not adapted
/// to past success.
pub fn default_backends() -> Vec<Box<dyn Translator>> {
    vec![
        Box::new(GoogleTranslator::new()),
        Box::new(MyMemoryTranslator::new()),
        Box::new(YoudaoTranslator::new()),
    ]
}
