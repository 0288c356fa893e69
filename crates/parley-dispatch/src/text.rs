//! The seam between task dispatch and the language model.

use async_trait::async_trait;

/// Model-backed text operations.
///
/// Implemented by the LLM chat client; the dispatcher only sees this
/// trait, so tests can substitute a stub and the dispatch crate never
/// learns about HTTP.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for a free-form request.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Summarizes the given text.
    async fn summarize(&self, text: &str) -> anyhow::Result<String>;

    /// Translates the given text into `target_language`.
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String>;
}
