pub mod error;
pub mod gemini;
pub mod json;

use crate::domain::draft::GeneratedDraft;
use crate::llm::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
        }
    }
}

/// Produces a draft article for a topic. One call is one upstream attempt.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, topic: &str) -> Result<GeneratedDraft, GenerationError>;
}
