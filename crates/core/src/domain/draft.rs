use serde::{Deserialize, Serialize};

/// Best-effort structured output of the generator. Every field may be missing;
/// callers supply fallbacks when assembling a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Raw category label as returned upstream; may fall outside the known set.
    #[serde(default)]
    pub category: Option<String>,
}
