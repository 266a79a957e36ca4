//! System prompts, embedded at build time

use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptType {
    Vision,
    Digest,
}

static SYSTEM_PROMPTS: LazyLock<HashMap<PromptType, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        (PromptType::Vision, include_str!("../prompts/vision.txt")),
        (PromptType::Digest, include_str!("../prompts/digest.txt")),
    ])
});

impl PromptType {
    /// System prompt text for this prompt type
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        SYSTEM_PROMPTS.get(&self).copied().unwrap_or_default()
    }
}
