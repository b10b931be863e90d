//! Request text normalization: mention stripping, prior-answer stitching,
//! length cap, and trailing punctuation.
//!
//! The mention-stripped text and the final prompt are separate steps because
//! the guard chain and the reply formatter both consume the stripped text
//! before any stitching happens.

use crate::session::SessionContext;

/// Maximum prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Sentence-ending punctuation; a prompt ending in anything else gets `？` appended.
const TRAILING_PUNCTUATION: [char; 11] =
    [',', '.', ';', '!', '?', '，', '。', '！', '？', '、', '…'];

/// Remove every occurrence of the bot's `@name` mention and trim surrounding
/// whitespace. Empty output means the message carried nothing beyond the
/// mention and the caller should discard it.
pub fn strip_mention(raw: &str, bot_name: &str) -> String {
    let mention = format!("@{}", bot_name);
    raw.trim().replace(&mention, "").trim().to_string()
}

/// Build the prompt sent to the completion endpoint: stitch the prior answer
/// ahead of the cleaned text, cap the length, and guarantee the prompt ends
/// with sentence punctuation. The prior *answer* is stitched, not the prior
/// question; two spaces separate it from the new text.
pub fn build_prompt(cleaned: &str, prior: Option<&SessionContext>) -> String {
    let stitched = match prior {
        Some(context) if !context.last_answer.is_empty() => {
            format!("{}  {}", context.last_answer, cleaned)
        }
        _ => cleaned.to_string(),
    };

    let mut prompt: String = stitched.chars().take(MAX_PROMPT_CHARS).collect();

    let last = match prompt.chars().last() {
        Some(c) => c,
        None => return prompt,
    };
    if !TRAILING_PUNCTUATION.contains(&last) {
        // Stay within the cap when appending at full length.
        if prompt.chars().count() == MAX_PROMPT_CHARS {
            prompt.pop();
        }
        prompt.push('？');
    }
    prompt
}

/// Full normalization: strip the mention, then stitch, truncate, and
/// punctuate. Returns empty when the message carried nothing beyond the
/// mention.
pub fn normalize(raw: &str, bot_name: &str, prior: Option<&SessionContext>) -> String {
    let cleaned = strip_mention(raw, bot_name);
    if cleaned.is_empty() {
        return String::new();
    }
    build_prompt(&cleaned, prior)
}
