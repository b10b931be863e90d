//! Group reply formatting: sender mention, echoed question, separator, body.

/// Width of the dashed line between the echoed question and the answer.
const SEPARATOR_DASHES: usize = 36;

/// Format a group reply. A leading section before the first blank line is
/// dropped (completion output sometimes opens with a preamble paragraph);
/// when nothing is left after cleanup the configured fallback is used so the
/// user never sees silence.
pub fn format_reply(
    raw_reply: &str,
    mention_name: &str,
    original_question: &str,
    fallback: &str,
) -> String {
    let mut body = raw_reply;
    if let Some(boundary) = body.find("\n\n") {
        body = &body[boundary + 2..];
    }
    let body = body.trim();
    if body.is_empty() {
        return format!("@{} {}", mention_name, fallback);
    }

    let separator = "-".repeat(SEPARATOR_DASHES);
    let reply = format!(
        "@{}\n{}\n{}\n{}",
        mention_name, original_question, separator, body
    );
    reply.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "request timed out, please try again later";

    #[test]
    fn empty_reply_yields_mention_and_fallback() {
        assert_eq!(
            format_reply("", "alice", "what is it", FALLBACK),
            format!("@alice {}", FALLBACK)
        );
    }

    #[test]
    fn blank_after_cleanup_yields_fallback() {
        assert_eq!(
            format_reply("header\n\n   \n ", "alice", "what is it", FALLBACK),
            format!("@alice {}", FALLBACK)
        );
    }

    #[test]
    fn formats_mention_question_separator_body() {
        let out = format_reply("The answer is 42.", "alice", "what is it", FALLBACK);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("@alice"));
        assert_eq!(lines.next(), Some("what is it"));
        assert_eq!(lines.next(), Some("-".repeat(36).as_str()));
        assert_eq!(lines.next(), Some("The answer is 42."));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn leading_section_before_blank_line_is_dropped() {
        let out = format_reply(
            "Let me think about that.\n\nThe answer is 42.",
            "alice",
            "what is it",
            FALLBACK,
        );
        assert!(!out.contains("Let me think"));
        assert!(out.ends_with("The answer is 42."));
    }

    #[test]
    fn only_the_first_boundary_is_dropped() {
        let out = format_reply("preamble\n\nfirst\n\nsecond", "alice", "q", FALLBACK);
        assert!(out.contains("first\n\nsecond"));
        assert!(!out.contains("preamble"));
    }

    #[test]
    fn surrounding_newlines_are_trimmed() {
        let out = format_reply("\nanswer\n", "alice", "q", FALLBACK);
        assert!(out.starts_with("@alice"));
        assert!(out.ends_with("answer"));
    }
}
