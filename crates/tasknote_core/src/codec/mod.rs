//! Syntax codec for checkbox lines.
//!
//! # Responsibility
//! - Convert priority, tag-set and timestamp fields to and from every
//!   supported on-disk spelling.
//! - Assemble and disassemble one checkbox line.
//!
//! # Invariants
//! - Formatting uses only the configured style.
//! - Parsing falls back through every known style in the fixed order
//!   `active, symbol, emoji, annotation`; the first style that matches wins.
//! - Extraction is idempotent: a second pass over the stripped text finds
//!   nothing for the style that already matched.

pub mod line;
pub mod priority;
pub mod tags;
pub mod timestamp;

pub use line::{LineCodec, ParsedLine};
pub use priority::PriorityStyle;
pub use tags::TagStyle;
pub use timestamp::TimestampStyle;

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Collapses whitespace runs to one space and trims both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Removes `span` from `text`, keeping the two sides separated by a space.
pub(crate) fn remove_span(text: &str, span: Range<usize>) -> String {
    let head = text[..span.start].trim_end();
    let tail = text[span.end..].trim_start();
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Returns whether `word` belongs to the trailing metadata run of a line:
/// a hashtag, a priority symbol or a priority emoji.
pub(crate) fn is_trailing_meta(word: &str) -> bool {
    tags::is_hashtag(word) || priority::is_symbol_token(word) || priority::is_emoji_token(word)
}

/// Returns the index of the first word of the trailing metadata run.
///
/// Tags and priority markers may follow the text in any order, so every
/// trailing extractor scans the whole run rather than only the last word.
pub(crate) fn trailing_meta_start(words: &[&str]) -> usize {
    let mut start = words.len();
    while start > 0 && is_trailing_meta(words[start - 1]) {
        start -= 1;
    }
    start
}

#[cfg(test)]
mod tests {
    use super::{collapse_whitespace, remove_span, trailing_meta_start};

    #[test]
    fn remove_span_joins_sides_with_single_space() {
        assert_eq!(remove_span("a [x] b", 2..5), "a b");
        assert_eq!(remove_span("[x] b", 0..3), "b");
        assert_eq!(remove_span("a [x]", 2..5), "a");
    }

    #[test]
    fn trailing_run_spans_tags_and_priority_in_any_order() {
        let words = ["ship", "it", "#work", "!!", "#q3"];
        assert_eq!(trailing_meta_start(&words), 2);
        let words = ["fix", "#42", "now"];
        assert_eq!(trailing_meta_start(&words), 3);
    }

    #[test]
    fn collapse_whitespace_trims_and_squeezes() {
        assert_eq!(collapse_whitespace("  a \t b  "), "a b");
    }
}
