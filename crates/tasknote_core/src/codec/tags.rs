//! Tag-set spellings.

use crate::codec::{collapse_whitespace, remove_span, trailing_meta_start};
use crate::model::task::normalize_tags;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// At least one non-digit so issue references such as `#42` stay text.
static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[\w-]*[^\W\d][\w-]*$").expect("valid hashtag regex"));
static TAGS_ANNOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[tags::\s*([^\]]*)\]").expect("valid tags annotation regex"));

/// On-disk spelling of a task's tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStyle {
    Hidden,
    /// Trailing `#word` tokens.
    #[default]
    Hashtag,
    /// `[tags:: a, b]`.
    Annotation,
}

impl TagStyle {
    /// Parse order for this active style.
    pub fn fallback_order(self) -> Vec<TagStyle> {
        let mut order = vec![self];
        for style in [Self::Hashtag, Self::Annotation] {
            if !order.contains(&style) {
                order.push(style);
            }
        }
        order
    }

    /// Renders the tag tokens, or `None` when nothing is emitted.
    pub fn format(self, tags: &[String]) -> Option<String> {
        if tags.is_empty() {
            return None;
        }
        match self {
            Self::Hidden => None,
            Self::Hashtag => Some(
                tags.iter()
                    .map(|tag| format!("#{tag}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Self::Annotation => Some(format!("[tags:: {}]", tags.join(", "))),
        }
    }

    /// Strips this style's tag tokens from `text`.
    ///
    /// Returns `None` when the style finds nothing, so callers can fall back.
    pub fn extract(self, text: &str) -> Option<(Vec<String>, String)> {
        match self {
            Self::Hidden => None,
            Self::Hashtag => extract_hashtags(text),
            Self::Annotation => extract_annotation(text),
        }
    }
}

pub(crate) fn is_hashtag(word: &str) -> bool {
    HASHTAG_RE.is_match(word)
}

fn extract_hashtags(text: &str) -> Option<(Vec<String>, String)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = trailing_meta_start(&words);
    let found: Vec<&str> = words[start..]
        .iter()
        .copied()
        .filter(|word| is_hashtag(word))
        .collect();
    if found.is_empty() {
        return None;
    }

    let kept: Vec<&str> = words
        .iter()
        .enumerate()
        .filter(|(index, word)| *index < start || !is_hashtag(word))
        .map(|(_, word)| *word)
        .collect();
    Some((normalize_tags(&found), kept.join(" ")))
}

fn extract_annotation(text: &str) -> Option<(Vec<String>, String)> {
    let caps = TAGS_ANNOTATION_RE.captures(text)?;
    let raw: Vec<&str> = caps.get(1)?.as_str().split(',').collect();
    let span = caps.get(0)?.range();
    Some((
        normalize_tags(&raw),
        collapse_whitespace(&remove_span(text, span)),
    ))
}
