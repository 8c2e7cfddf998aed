//! Priority spellings.

use crate::codec::{collapse_whitespace, remove_span, trailing_meta_start};
use crate::model::task::Priority;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PRIORITY_ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[priority::\s*([^\]]*?)\s*\]").expect("valid priority annotation regex")
});

const EMOJI_TOKENS: &[(&str, Priority)] = &[
    ("🔺", Priority::Critical),
    ("⏫", Priority::High),
    ("🔼", Priority::Normal),
    ("🔽", Priority::Low),
    ("⏬", Priority::Someday),
];

/// On-disk spelling of a task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityStyle {
    /// Never rendered.
    Hidden,
    /// `!!!`, `!!`, `!`, `~` suffix; low and none render nothing.
    #[default]
    Symbol,
    /// Calendar-plugin arrows: `🔺 ⏫ 🔼 🔽 ⏬`.
    Emoji,
    /// `[priority:: high]`.
    Annotation,
}

impl PriorityStyle {
    /// Parse order for this active style.
    pub fn fallback_order(self) -> Vec<PriorityStyle> {
        let mut order = vec![self];
        for style in [Self::Symbol, Self::Emoji, Self::Annotation] {
            if !order.contains(&style) {
                order.push(style);
            }
        }
        order
    }

    /// Priority assumed for a line that carries no priority token.
    ///
    /// The symbol style spells `low` as the absence of a marker.
    pub fn default_priority(self) -> Priority {
        match self {
            Self::Symbol => Priority::Low,
            _ => Priority::None,
        }
    }

    /// Renders the priority token, or `None` when nothing is emitted.
    pub fn format(self, priority: Priority) -> Option<String> {
        match self {
            Self::Hidden => None,
            Self::Symbol => symbol_for(priority).map(str::to_string),
            Self::Emoji => EMOJI_TOKENS
                .iter()
                .find(|(_, value)| *value == priority)
                .map(|(token, _)| (*token).to_string()),
            Self::Annotation => match priority {
                Priority::None => None,
                other => Some(format!("[priority:: {}]", other.as_str())),
            },
        }
    }

    /// Strips this style's priority token(s) from `text`.
    ///
    /// Returns `None` when the style finds nothing, so callers can fall back.
    pub fn extract(self, text: &str) -> Option<(Priority, String)> {
        match self {
            Self::Hidden => None,
            Self::Symbol => extract_symbol(text),
            Self::Emoji => extract_emoji(text),
            Self::Annotation => extract_annotation(text),
        }
    }
}

fn symbol_for(priority: Priority) -> Option<&'static str> {
    match priority {
        Priority::Critical => Some("!!!"),
        Priority::High => Some("!!"),
        Priority::Normal => Some("!"),
        Priority::Someday => Some("~"),
        Priority::Low | Priority::None => None,
    }
}

fn priority_for_symbol(word: &str) -> Option<Priority> {
    match word {
        "!!!" => Some(Priority::Critical),
        "!!" => Some(Priority::High),
        "!" => Some(Priority::Normal),
        "~" => Some(Priority::Someday),
        _ => None,
    }
}

fn priority_for_emoji(word: &str) -> Option<Priority> {
    let bare = word.trim_end_matches('\u{FE0F}');
    EMOJI_TOKENS
        .iter()
        .find(|(token, _)| *token == bare)
        .map(|(_, value)| *value)
}

pub(crate) fn is_symbol_token(word: &str) -> bool {
    priority_for_symbol(word).is_some()
}

pub(crate) fn is_emoji_token(word: &str) -> bool {
    priority_for_emoji(word).is_some()
}

fn extract_symbol(text: &str) -> Option<(Priority, String)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = trailing_meta_start(&words);
    let found = words[start..]
        .iter()
        .rev()
        .find_map(|word| priority_for_symbol(word))?;

    let kept: Vec<&str> = words
        .iter()
        .enumerate()
        .filter(|(index, word)| *index < start || !is_symbol_token(word))
        .map(|(_, word)| *word)
        .collect();
    Some((found, kept.join(" ")))
}

fn extract_emoji(text: &str) -> Option<(Priority, String)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let found = words.iter().find_map(|word| priority_for_emoji(word))?;
    let kept: Vec<&str> = words
        .into_iter()
        .filter(|word| !is_emoji_token(word))
        .collect();
    Some((found, kept.join(" ")))
}

fn extract_annotation(text: &str) -> Option<(Priority, String)> {
    let caps = PRIORITY_ANNOTATION_RE.captures(text)?;
    let priority = caps.get(1)?.as_str().parse::<Priority>().ok()?;
    let span = caps.get(0)?.range();
    Some((priority, collapse_whitespace(&remove_span(text, span))))
}

#[cfg(test)]
mod tests {
    use super::PriorityStyle;
    use crate::model::task::Priority;

    #[test]
    fn symbol_extraction_takes_trailing_token_only() {
        let (priority, rest) = PriorityStyle::Symbol
            .extract("Say hi ! loudly !!")
            .expect("trailing symbol");
        assert_eq!(priority, Priority::High);
        assert_eq!(rest, "Say hi ! loudly");
    }

    #[test]
    fn symbol_extraction_sees_past_trailing_hashtags() {
        let (priority, rest) = PriorityStyle::Symbol
            .extract("Ship it !!! #work")
            .expect("symbol before hashtag");
        assert_eq!(priority, Priority::Critical);
        assert_eq!(rest, "Ship it #work");
    }

    #[test]
    fn symbol_extraction_is_idempotent() {
        let (_, rest) = PriorityStyle::Symbol.extract("Plan ~").expect("someday");
        assert!(PriorityStyle::Symbol.extract(&rest).is_none());
    }

    #[test]
    fn emoji_extraction_accepts_variation_selector() {
        let (priority, rest) = PriorityStyle::Emoji
            .extract("Book flights \u{23EB}\u{FE0F}")
            .expect("emoji with selector");
        assert_eq!(priority, Priority::High);
        assert_eq!(rest, "Book flights");
    }

    #[test]
    fn annotation_extraction_ignores_unknown_names() {
        assert!(PriorityStyle::Annotation
            .extract("Plan [priority:: whenever]")
            .is_none());
        let (priority, rest) = PriorityStyle::Annotation
            .extract("Plan [priority:: medium] trip")
            .expect("annotation");
        assert_eq!(priority, Priority::Normal);
        assert_eq!(rest, "Plan trip");
    }

    #[test]
    fn fallback_order_starts_with_active_style_without_duplicates() {
        assert_eq!(
            PriorityStyle::Emoji.fallback_order(),
            vec![
                PriorityStyle::Emoji,
                PriorityStyle::Symbol,
                PriorityStyle::Annotation
            ]
        );
        assert_eq!(PriorityStyle::Hidden.fallback_order().len(), 4);
    }

    #[test]
    fn symbol_style_renders_low_as_nothing() {
        assert_eq!(PriorityStyle::Symbol.format(Priority::Low), None);
        assert_eq!(PriorityStyle::Symbol.default_priority(), Priority::Low);
        assert_eq!(PriorityStyle::Emoji.default_priority(), Priority::None);
    }
}
