//! Creation timestamp spellings.

use crate::codec::{collapse_whitespace, remove_span};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PLAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2})(?:\s+|$)").expect("valid plain ts regex")
});
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)➕\s*(\d{4}-\d{2}-\d{2})(?:\s|$)").expect("valid emoji ts regex")
});
static ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[created::\s*(\d{4}-\d{2}-\d{2})(?:[ T](\d{2}:\d{2})(?::\d{2})?)?\s*\]")
        .expect("valid annotation ts regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// On-disk spelling of a task's creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampStyle {
    #[default]
    Hidden,
    /// Leading `2024-01-15 10:30`.
    Plain,
    /// `➕ 2024-01-15`; keeps the date only.
    Emoji,
    /// `[created:: 2024-01-15T10:30]`.
    Annotation,
}

impl TimestampStyle {
    /// Parse order for this active style.
    pub fn fallback_order(self) -> Vec<TimestampStyle> {
        let mut order = vec![self];
        for style in [Self::Plain, Self::Emoji, Self::Annotation] {
            if !order.contains(&style) {
                order.push(style);
            }
        }
        order
    }

    /// Renders the timestamp token, or `None` when nothing is emitted.
    pub fn format(self, created_at: NaiveDateTime) -> Option<String> {
        match self {
            Self::Hidden => None,
            Self::Plain => Some(created_at.format("%Y-%m-%d %H:%M").to_string()),
            Self::Emoji => Some(format!("➕ {}", created_at.format(DATE_FORMAT))),
            Self::Annotation => Some(format!(
                "[created:: {}]",
                created_at.format("%Y-%m-%dT%H:%M")
            )),
        }
    }

    /// Strips this style's timestamp token from `text`.
    pub fn extract(self, text: &str) -> Option<(NaiveDateTime, String)> {
        let regex = match self {
            Self::Hidden => return None,
            Self::Plain => &*PLAIN_RE,
            Self::Emoji => &*EMOJI_RE,
            Self::Annotation => &*ANNOTATION_RE,
        };
        let caps = regex.captures(text)?;
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), DATE_FORMAT).ok()?;
        let time = match caps.get(2) {
            Some(value) => NaiveTime::parse_from_str(value.as_str(), TIME_FORMAT).ok()?,
            None => NaiveTime::MIN,
        };
        let span = caps.get(0)?.range();
        Some((
            date.and_time(time),
            collapse_whitespace(&remove_span(text, span)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::TimestampStyle;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(hh, mm, 0))
            .expect("valid test datetime")
    }

    #[test]
    fn plain_timestamp_must_lead_the_text() {
        let (created, rest) = TimestampStyle::Plain
            .extract("2024-03-01 09:15 Water plants")
            .expect("leading plain timestamp");
        assert_eq!(created, at(2024, 3, 1, 9, 15));
        assert_eq!(rest, "Water plants");
        assert!(TimestampStyle::Plain
            .extract("Water plants 2024-03-01 09:15")
            .is_none());
    }

    #[test]
    fn emoji_timestamp_keeps_date_only() {
        let style = TimestampStyle::Emoji;
        let rendered = style.format(at(2024, 3, 1, 9, 15)).expect("rendered");
        assert_eq!(rendered, "➕ 2024-03-01");
        let (created, rest) = style
            .extract("Water plants ➕ 2024-03-01")
            .expect("emoji timestamp");
        assert_eq!(created, at(2024, 3, 1, 0, 0));
        assert_eq!(rest, "Water plants");
    }

    #[test]
    fn annotation_timestamp_accepts_seconds() {
        let (created, rest) = TimestampStyle::Annotation
            .extract("[created:: 2024-03-01T09:15:42] Water plants")
            .expect("annotation timestamp");
        assert_eq!(created, at(2024, 3, 1, 9, 15));
        assert_eq!(rest, "Water plants");
    }

    #[test]
    fn invalid_calendar_dates_do_not_match() {
        assert!(TimestampStyle::Plain
            .extract("2024-13-40 09:15 Water plants")
            .is_none());
    }
}
