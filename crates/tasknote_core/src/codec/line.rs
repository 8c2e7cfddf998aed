//! Checkbox line assembly and disassembly.

use crate::codec::{collapse_whitespace, PriorityStyle, TagStyle, TimestampStyle};
use crate::model::task::{Priority, Task, TaskId, TaskStatus};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static CHECKBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-*+]\s+\[([ xX])\](?:\s+(.*)|$)").expect("valid checkbox regex")
});
static LEGACY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([0-9a-fA-F]{8})\](?:\s+|$)").expect("valid legacy id regex"));

/// Fields recovered from one checkbox line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub status: TaskStatus,
    pub text: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
    pub legacy_id: Option<String>,
}

impl ParsedLine {
    /// Promotes parsed fields into a task placed at `indent`.
    pub fn into_task(self, id: TaskId, indent: usize) -> Task {
        Task {
            id,
            text: self.text,
            status: self.status,
            priority: self.priority,
            tags: self.tags,
            created_at: self.created_at,
            indent,
            legacy_id: self.legacy_id,
        }
    }
}

/// Line codec configured with one active style per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCodec {
    pub priority_style: PriorityStyle,
    pub tag_style: TagStyle,
    pub timestamp_style: TimestampStyle,
}

impl LineCodec {
    pub fn new(
        priority_style: PriorityStyle,
        tag_style: TagStyle,
        timestamp_style: TimestampStyle,
    ) -> Self {
        Self {
            priority_style,
            tag_style,
            timestamp_style,
        }
    }

    /// Priority a freshly parsed line gets when it carries no token.
    pub fn default_priority(&self) -> Priority {
        self.priority_style.default_priority()
    }

    /// Formats `task` without indentation.
    ///
    /// Token order is fixed: checkbox, timestamp, text, priority, tags.
    pub fn format_line(&self, task: &Task) -> String {
        self.format_line_in_section(task, None)
    }

    /// Formats `task`, omitting `implied_tag` which the enclosing heading
    /// already spells out.
    pub fn format_line_in_section(&self, task: &Task, implied_tag: Option<&str>) -> String {
        let mut parts = vec![format!("- [{}]", task.status.checkbox_char())];
        if let Some(token) = task
            .created_at
            .and_then(|created_at| self.timestamp_style.format(created_at))
        {
            parts.push(token);
        }
        parts.push(task.text.clone());
        if let Some(token) = self.priority_style.format(task.priority) {
            parts.push(token);
        }
        let tags: Vec<String> = task
            .tags
            .iter()
            .filter(|tag| Some(tag.as_str()) != implied_tag)
            .cloned()
            .collect();
        if let Some(token) = self.tag_style.format(&tags) {
            parts.push(token);
        }
        parts.join(" ")
    }

    /// Parses one line with leading indentation already removed.
    ///
    /// Returns `None` when the line is not a task: no checkbox marker, or no
    /// text left once every known token has been stripped.
    pub fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        let caps = CHECKBOX_RE.captures(line.trim())?;
        let status = match caps.get(1).map(|m| m.as_str()) {
            Some(" ") => TaskStatus::Pending,
            _ => TaskStatus::Done,
        };
        let mut rest = caps
            .get(2)
            .map(|m| collapse_whitespace(m.as_str()))
            .unwrap_or_default();

        let mut created_at = None;
        for style in self.timestamp_style.fallback_order() {
            if let Some((value, remaining)) = style.extract(&rest) {
                created_at = Some(value);
                rest = remaining;
                break;
            }
        }

        let mut legacy_id = None;
        if let Some(found) = LEGACY_ID_RE.captures(&rest) {
            let id = found.get(1).map(|m| m.as_str().to_ascii_lowercase());
            let end = found.get(0).map_or(0, |m| m.end());
            legacy_id = id;
            rest = rest[end..].to_string();
        }

        let mut tags = Vec::new();
        for style in self.tag_style.fallback_order() {
            if let Some((value, remaining)) = style.extract(&rest) {
                tags = value;
                rest = remaining;
                break;
            }
        }

        let mut priority = self.default_priority();
        for style in self.priority_style.fallback_order() {
            if let Some((value, remaining)) = style.extract(&rest) {
                priority = value;
                rest = remaining;
                break;
            }
        }

        let text = collapse_whitespace(&rest);
        if text.is_empty() {
            return None;
        }

        Some(ParsedLine {
            status,
            text,
            priority,
            tags,
            created_at,
            legacy_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LineCodec;
    use crate::codec::{PriorityStyle, TagStyle, TimestampStyle};
    use crate::model::task::{Priority, TaskStatus};

    #[test]
    fn non_checkbox_lines_are_not_tasks() {
        let codec = LineCodec::default();
        assert!(codec.parse_line("Just a note").is_none());
        assert!(codec.parse_line("- plain bullet").is_none());
        assert!(codec.parse_line("- [ ]").is_none());
        assert!(codec.parse_line("- [ ] !! #work").is_none());
    }

    #[test]
    fn parses_upper_case_done_marker_and_star_bullet() {
        let parsed = LineCodec::default()
            .parse_line("* [X] Water plants")
            .expect("task");
        assert_eq!(parsed.status, TaskStatus::Done);
        assert_eq!(parsed.text, "Water plants");
    }

    #[test]
    fn legacy_id_follows_timestamp() {
        let parsed = LineCodec::default()
            .parse_line("- [ ] 2024-01-02 08:00 [DEADBEEF] Renew passport !")
            .expect("task");
        assert_eq!(parsed.legacy_id.as_deref(), Some("deadbeef"));
        assert_eq!(parsed.text, "Renew passport");
        assert_eq!(parsed.priority, Priority::Normal);
        assert!(parsed.created_at.is_some());
    }

    #[test]
    fn falls_back_to_other_styles() {
        let codec = LineCodec::new(
            PriorityStyle::Symbol,
            TagStyle::Hashtag,
            TimestampStyle::Hidden,
        );
        let parsed = codec
            .parse_line("- [ ] Pay rent [priority:: critical] [tags:: home, money]")
            .expect("task");
        assert_eq!(parsed.priority, Priority::Critical);
        assert_eq!(parsed.tags, vec!["home", "money"]);
        assert_eq!(parsed.text, "Pay rent");
    }

    #[test]
    fn active_style_wins_over_fallbacks() {
        let codec = LineCodec::new(
            PriorityStyle::Annotation,
            TagStyle::Hashtag,
            TimestampStyle::Hidden,
        );
        let parsed = codec
            .parse_line("- [ ] Pay rent [priority:: low] !!")
            .expect("task");
        assert_eq!(parsed.priority, Priority::Low);
        assert_eq!(parsed.text, "Pay rent !!");
    }

    #[test]
    fn format_omits_implied_section_tag() {
        let codec = LineCodec::default();
        let mut task = crate::model::task::Task::new("abcd1234", "Ship the feature");
        task.priority = Priority::High;
        task.tags = vec!["work".to_string(), "q3".to_string()];
        assert_eq!(
            codec.format_line_in_section(&task, Some("work")),
            "- [ ] Ship the feature !! #q3"
        );
        assert_eq!(codec.format_line(&task), "- [ ] Ship the feature !! #work #q3");
    }
}
