//! Markdown document model.
//!
//! # Responsibility
//! - Parse full note text into ordered sections of tasks.
//! - Render a document back into text, keeping non-task lines verbatim.
//! - Sort tasks per section and infer indentation-based blockers.
//!
//! # Invariants
//! - Sections keep first-seen order; a later heading with the same key is
//!   merged into the first one.
//! - The untagged section, when present, is always first so its header-less
//!   lines never fall under another heading after a round trip.
//! - `render(parse(render(d)))` equals `render(d)`: blank lines are owned by
//!   the renderer, never stored.
//! - A document is built fresh for every operation and never cached.

use crate::codec::tags::is_hashtag;
use crate::codec::LineCodec;
use crate::identity::IdentityMap;
use crate::model::task::{Task, TaskId, TaskRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Reserved key of the section holding tasks that precede every heading.
pub const UNTAGGED_SECTION_KEY: &str = "__untagged__";

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}(?:\s+(.*))?$").expect("valid heading regex"));

/// Per-section ordering applied right before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Severity descending; ties keep document order.
    #[default]
    Priority,
    /// Oldest first; tasks without a timestamp go last.
    Created,
    None,
}

/// One line owned by a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionEntry {
    Task(Task),
    /// Non-task content, re-emitted exactly as read.
    Verbatim(String),
}

/// Tasks grouped under one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    /// Exact heading line, empty for the untagged section.
    pub header: String,
    pub entries: Vec<SectionEntry>,
    emptied: bool,
}

impl Section {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            entries: Vec::new(),
            emptied: false,
        }
    }

    pub fn is_untagged(&self) -> bool {
        self.key == UNTAGGED_SECTION_KEY
    }

    /// Tag spelled by the heading itself, when the key is a single tag word.
    pub fn implied_tag(&self) -> Option<&str> {
        if self.is_untagged() || !is_hashtag(&format!("#{}", self.key)) {
            return None;
        }
        Some(self.key.as_str())
    }

    /// Project name exposed on records; `None` for the untagged section.
    pub fn project(&self) -> Option<&str> {
        if self.is_untagged() {
            None
        } else {
            Some(self.key.as_str())
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().filter_map(|entry| match entry {
            SectionEntry::Task(task) => Some(task),
            SectionEntry::Verbatim(_) => None,
        })
    }

    fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            SectionEntry::Task(task) => Some(task),
            SectionEntry::Verbatim(_) => None,
        })
    }

    /// Infers each task's blocker from indentation.
    ///
    /// Walks tasks in order with a stack of `(indent, id)`; entries at or
    /// deeper than the current indent are popped, and whatever remains on top
    /// is the blocker. Each task gets at most one blocker.
    pub fn blocked_by(&self) -> HashMap<TaskId, TaskId> {
        let mut blockers = HashMap::new();
        let mut stack: Vec<(usize, &TaskId)> = Vec::new();
        for task in self.tasks() {
            while stack.last().is_some_and(|(indent, _)| *indent >= task.indent) {
                stack.pop();
            }
            if let Some((_, parent)) = stack.last() {
                blockers.insert(task.id.clone(), (*parent).clone());
            }
            stack.push((task.indent, &task.id));
        }
        blockers
    }

    fn remove_task(&mut self, id: &str) -> Option<Task> {
        let index = self
            .entries
            .iter()
            .position(|entry| matches!(entry, SectionEntry::Task(task) if task.id == id))?;
        let removed = match self.entries.remove(index) {
            SectionEntry::Task(task) => task,
            SectionEntry::Verbatim(_) => return None,
        };
        if self.entries.is_empty() {
            self.emptied = true;
        }
        Some(removed)
    }

    fn sort(&mut self, policy: SortPolicy) {
        if policy == SortPolicy::None {
            return;
        }
        let mut sorted = Vec::with_capacity(self.entries.len());
        let mut run = Vec::new();
        for entry in std::mem::take(&mut self.entries) {
            match entry {
                SectionEntry::Task(task) => run.push(task),
                verbatim @ SectionEntry::Verbatim(_) => {
                    sorted.extend(
                        sort_tasks(std::mem::take(&mut run), policy)
                            .into_iter()
                            .map(SectionEntry::Task),
                    );
                    sorted.push(verbatim);
                }
            }
        }
        sorted.extend(
            sort_tasks(run, policy)
                .into_iter()
                .map(SectionEntry::Task),
        );
        self.entries = sorted;
    }
}

/// Ordered sections parsed from one note.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    /// Parses note text, reconciling an id for every task line.
    ///
    /// A literal legacy id wins over fuzzy matching and is registered in
    /// `identity`. Lines that look like tasks but fail every style are kept
    /// verbatim.
    pub fn parse(text: &str, codec: &LineCodec, identity: &mut IdentityMap) -> Self {
        let mut document = Self::default();
        let mut current: Option<usize> = None;
        let mut slots: Vec<(usize, usize)> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = HEADING_RE.captures(line.trim_end()) {
                let key = caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_lowercase())
                    .filter(|key| !key.is_empty())
                    .unwrap_or_else(|| UNTAGGED_SECTION_KEY.to_string());
                current = Some(document.open_section(&key, line.trim_end()));
                continue;
            }

            let index = match current {
                Some(index) => index,
                None => {
                    let index = document.open_section(UNTAGGED_SECTION_KEY, "");
                    current = Some(index);
                    index
                }
            };
            let section = &mut document.sections[index];

            let Some(parsed) = codec.parse_line(line) else {
                section
                    .entries
                    .push(SectionEntry::Verbatim(line.trim_end().to_string()));
                continue;
            };

            let indent = line.chars().take_while(|c| c.is_whitespace()).count();
            let mut task = parsed.into_task(TaskId::new(), indent);
            if let Some(tag) = section.implied_tag() {
                if !task.tags.iter().any(|existing| existing == tag) {
                    task.tags.insert(0, tag.to_string());
                }
            }
            section.entries.push(SectionEntry::Task(task));
            slots.push((index, section.entries.len() - 1));
        }

        document.assign_ids(&slots, identity);
        document
    }

    /// Resolves task ids in passes: legacy ids, then exact key hits, then
    /// fuzzy matches and fresh ids in line order. An unchanged task keeps its
    /// id even when an edited copy of it sits above it.
    fn assign_ids(&mut self, slots: &[(usize, usize)], identity: &mut IdentityMap) {
        let mut taken: HashSet<TaskId> = HashSet::new();

        let mut unresolved = Vec::new();
        for &slot in slots {
            let Some(task) = self.task_at(slot) else {
                continue;
            };
            match task.legacy_id.clone() {
                Some(legacy) if !taken.contains(&legacy) => {
                    identity.register(&task.text, &legacy);
                    task.id = legacy.clone();
                    taken.insert(legacy);
                }
                _ => unresolved.push(slot),
            }
        }

        let mut inexact = Vec::new();
        for slot in unresolved {
            let Some(task) = self.task_at(slot) else {
                continue;
            };
            match identity.lookup(&task.text).cloned() {
                Some(id) if !taken.contains(&id) => {
                    task.id = id.clone();
                    taken.insert(id);
                }
                _ => inexact.push(slot),
            }
        }

        for slot in inexact {
            let Some(task) = self.task_at(slot) else {
                continue;
            };
            let id = identity.resolve(&task.text, &taken);
            taken.insert(id.clone());
            task.id = id;
        }
    }

    fn task_at(&mut self, (section, entry): (usize, usize)) -> Option<&mut Task> {
        match self.sections.get_mut(section)?.entries.get_mut(entry)? {
            SectionEntry::Task(task) => Some(task),
            SectionEntry::Verbatim(_) => None,
        }
    }

    /// Renders every section in original order.
    ///
    /// Sections emptied by a removal are dropped together with their heading;
    /// headings that never held anything are kept.
    pub fn render(&self, codec: &LineCodec) -> String {
        let mut blocks = Vec::new();
        for section in &self.sections {
            if section.entries.is_empty() && (section.emptied || section.header.is_empty()) {
                continue;
            }

            let mut lines = Vec::new();
            if !section.header.is_empty() {
                lines.push(section.header.clone());
                if !section.entries.is_empty() {
                    lines.push(String::new());
                }
            }
            let implied = section.implied_tag();
            for entry in &section.entries {
                match entry {
                    SectionEntry::Task(task) => lines.push(format!(
                        "{}{}",
                        " ".repeat(task.indent),
                        codec.format_line_in_section(task, implied)
                    )),
                    SectionEntry::Verbatim(line) => lines.push(line.clone()),
                }
            }
            blocks.push(lines.join("\n"));
        }

        if blocks.is_empty() {
            return String::new();
        }
        let mut rendered = blocks.join("\n\n");
        rendered.push('\n');
        rendered
    }

    /// Applies `policy` to every section.
    pub fn sort(&mut self, policy: SortPolicy) {
        for section in &mut self.sections {
            section.sort(policy);
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.key == key)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.sections.iter().flat_map(Section::tasks)
    }

    /// Ids of every task currently in the document.
    pub fn task_ids(&self) -> HashSet<TaskId> {
        self.tasks().map(|task| task.id.clone()).collect()
    }

    pub fn find_task(&self, id: &str) -> Option<(&Section, &Task)> {
        self.sections.iter().find_map(|section| {
            section
                .tasks()
                .find(|task| task.id == id)
                .map(|task| (section, task))
        })
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.sections
            .iter_mut()
            .find_map(|section| section.tasks_mut().find(|task| task.id == id))
    }

    /// Removes one task. Its section is dropped from rendering when this
    /// leaves it empty.
    pub fn remove_task(&mut self, id: &str) -> Option<Task> {
        self.sections
            .iter_mut()
            .find_map(|section| section.remove_task(id))
    }

    /// Appends `task` to the section for `key`, creating it when missing.
    ///
    /// New tagged sections get a heading of `heading_level` hashes and are
    /// appended; a new untagged section is placed first.
    pub fn insert_task(&mut self, key: Option<&str>, task: Task, heading_level: u8) {
        let key = key
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| UNTAGGED_SECTION_KEY.to_string());

        let index = match self.sections.iter().position(|section| section.key == key) {
            Some(index) => index,
            None if key == UNTAGGED_SECTION_KEY => {
                self.sections.insert(0, Section::new(key, ""));
                0
            }
            None => {
                let header = format!("{} {}", "#".repeat(usize::from(heading_level)), key);
                self.sections.push(Section::new(key, header));
                self.sections.len() - 1
            }
        };

        let section = &mut self.sections[index];
        section.emptied = false;
        section.entries.push(SectionEntry::Task(task));
    }

    /// Read models for every task, in document order, with inferred blockers.
    pub fn records(&self) -> Vec<TaskRecord> {
        let mut records = Vec::new();
        for section in &self.sections {
            let blockers = section.blocked_by();
            for task in section.tasks() {
                records.push(TaskRecord::from_task(
                    task,
                    section.project(),
                    blockers.get(&task.id),
                ));
            }
        }
        records
    }

    /// Read model for one task.
    pub fn record(&self, id: &str) -> Option<TaskRecord> {
        let (section, task) = self.find_task(id)?;
        let blockers = section.blocked_by();
        Some(TaskRecord::from_task(
            task,
            section.project(),
            blockers.get(&task.id),
        ))
    }

    fn open_section(&mut self, key: &str, header: &str) -> usize {
        if let Some(index) = self.sections.iter().position(|section| section.key == key) {
            return index;
        }
        self.sections.push(Section::new(key, header));
        self.sections.len() - 1
    }
}

/// Orders tasks by `policy`, moving each task together with its
/// more-indented followers so inferred blockers survive the reorder.
///
/// Ties keep their original relative order.
pub fn sort_tasks(tasks: Vec<Task>, policy: SortPolicy) -> Vec<Task> {
    if policy == SortPolicy::None || tasks.len() < 2 {
        return tasks;
    }
    let Some(base) = tasks.iter().map(|task| task.indent).min() else {
        return tasks;
    };

    // Leading tasks deeper than `base` have no head in this run; keep them first.
    let mut prefix = Vec::new();
    let mut blocks: Vec<(Task, Vec<Task>)> = Vec::new();
    for task in tasks {
        if task.indent <= base {
            blocks.push((task, Vec::new()));
        } else if let Some((_, children)) = blocks.last_mut() {
            children.push(task);
        } else {
            prefix.push(task);
        }
    }

    match policy {
        SortPolicy::Priority => blocks.sort_by_key(|(head, _)| head.priority.severity_rank()),
        SortPolicy::Created => {
            blocks.sort_by_key(|(head, _)| (head.created_at.is_none(), head.created_at))
        }
        SortPolicy::None => {}
    }

    let mut ordered = sort_tasks(prefix, policy);
    for (head, children) in blocks {
        ordered.push(head);
        ordered.extend(sort_tasks(children, policy));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::{sort_tasks, Document, SortPolicy, UNTAGGED_SECTION_KEY};
    use crate::codec::LineCodec;
    use crate::identity::IdentityMap;
    use crate::model::task::{Priority, Task};

    fn task(id: &str, indent: usize, priority: Priority) -> Task {
        let mut task = Task::new(id, id);
        task.indent = indent;
        task.priority = priority;
        task
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.id.as_str()).collect()
    }

    #[test]
    fn priority_sort_is_stable_and_moves_children_with_parent() {
        let tasks = vec![
            task("low", 0, Priority::Low),
            task("low-child", 2, Priority::Critical),
            task("high-a", 0, Priority::High),
            task("high-b", 0, Priority::High),
        ];
        let sorted = sort_tasks(tasks, SortPolicy::Priority);
        assert_eq!(ids(&sorted), vec!["high-a", "high-b", "low", "low-child"]);
    }

    #[test]
    fn none_policy_keeps_order() {
        let tasks = vec![task("b", 0, Priority::Low), task("a", 0, Priority::High)];
        assert_eq!(ids(&sort_tasks(tasks, SortPolicy::None)), vec!["b", "a"]);
    }

    #[test]
    fn lines_before_first_heading_form_untagged_section() {
        let mut identity = IdentityMap::in_memory();
        let document = Document::parse(
            "- [ ] Loose task\n\n## Home\n- [ ] Mow lawn\n",
            &LineCodec::default(),
            &mut identity,
        );
        let keys: Vec<&str> = document
            .sections()
            .iter()
            .map(|section| section.key.as_str())
            .collect();
        assert_eq!(keys, vec![UNTAGGED_SECTION_KEY, "home"]);
    }

    #[test]
    fn render_is_a_fixed_point() {
        let source = "Intro paragraph\n- [ ] Loose task !\n\n### work\n\n- [ ] Ship it !! #q3\n    - [x] Write tests\n";
        let codec = LineCodec::default();
        let mut identity = IdentityMap::in_memory();
        let rendered = Document::parse(source, &codec, &mut identity).render(&codec);
        let again = Document::parse(&rendered, &codec, &mut identity).render(&codec);
        assert_eq!(rendered, source);
        assert_eq!(again, rendered);
    }
}
