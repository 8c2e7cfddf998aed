//! Task store use-case service.
//!
//! # Responsibility
//! - Expose add/list/get/update/delete over one remote markdown document.
//! - Run every operation as read, parse, mutate, sort, render, write.
//! - Keep the identity map in step with the document and flush it.
//!
//! # Invariants
//! - Every operation re-reads and re-parses the remote document; nothing is
//!   cached between calls.
//! - Tasks are located by reconciled id, never by raw text.
//! - A write is issued only after the whole document rendered; identity
//!   changes tied to a mutation are applied only after the write succeeded.
//! - Logs carry ids and counts only, never task text.
//!
//! # Concurrency
//! Single-threaded and lock-free. Overlapping writers (another process or a
//! person editing the note) race on read-modify-write: last write wins.

use crate::codec::tags::is_hashtag;
use crate::codec::{collapse_whitespace, LineCodec, ParsedLine};
use crate::config::StoreConfig;
use crate::identity::{IdentityError, IdentityMap};
use crate::model::document::{Document, UNTAGGED_SECTION_KEY};
use crate::model::task::{
    normalize_tag, normalize_tags, Priority, Task, TaskId, TaskRecord, TaskStatus,
};
use crate::remote::{DocumentStore, TransportError};
use chrono::{Local, NaiveDateTime, Timelike};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Service error for task store use-cases.
#[derive(Debug)]
pub enum StoreError {
    /// No task in the freshly parsed document maps to this id.
    NotFound(TaskId),
    /// Caller input rejected before touching the document.
    InvalidInput(String),
    /// Remote document read or write failed.
    Transport(TransportError),
    /// Identity side file could not be flushed.
    Identity(IdentityError),
}

impl StoreError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Transport(_) => "transport_failed",
            Self::Identity(_) => "identity_flush_failed",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Identity(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Identity(err) => Some(err),
            Self::NotFound(_) | Self::InvalidInput(_) => None,
        }
    }
}

impl From<TransportError> for StoreError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<IdentityError> for StoreError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

/// Request model for `add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    /// Section to file the task under; defaults to the first tag.
    pub project: Option<String>,
    /// Defaults to the codec's "no marker" priority.
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Filter options for `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Section key match, case-insensitive.
    pub project: Option<String>,
    pub status: Option<TaskStatus>,
}

/// Identity bookkeeping applied once a mutation has been written.
enum IdentityChange {
    Keep,
    Rekey { old_text: String, new_text: String },
    Evict,
}

/// Task store over one remote markdown document.
pub struct TaskStore<S: DocumentStore> {
    remote: S,
    config: StoreConfig,
    codec: LineCodec,
    identity: IdentityMap,
}

impl<S: DocumentStore> TaskStore<S> {
    /// Creates a store, loading the identity map named by `config`.
    pub fn open(remote: S, config: StoreConfig) -> Self {
        let identity = match config.identity_path.as_ref() {
            Some(path) => IdentityMap::load(path),
            None => IdentityMap::in_memory(),
        };
        Self::with_identity(remote, config, identity)
    }

    /// Creates a store around an already loaded identity map.
    pub fn with_identity(remote: S, config: StoreConfig, identity: IdentityMap) -> Self {
        let codec = config.codec();
        Self {
            remote,
            config,
            codec,
            identity,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    pub fn remote(&self) -> &S {
        &self.remote
    }

    /// Mutable access to the remote, e.g. to simulate an out-of-band edit.
    pub fn remote_mut(&mut self) -> &mut S {
        &mut self.remote
    }

    /// Adds one task under its project or first-tag section.
    ///
    /// Always mints a fresh id; history is not fuzzy-matched for new tasks.
    /// Markup in the text (trailing tags, a priority marker, a leading
    /// timestamp or bracketed id) is split off first, so the stored text is
    /// what later reads see. Explicit request fields win over typed markup.
    pub fn add(&mut self, request: NewTask) -> StoreResult<TaskRecord> {
        let started_at = Instant::now();
        let result = self.add_inner(request);
        log_outcome(
            "task_add",
            result.as_ref().ok().map(|record| record.id.as_str()),
            started_at,
            &result,
        );
        result
    }

    /// Lists tasks in rendered order, with inferred blockers.
    pub fn list(&mut self, query: &TaskQuery) -> StoreResult<Vec<TaskRecord>> {
        let started_at = Instant::now();
        let result = self.list_inner(query);
        log_outcome("task_list", None, started_at, &result);
        if let Ok(records) = &result {
            debug!("event=task_list module=store count={}", records.len());
        }
        result
    }

    /// Gets one task by id.
    pub fn get(&mut self, id: &str) -> StoreResult<TaskRecord> {
        let started_at = Instant::now();
        let id = canonical_id(id);
        let result = self.read_document().and_then(|document| {
            document
                .record(&id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))
        });
        log_outcome("task_get", Some(&id), started_at, &result);
        result
    }

    /// Ticks or unticks the checkbox.
    pub fn update_status(&mut self, id: &str, status: TaskStatus) -> StoreResult<TaskRecord> {
        self.modify("task_update_status", id, |document, id| {
            let task = document
                .task_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            task.status = status;
            Ok(IdentityChange::Keep)
        })
    }

    /// Replaces the free text and re-keys the identity map to the new text.
    ///
    /// Markup typed into `text` is applied the way a read would see it: a
    /// priority marker sets the priority, trailing tags are added, a leading
    /// timestamp sets `created_at`.
    pub fn update_text(&mut self, id: &str, text: &str) -> StoreResult<TaskRecord> {
        let codec = self.codec;
        let parsed = canonical_line(&codec, text)?;
        let extra_tags = validated_tags(&parsed.tags)?;
        self.modify("task_update_text", id, move |document, id| {
            let task = document
                .task_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let old_text = std::mem::replace(&mut task.text, parsed.text.clone());
            if parsed.priority != codec.default_priority() {
                task.priority = parsed.priority;
            }
            if parsed.created_at.is_some() {
                task.created_at = parsed.created_at;
            }
            for tag in extra_tags {
                if !task.tags.contains(&tag) {
                    task.tags.push(tag);
                }
            }
            ensure_round_trip(&codec, task)?;
            Ok(IdentityChange::Rekey {
                old_text,
                new_text: parsed.text,
            })
        })
    }

    pub fn update_priority(&mut self, id: &str, priority: Priority) -> StoreResult<TaskRecord> {
        self.modify("task_update_priority", id, |document, id| {
            let task = document
                .task_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            task.priority = priority;
            Ok(IdentityChange::Keep)
        })
    }

    /// Replaces the tag set.
    ///
    /// A task filed under a tag heading (or under no heading) moves to the
    /// section of its new first tag; tasks under free-text project headings
    /// stay where they are.
    pub fn update_tags<T: AsRef<str>>(&mut self, id: &str, tags: &[T]) -> StoreResult<TaskRecord> {
        let tags = validated_tags(tags)?;
        let heading_level = self.config.heading_level;
        self.modify("task_update_tags", id, move |document, id| {
            let (current_key, movable) = document
                .find_task(id)
                .map(|(section, _)| {
                    (
                        section.key.clone(),
                        section.is_untagged() || section.implied_tag().is_some(),
                    )
                })
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let desired_key = tags
                .first()
                .cloned()
                .unwrap_or_else(|| UNTAGGED_SECTION_KEY.to_string());

            if movable && desired_key != current_key {
                let mut task = document
                    .remove_task(id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                task.tags = tags;
                task.indent = 0;
                let key = task.primary_tag().map(str::to_string);
                document.insert_task(key.as_deref(), task, heading_level);
            } else {
                let task = document
                    .task_mut(id)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                task.tags = tags;
            }
            Ok(IdentityChange::Keep)
        })
    }

    /// Removes one task and evicts its identity.
    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let id = canonical_id(id);
        let result = self.delete_inner(&id);
        log_outcome("task_delete", Some(&id), started_at, &result);
        result
    }

    fn add_inner(&mut self, request: NewTask) -> StoreResult<TaskRecord> {
        let parsed = canonical_line(&self.codec, &request.text)?;
        let mut tags = validated_tags(&[request.tags, parsed.tags].concat())?;
        let section_key = match request.project.as_deref().and_then(normalize_tag) {
            Some(project) => {
                if is_tag_word(&project) {
                    tags.retain(|tag| *tag != project);
                    tags.insert(0, project.clone());
                }
                Some(project)
            }
            None => tags.first().cloned(),
        };

        let mut task = Task::new(String::new(), parsed.text);
        task.priority = request.priority.unwrap_or(parsed.priority);
        task.tags = tags;
        task.created_at = Some(parsed.created_at.unwrap_or_else(current_minute));
        ensure_round_trip(&self.codec, &task)?;

        let mut document = self.load_document()?;
        let id = self.identity.mint(&task.text, &document.task_ids());
        task.id = id.clone();
        document.insert_task(section_key.as_deref(), task, self.config.heading_level);

        self.commit(&mut document, &id, IdentityChange::Keep)?;
        document
            .record(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn list_inner(&mut self, query: &TaskQuery) -> StoreResult<Vec<TaskRecord>> {
        let project = query.project.as_deref().and_then(normalize_tag);
        let records = self.read_document()?.records();
        Ok(records
            .into_iter()
            .filter(|record| match project.as_deref() {
                Some(project) => record.project.as_deref() == Some(project),
                None => true,
            })
            .filter(|record| query.status.map_or(true, |status| record.status == status))
            .collect())
    }

    fn delete_inner(&mut self, id: &str) -> StoreResult<()> {
        let mut document = self.load_document()?;
        document
            .remove_task(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.commit(&mut document, id, IdentityChange::Evict)
    }

    /// Shared read-modify-write cycle for in-place updates.
    fn modify<F>(&mut self, event: &'static str, id: &str, apply: F) -> StoreResult<TaskRecord>
    where
        F: FnOnce(&mut Document, &str) -> StoreResult<IdentityChange>,
    {
        let started_at = Instant::now();
        let id = canonical_id(id);
        let result = self.load_document().and_then(|mut document| {
            let change = apply(&mut document, &id)?;
            self.commit(&mut document, &id, change)?;
            document
                .record(&id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))
        });
        log_outcome(event, Some(&id), started_at, &result);
        result
    }

    /// Parses the remote document for a read-only operation, flushing the
    /// identity map when parsing minted ids.
    fn read_document(&mut self) -> StoreResult<Document> {
        let mut document = self.load_document()?;
        document.sort(self.config.sort_policy);
        if self.identity.is_dirty() {
            self.identity.flush()?;
        }
        Ok(document)
    }

    fn load_document(&mut self) -> StoreResult<Document> {
        let text = self.remote.read()?;
        let document = Document::parse(&text, &self.codec, &mut self.identity);
        debug!(
            "event=document_load module=store status=ok bytes={} sections={}",
            text.len(),
            document.sections().len()
        );
        Ok(document)
    }

    /// Sorts, renders and writes `document`, then applies `change` and
    /// flushes the identity map.
    fn commit(
        &mut self,
        document: &mut Document,
        id: &str,
        change: IdentityChange,
    ) -> StoreResult<()> {
        document.sort(self.config.sort_policy);
        let rendered = document.render(&self.codec);
        self.remote.write(&rendered)?;

        match change {
            IdentityChange::Keep => {}
            IdentityChange::Rekey { old_text, new_text } => {
                self.identity.update_text(&old_text, &new_text, id);
            }
            IdentityChange::Evict => {
                self.identity.evict(id);
            }
        }
        self.identity.flush()?;
        Ok(())
    }
}

/// Ids are minted and adopted in lowercase hex.
fn canonical_id(id: &str) -> TaskId {
    id.trim().to_ascii_lowercase()
}

/// Reads caller text the way the note would read it back, splitting any
/// typed markup from the free text.
fn canonical_line(codec: &LineCodec, text: &str) -> StoreResult<ParsedLine> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        return Err(StoreError::InvalidInput("task text is empty".to_string()));
    }
    codec.parse_line(&format!("- [ ] {text}")).ok_or_else(|| {
        StoreError::InvalidInput("task text is empty once markup is stripped".to_string())
    })
}

/// Rejects a task whose written line would parse back to different text.
fn ensure_round_trip(codec: &LineCodec, task: &Task) -> StoreResult<()> {
    match codec.parse_line(&codec.format_line(task)) {
        Some(parsed) if parsed.text == task.text => Ok(()),
        _ => Err(StoreError::InvalidInput(
            "task text does not read back unchanged".to_string(),
        )),
    }
}

fn is_tag_word(value: &str) -> bool {
    is_hashtag(&format!("#{value}"))
}

fn validated_tags<T: AsRef<str>>(tags: &[T]) -> StoreResult<Vec<String>> {
    let normalized = normalize_tags(tags);
    if let Some(bad) = normalized.iter().find(|tag| !is_tag_word(tag)) {
        return Err(StoreError::InvalidInput(format!("invalid tag: `{bad}`")));
    }
    Ok(normalized)
}

fn current_minute() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.date()
        .and_hms_opt(now.hour(), now.minute(), 0)
        .unwrap_or(now)
}

fn log_outcome<T>(event: &str, id: Option<&str>, started_at: Instant, result: &StoreResult<T>) {
    let id = id.unwrap_or("-");
    match result {
        Ok(_) => info!(
            "event={event} module=store status=ok id={id} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) if matches!(err, StoreError::NotFound(_) | StoreError::InvalidInput(_)) => warn!(
            "event={event} module=store status=error id={id} duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
        Err(err) => error!(
            "event={event} module=store status=error id={id} duration_ms={} error_code={} error={err}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{validated_tags, StoreError};

    #[test]
    fn validated_tags_rejects_multi_word_tags() {
        let err = validated_tags(&["deep work"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(
            validated_tags(&["#Work", "work", "q3"]).expect("valid tags"),
            vec!["work", "q3"]
        );
    }
}
