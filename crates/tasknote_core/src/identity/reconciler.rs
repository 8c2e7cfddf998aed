use crate::model::task::TaskId;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Minimum similarity ratio for two normalized texts to share an id.
pub const SIMILARITY_THRESHOLD: f32 = 0.85;
/// Length of every minted id.
pub const ID_LENGTH: usize = 8;

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Side-file persistence failure.
#[derive(Debug)]
pub enum IdentityError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "identity file `{}` io error: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "identity map serialization failed: {err}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Wire shape of the side file: `{"ids": {"<normalized text>": "<id>"}}`.
#[derive(Debug, Default, Deserialize)]
struct IdentityFile {
    #[serde(default)]
    ids: BTreeMap<String, TaskId>,
}

#[derive(Serialize)]
struct IdentityFileRef<'a> {
    ids: &'a BTreeMap<String, TaskId>,
}

/// Normalized text to stable id mapping with an explicit load/flush lifecycle.
#[derive(Debug, Default)]
pub struct IdentityMap {
    path: Option<PathBuf>,
    ids: BTreeMap<String, TaskId>,
    dirty: bool,
}

impl IdentityMap {
    /// Creates an empty map that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the map from `path`.
    ///
    /// A missing file starts an empty map. An unreadable or corrupt file also
    /// starts an empty map and logs a warning; previously known ids will be
    /// re-minted on next parse.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<IdentityFile>(&raw) {
                Ok(file) => {
                    info!(
                        "event=identity_load module=identity status=ok entries={}",
                        file.ids.len()
                    );
                    file.ids
                }
                Err(err) => {
                    warn!(
                        "event=identity_load module=identity status=error error_code=identity_corrupt path={} error={}",
                        path.display(),
                        err
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("event=identity_load module=identity status=ok entries=0 reason=missing");
                BTreeMap::new()
            }
            Err(err) => {
                warn!(
                    "event=identity_load module=identity status=error error_code=identity_unreadable path={} error={}",
                    path.display(),
                    err
                );
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            ids,
            dirty: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns whether the map changed since the last load or flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Exact lookup by (unnormalized) text.
    pub fn lookup(&self, text: &str) -> Option<&TaskId> {
        self.ids.get(&normalize(text))
    }

    /// Returns the id for `text`, minting one when nothing matches.
    pub fn get_or_create_id(&mut self, text: &str) -> TaskId {
        self.resolve(text, &HashSet::new())
    }

    /// Resolves the id for `text`, skipping ids in `taken`.
    ///
    /// Order: exact normalized key, then the best fuzzy match at or above
    /// `SIMILARITY_THRESHOLD`, then a fresh id. A fuzzy hit does not rewrite
    /// the stored key. When the exact key belongs to a task already seen in
    /// this document, the text is a duplicate and resolves through an
    /// occurrence-suffixed key instead.
    pub fn resolve(&mut self, text: &str, taken: &HashSet<TaskId>) -> TaskId {
        let key = normalize(text);
        match self.ids.get(&key) {
            Some(id) if !taken.contains(id) => return id.clone(),
            Some(_) => return self.resolve_duplicate(&key, taken),
            None => {}
        }

        if let Some(id) = self.best_fuzzy_match(&key, taken) {
            debug!("event=identity_resolve module=identity status=ok match=fuzzy id={id}");
            return id;
        }

        self.insert_fresh(key)
    }

    /// Records an explicit id for `text`, replacing any previous mapping.
    pub fn register(&mut self, text: &str, id: &str) {
        let key = normalize(text);
        if self.ids.get(&key).map(String::as_str) != Some(id) {
            self.ids.insert(key, id.to_string());
            self.dirty = true;
        }
    }

    /// Mints a fresh id for `text` without consulting fuzzy matching.
    ///
    /// Any leftover mapping for the same normalized text is overwritten,
    /// unless it belongs to a task in `taken`, in which case the new id goes
    /// to the next occurrence slot.
    pub fn mint(&mut self, text: &str, taken: &HashSet<TaskId>) -> TaskId {
        let key = normalize(text);
        let mut slot = key.clone();
        let mut occurrence = 1;
        while self.ids.get(&slot).is_some_and(|id| taken.contains(id)) {
            occurrence += 1;
            slot = occurrence_key(&key, occurrence);
        }
        self.insert_fresh(slot)
    }

    /// Moves `id` from the normalized form of `old_text` to `new_text`.
    pub fn update_text(&mut self, old_text: &str, new_text: &str, id: &str) {
        let old_key = normalize(old_text);
        if self.ids.get(&old_key).map(String::as_str) == Some(id) {
            self.ids.remove(&old_key);
        }
        self.ids.insert(normalize(new_text), id.to_string());
        self.dirty = true;
    }

    /// Removes every key that maps to `id`. Returns the number removed.
    pub fn evict(&mut self, id: &str) -> usize {
        let before = self.ids.len();
        self.ids.retain(|_, value| value != id);
        let removed = before - self.ids.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Rewrites the whole side file. In-memory maps only clear the dirty flag.
    pub fn flush(&mut self) -> IdentityResult<()> {
        let Some(path) = self.path.as_ref() else {
            self.dirty = false;
            return Ok(());
        };

        let payload = serde_json::to_string_pretty(&IdentityFileRef { ids: &self.ids })?;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| IdentityError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, payload).map_err(|source| IdentityError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            "event=identity_flush module=identity status=ok entries={}",
            self.ids.len()
        );
        self.dirty = false;
        Ok(())
    }

    fn resolve_duplicate(&mut self, key: &str, taken: &HashSet<TaskId>) -> TaskId {
        let mut occurrence = 2;
        loop {
            let slot = occurrence_key(key, occurrence);
            match self.ids.get(&slot) {
                Some(id) if !taken.contains(id) => return id.clone(),
                Some(_) => occurrence += 1,
                None => return self.insert_fresh(slot),
            }
        }
    }

    fn best_fuzzy_match(&self, key: &str, taken: &HashSet<TaskId>) -> Option<TaskId> {
        let mut best: Option<(f32, &TaskId)> = None;
        for (candidate, id) in &self.ids {
            if taken.contains(id) {
                continue;
            }
            let ratio = similarity_ratio(key, candidate);
            if best.map_or(true, |(score, _)| ratio > score) {
                best = Some((ratio, id));
            }
        }
        best.filter(|(score, _)| *score >= SIMILARITY_THRESHOLD)
            .map(|(_, id)| id.clone())
    }

    fn insert_fresh(&mut self, key: String) -> TaskId {
        let id = loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ID_LENGTH)
                .collect();
            if !self.ids.values().any(|existing| *existing == candidate) {
                break candidate;
            }
        };
        self.ids.insert(key, id.clone());
        self.dirty = true;
        id
    }
}

// Normalized text never contains `#`, so suffixed keys cannot collide with
// real task text.
fn occurrence_key(key: &str, occurrence: usize) -> String {
    format!("{key} #{occurrence}")
}

/// Lowercases, replaces punctuation with spaces, collapses whitespace.
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matching-character ratio: `2 * matched / (len(a) + len(b))` over an
/// optimal character alignment.
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}
