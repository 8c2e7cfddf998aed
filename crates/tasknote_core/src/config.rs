//! Store configuration.
//!
//! # Responsibility
//! - Select the on-disk spelling for priority, tags and timestamps.
//! - Carry sort policy, heading level and identity side-file location.
//!
//! # Invariants
//! - Every field has a default, so partial JSON documents are valid.
//! - `heading_level` is validated to `1..=6` on load.
//! - Configuration is passed explicitly to the store; there is no global.

use crate::codec::{LineCodec, PriorityStyle, TagStyle, TimestampStyle};
use crate::model::document::SortPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_HEADING_LEVEL: u8 = 3;

/// Configuration loading error.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidHeadingLevel(u8),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::InvalidHeadingLevel(level) => {
                write!(f, "heading_level must be within 1..=6, got {level}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidHeadingLevel(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Per-document store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub priority_style: PriorityStyle,
    pub tag_style: TagStyle,
    pub timestamp_style: TimestampStyle,
    pub sort_policy: SortPolicy,
    /// Markdown heading level used for sections created by `add`.
    pub heading_level: u8,
    /// Identity side file; `None` keeps ids in memory only.
    pub identity_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            priority_style: PriorityStyle::default(),
            tag_style: TagStyle::default(),
            timestamp_style: TimestampStyle::default(),
            sort_policy: SortPolicy::default(),
            heading_level: DEFAULT_HEADING_LEVEL,
            identity_path: None,
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=6).contains(&self.heading_level) {
            return Err(ConfigError::InvalidHeadingLevel(self.heading_level));
        }
        Ok(())
    }

    /// Builds the line codec for the configured styles.
    pub fn codec(&self) -> LineCodec {
        LineCodec::new(self.priority_style, self.tag_style, self.timestamp_style)
    }
}
