//! Remote note document access.
//!
//! # Responsibility
//! - Define the whole-document read/write contract the store consumes.
//! - Provide in-memory and local-file adapters.
//!
//! # Invariants
//! - `read` returns the full text; an absent document reads as empty.
//! - `write` replaces the full text; there is no partial or append write.
//! - Adapters never retry; failures surface as `TransportError`.

mod file;
mod memory;

pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RemoteResult<T> = Result<T, TransportError>;

/// Which half of the read/write pair failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Read,
    Write,
}

impl RemoteOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Transport failure reported by a document store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub operation: RemoteOperation,
    /// Stable machine-readable code, e.g. `io_error` or `unauthorized`.
    pub code: String,
    pub message: String,
    /// Hint for callers; the core itself never retries.
    pub retryable: bool,
}

impl TransportError {
    pub fn new(
        operation: RemoteOperation,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            operation,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "remote {} failed [{}]: {}",
            self.operation.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for TransportError {}

/// Opaque whole-document store hosted by the note-taking application.
pub trait DocumentStore {
    /// Returns the full document text, or an empty string when absent.
    fn read(&self) -> RemoteResult<String>;
    /// Replaces the full document text.
    fn write(&mut self, text: &str) -> RemoteResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn read(&self) -> RemoteResult<String> {
        (**self).read()
    }

    fn write(&mut self, text: &str) -> RemoteResult<()> {
        (**self).write(text)
    }
}
