//! Core of a task tracker whose tasks live as checkbox lines in one
//! human-editable markdown note.
//!
//! Components, bottom-up: the syntax codec (`codec`), the document model
//! (`model::document`), the identity reconciler (`identity`) and the store
//! orchestrator (`service::task_service`).

pub mod codec;
pub mod config;
pub mod identity;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;

pub use codec::{LineCodec, ParsedLine, PriorityStyle, TagStyle, TimestampStyle};
pub use config::{ConfigError, StoreConfig};
pub use identity::{normalize, similarity_ratio, IdentityError, IdentityMap};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{sort_tasks, Document, Section, SectionEntry, SortPolicy};
pub use model::task::{Priority, Task, TaskId, TaskRecord, TaskStatus};
pub use remote::{
    DocumentStore, FileDocumentStore, MemoryDocumentStore, RemoteOperation, TransportError,
};
pub use service::task_service::{NewTask, StoreError, StoreResult, TaskQuery, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
