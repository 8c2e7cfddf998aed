//! Domain model for tasks kept in a markdown note.
//!
//! # Responsibility
//! - Define the task record shared by every store operation.
//! - Model a parsed note as ordered sections of tasks.
//!
//! # Invariants
//! - Tasks exist only as entries of a section.
//! - Documents are transient: rebuilt from raw text for every operation.

pub mod document;
pub mod task;
