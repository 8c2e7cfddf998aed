//! Core use-case services.
//!
//! # Responsibility
//! - Compose codec, document model and identity map into store operations.
//! - Keep callers decoupled from document and transport details.

pub mod task_service;
