//! Shared data models for the Longtake render service.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their pipeline stages
//! - Uploaded artifacts returned by the storage backend

pub mod artifact;
pub mod job;

// Re-export common types
pub use artifact::UploadedArtifact;
pub use job::{Job, JobId, JobKind, JobStage, DEFAULT_CONCAT_OUTPUT, DEFAULT_RENDER_OUTPUT};
