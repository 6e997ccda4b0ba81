//! FFmpeg CLI wrapper for the Longtake render service.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument vectors, never shell strings)
//! - Process supervision with wall-clock timeouts and stderr capture
//! - Concat-list validation and escaping
//! - Outcome-driven cleanup of job temp files

pub mod cleanup;
pub mod command;
pub mod concat;
pub mod error;
pub mod transcode;

pub use cleanup::{sweep, JobFiles, JobOutcome};
pub use command::{FfmpegCommand, FfmpegInvocation, FfmpegRunner};
pub use concat::ConcatList;
pub use error::{MediaError, MediaResult};
pub use transcode::{concat_invocation, render_invocation, CONCAT_TIMEOUT_SECS, RENDER_TIMEOUT_SECS};
