//! Outcome-driven cleanup of job temp files.
//!
//! Cleanup is best-effort and never fails: deletion errors are logged and
//! swallowed so they cannot mask the job's real outcome.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

/// The temp files owned by one job, handed over at job end.
#[derive(Debug, Clone)]
pub struct JobFiles {
    /// Input temp files (uploaded parts, concat list file)
    pub inputs: Vec<PathBuf>,
    /// Produced output file
    pub output: PathBuf,
    /// Shared scratch directory holding the inputs
    pub scratch_dir: PathBuf,
}

/// How the job ended, selecting the cleanup branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Transcode and upload both succeeded
    Succeeded,
    /// The transcode step failed or timed out
    TranscodeFailed,
    /// The upload step failed after a successful transcode
    UploadFailed,
}

/// Sweep a finished job's files according to the outcome policy.
///
/// On success, all inputs and the output are deleted and the scratch
/// directory is pruned if it ended up empty. On transcode or upload failure
/// every file is retained for diagnosis; each retained path is logged so
/// the disk cost of the policy stays visible.
pub async fn sweep(outcome: JobOutcome, files: &JobFiles) {
    match outcome {
        JobOutcome::Succeeded => {
            for input in &files.inputs {
                remove_file_quiet(input).await;
            }
            remove_file_quiet(&files.output).await;
            prune_dir_if_empty(&files.scratch_dir).await;
        }
        JobOutcome::TranscodeFailed | JobOutcome::UploadFailed => {
            for path in files.inputs.iter().chain(Some(&files.output)) {
                if path.exists() {
                    warn!(path = %path.display(), "Retaining file after failed job");
                }
            }
        }
    }
}

/// Delete a file, swallowing errors. A file that is already gone is fine.
pub async fn remove_file_quiet(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp file"),
    }
}

/// Remove a directory if (and only if) it is empty.
///
/// Idempotent and tolerant of races: a concurrent job dropping a new file
/// between the emptiness check and the removal just makes the removal fail,
/// which is swallowed like any other cleanup error.
pub async fn prune_dir_if_empty(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to inspect scratch dir");
            return;
        }
    };

    match entries.next_entry().await {
        Ok(Some(_)) => {} // still in use
        Ok(None) => match fs::remove_dir(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Pruned empty scratch dir"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to prune scratch dir"),
        },
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to inspect scratch dir");
        }
    }
}
