//! Job definitions for the transcode-and-upload pipeline.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default output filename for render jobs.
pub const DEFAULT_RENDER_OUTPUT: &str = "output.mp4";

/// Default output filename for concatenate jobs.
pub const DEFAULT_CONCAT_OUTPUT: &str = "long_take.mp4";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of job flowing through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Render a video from a still image and an audio track
    Render,
    /// Concatenate existing segments losslessly
    Concat,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Render => "render",
            JobKind::Concat => "concat",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage of a job.
///
/// `Received` is initial; `Completed` and `Failed` are terminal. Failure
/// edges exist from `Validated`, `Transcoding` and `Uploading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Request received, inputs not yet checked
    #[default]
    Received,
    /// Inputs validated, invocation not yet built
    Validated,
    /// External transcode process running
    Transcoding,
    /// Transcode finished, output file on disk
    Transcoded,
    /// Upload to remote storage in flight
    Uploading,
    /// Artifact uploaded, temp files swept
    Completed,
    /// Terminal failure, carries the originating error
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Validated => "validated",
            JobStage::Transcoding => "transcoding",
            JobStage::Transcoded => "transcoded",
            JobStage::Uploading => "uploading",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }
}

/// One request's worth of transcode-and-upload work.
///
/// A job owns its input temp files for its lifetime; ownership passes to
/// the cleanup coordinator when the job reaches a terminal stage. Only the
/// orchestrator advances a job after creation, and each stage is attempted
/// exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Job kind
    pub kind: JobKind,

    /// Input files owned by this job (uploaded parts, concat list file)
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Declared output filename
    pub output_name: String,

    /// Computed output path under the renders directory
    pub output_path: PathBuf,

    /// Current pipeline stage
    #[serde(default)]
    pub stage: JobStage,

    /// Error message (terminal failures only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job at the `Received` stage.
    pub fn new(kind: JobKind, output_name: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            id: JobId::new(),
            kind,
            inputs: Vec::new(),
            output_name: output_name.into(),
            output_path,
            stage: JobStage::Received,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an input temp file owned by this job.
    pub fn with_input(mut self, path: PathBuf) -> Self {
        self.inputs.push(path);
        self
    }

    /// Mark inputs as validated.
    pub fn validated(mut self) -> Self {
        self.stage = JobStage::Validated;
        self
    }

    /// Mark the external process as running.
    pub fn transcoding(mut self) -> Self {
        self.stage = JobStage::Transcoding;
        self
    }

    /// Mark the transcode as finished.
    pub fn transcoded(mut self) -> Self {
        self.stage = JobStage::Transcoded;
        self
    }

    /// Mark the upload as in flight.
    pub fn uploading(mut self) -> Self {
        self.stage = JobStage::Uploading;
        self
    }

    /// Mark the job as completed.
    pub fn complete(mut self) -> Self {
        self.stage = JobStage::Completed;
        self
    }

    /// Mark the job as failed with the originating error.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.stage = JobStage::Failed;
        self.error = Some(error.into());
        self
    }

    /// Whether the job has reached a terminal stage.
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job() -> Job {
        Job::new(JobKind::Render, "t.mp4", PathBuf::from("renders/t.mp4"))
    }

    #[test]
    fn test_job_creation() {
        let job = test_job();
        assert_eq!(job.kind, JobKind::Render);
        assert_eq!(job.stage, JobStage::Received);
        assert!(job.inputs.is_empty());
        assert!(job.error.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_success_path_transitions() {
        let job = test_job()
            .with_input(PathBuf::from("uploads/img"))
            .with_input(PathBuf::from("uploads/aud"))
            .validated()
            .transcoding()
            .transcoded()
            .uploading()
            .complete();

        assert_eq!(job.stage, JobStage::Completed);
        assert_eq!(job.inputs.len(), 2);
        assert!(job.is_terminal());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_failure_carries_error() {
        let job = test_job().validated().transcoding().fail("ffmpeg exited with code 1");

        assert_eq!(job.stage, JobStage::Failed);
        assert!(job.is_terminal());
        assert_eq!(job.error.as_deref(), Some("ffmpeg exited with code 1"));
    }

    #[test]
    fn test_stage_terminality() {
        assert!(!JobStage::Received.is_terminal());
        assert!(!JobStage::Uploading.is_terminal());
        assert!(JobStage::Completed.is_terminal());
        assert!(JobStage::Failed.is_terminal());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(JobKind::Render.as_str(), "render");
        assert_eq!(JobKind::Concat.as_str(), "concat");
    }
}
