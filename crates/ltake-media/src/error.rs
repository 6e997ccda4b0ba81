//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while building or supervising an FFmpeg invocation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Expected output file missing: {0}")]
    OutputMissing(PathBuf),

    #[error("Concat list is empty")]
    EmptyConcatList,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Diagnostic text suitable for surfacing to the caller.
    ///
    /// Prefers captured stderr over the summary message, since ffmpeg puts
    /// the actual cause there.
    pub fn diagnostic(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{}: {}", message, stderr.trim()),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with code 1",
            Some("concat.txt: No such file or directory\n".to_string()),
            Some(1),
        );
        let diag = err.diagnostic();
        assert!(diag.contains("exited with code 1"));
        assert!(diag.contains("No such file or directory"));
    }

    #[test]
    fn test_diagnostic_without_stderr() {
        let err = MediaError::Timeout(120);
        assert_eq!(err.diagnostic(), "Operation timed out after 120 seconds");
    }
}
