//! Concat-directive list handling.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Validated concat-directive text: one `file` entry per line, as the
/// transcoder's concat demuxer expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatList {
    text: String,
}

impl ConcatList {
    /// Validate raw directive text. Fails on empty or whitespace-only input;
    /// entries referencing unreadable segments are left for the transcoder
    /// to reject.
    pub fn parse(text: impl Into<String>) -> MediaResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(MediaError::EmptyConcatList);
        }
        Ok(Self { text })
    }

    /// Build a list from segment paths, escaping each entry.
    pub fn from_segments<I, P>(segments: I) -> MediaResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let text = segments
            .into_iter()
            .map(|p| entry(p.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        Self::parse(text)
    }

    /// The directive text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Write the list to a uniquely-named file under `dir`, creating the
    /// directory if needed. The returned path is owned by the calling job.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> MediaResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let path = dir.join(format!("concat-{}.txt", Uuid::new_v4()));
        fs::write(&path, self.text.as_bytes()).await?;
        Ok(path)
    }
}

/// Render one concat-directive entry for a segment path.
///
/// The concat demuxer reads single-quoted paths; a literal quote inside the
/// path is closed, escaped and reopened (`'` becomes `'\''`).
pub fn entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'", escaped)
}
