//! Input validation.
//!
//! Pure checks over already-received data: multipart decoding and body
//! parsing happen in the handlers, validation here. A job that fails
//! validation never reaches the transcode or upload stages.

use std::path::{Path, PathBuf};

use ltake_media::ConcatList;
use ltake_models::{Job, JobKind, DEFAULT_CONCAT_OUTPUT, DEFAULT_RENDER_OUTPUT};

use crate::error::{ApiError, ApiResult};

/// Raw parts received for a render request, already saved to scratch.
#[derive(Debug, Default)]
pub struct RenderParts {
    pub image: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    pub filename: Option<String>,
}

/// Validate a render request: exactly one image and one audio part.
pub fn validate_render(parts: RenderParts, renders_dir: &Path) -> ApiResult<Job> {
    let image = parts
        .image
        .ok_or_else(|| ApiError::validation("Missing image or audio file"))?;
    let audio = parts
        .audio
        .ok_or_else(|| ApiError::validation("Missing image or audio file"))?;

    let name = output_name(parts.filename, DEFAULT_RENDER_OUTPUT);
    Ok(Job::new(JobKind::Render, &name, renders_dir.join(&name))
        .with_input(image)
        .with_input(audio)
        .validated())
}

/// Validate a concatenate request: non-empty concat-directive text.
pub fn validate_concat(
    concat_list: Option<&str>,
    output: Option<String>,
    renders_dir: &Path,
) -> ApiResult<(Job, ConcatList)> {
    let list = ConcatList::parse(concat_list.unwrap_or_default())
        .map_err(|_| ApiError::validation("Missing or empty concat list"))?;

    let name = output_name(output, DEFAULT_CONCAT_OUTPUT);
    let job = Job::new(JobKind::Concat, &name, renders_dir.join(&name)).validated();
    Ok((job, list))
}

/// Resolve the declared output filename, falling back to the default.
///
/// Only the final path component is kept: output names derive from
/// user-controlled request data and must not escape the renders directory.
fn output_name(requested: Option<String>, default: &str) -> String {
    let name = requested
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string());

    Path::new(&name)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| default.to_string())
}
