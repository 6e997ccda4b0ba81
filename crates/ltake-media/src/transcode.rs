//! Domain invocations and timeout policy.

use std::path::Path;
use std::time::Duration;

use crate::command::{FfmpegCommand, FfmpegInvocation};

/// Wall-clock timeout for render invocations.
pub const RENDER_TIMEOUT_SECS: u64 = 120;

/// Wall-clock timeout for concatenate invocations.
pub const CONCAT_TIMEOUT_SECS: u64 = 180;

/// Build the invocation rendering a still image plus an audio track into a
/// video.
///
/// The image input loops for the duration of the audio (`-shortest` bounds
/// the output by the shorter stream), encoded with libx264 tuned for still
/// images, constant yuv420p pixel format, overwriting any existing output.
pub fn render_invocation(
    image: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> FfmpegInvocation {
    FfmpegCommand::new(output)
        .input_with_args(["-loop", "1"], image)
        .input(audio)
        .shortest()
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .tune("stillimage")
        .build(Duration::from_secs(RENDER_TIMEOUT_SECS))
}

/// Build the invocation concatenating the segments named by a list file.
///
/// Uses the demuxer-level concat mode over an explicit list file with
/// stream copy, so segments are joined without re-encoding. `-safe 0`
/// admits absolute segment paths in the list.
pub fn concat_invocation(
    list_file: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> FfmpegInvocation {
    FfmpegCommand::new(output)
        .input_with_args(["-f", "concat", "-safe", "0"], list_file)
        .codec_copy()
        .build(Duration::from_secs(CONCAT_TIMEOUT_SECS))
}
