//! FFmpeg command builder and process supervisor.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Maximum bytes of diagnostic output retained per stream.
const DIAGNOSTIC_TAIL_BYTES: usize = 4096;

/// Builder for FFmpeg argument vectors.
///
/// Arguments are always passed to the process as discrete vector entries;
/// filenames are never interpolated into a shell string. Filenames derive
/// from user-controlled upload data, so this is a correctness requirement,
/// not a style choice.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input files, each with its pre-`-i` arguments
    inputs: Vec<(Vec<String>, PathBuf)>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the inputs)
    output_args: Vec<String>,
    /// Whether to overwrite an existing output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input file.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(std::iter::empty::<String>(), path)
    }

    /// Add an input file with arguments placed before its `-i`.
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push((
            args.into_iter().map(Into::into).collect(),
            path.as_ref().to_path_buf(),
        ));
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Bound the output duration by the shortest input stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set encoder tuning profile.
    pub fn tune(self, profile: impl Into<String>) -> Self {
        self.output_arg("-tune").output_arg(profile)
    }

    /// Copy all streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for (input_args, path) in &self.inputs {
            args.extend(input_args.iter().cloned());
            args.push("-i".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Finalize into an invocation with the given wall-clock timeout.
    pub fn build(self, timeout: Duration) -> FfmpegInvocation {
        let args = self.build_args();
        FfmpegInvocation {
            program: "ffmpeg".to_string(),
            args,
            output: self.output,
            timeout,
        }
    }
}

/// One external-process call: argument vector plus timeout.
///
/// Immutable once built; consumed by value by [`FfmpegRunner::run`] so each
/// invocation produces exactly one outcome.
#[derive(Debug, Clone)]
pub struct FfmpegInvocation {
    /// Executable to invoke
    pub program: String,
    /// Argument vector
    pub args: Vec<String>,
    /// Output file the process is expected to produce
    pub output: PathBuf,
    /// Wall-clock timeout
    pub timeout: Duration,
}

/// Supervisor for FFmpeg invocations.
///
/// Runs an invocation to completion or timeout, captures diagnostic output,
/// and classifies the result:
/// - exit 0 and the output file exists: success
/// - non-zero exit: [`MediaError::FfmpegFailed`] with the captured tail
/// - timeout: the process is force-killed and [`MediaError::Timeout`] returned
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }

    /// Run an invocation to completion or timeout.
    pub async fn run(&self, invocation: FfmpegInvocation) -> MediaResult<()> {
        which::which(&invocation.program).map_err(|_| MediaError::FfmpegNotFound)?;

        debug!(
            program = %invocation.program,
            args = %invocation.args.join(" "),
            "Spawning transcode process"
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");
        let stdout_tail = tokio::spawn(collect_tail(stdout));
        let stderr_tail = tokio::spawn(collect_tail(stderr));

        let timeout_secs = invocation.timeout.as_secs();
        let status = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    timeout_secs,
                    program = %invocation.program,
                    "Transcode timed out, killing process"
                );
                kill_quiet(&mut child).await;
                return Err(MediaError::Timeout(timeout_secs));
            }
        };

        let stderr_text = stderr_tail.await.unwrap_or_default();
        let stdout_text = stdout_tail.await.unwrap_or_default();

        if !status.success() {
            let diagnostic = if stderr_text.trim().is_empty() {
                stdout_text
            } else {
                stderr_text
            };
            return Err(MediaError::ffmpeg_failed(
                match status.code() {
                    Some(code) => format!("FFmpeg exited with code {}", code),
                    None => "FFmpeg terminated by signal".to_string(),
                },
                Some(diagnostic),
                status.code(),
            ));
        }

        if !invocation.output.exists() {
            return Err(MediaError::OutputMissing(invocation.output));
        }

        Ok(())
    }
}

/// Kill a child and reap it, ignoring errors from an already-dead process.
async fn kill_quiet(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill timed-out process");
    }
}

/// Collect the trailing lines of a stream, bounded to a fixed byte budget.
async fn collect_tail<R: AsyncRead + Unpin>(stream: R) -> String {
    let mut lines = VecDeque::new();
    let mut retained = 0usize;
    let mut reader = BufReader::new(stream).lines();

    while let Ok(Some(line)) = reader.next_line().await {
        retained += line.len() + 1;
        lines.push_back(line);
        while retained > DIAGNOSTIC_TAIL_BYTES {
            if let Some(dropped) = lines.pop_front() {
                retained -= dropped.len() + 1;
            } else {
                break;
            }
        }
    }

    lines.into_iter().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Shell invocation standing in for ffmpeg; the supervisor only cares
    /// about the argument vector, exit status and output file.
    fn sh(script: &str, output: &Path, timeout_secs: u64) -> FfmpegInvocation {
        FfmpegInvocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            output: output.to_path_buf(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[test]
    fn test_builder_argument_order() {
        let cmd = FfmpegCommand::new("renders/out.mp4")
            .input_with_args(["-loop", "1"], "uploads/img.png")
            .input("uploads/aud.mp3")
            .shortest()
            .video_codec("libx264");

        let args = cmd.build_args();
        assert_eq!(
            args,
            vec![
                "-y",
                "-v",
                "error",
                "-loop",
                "1",
                "-i",
                "uploads/img.png",
                "-i",
                "uploads/aud.mp3",
                "-shortest",
                "-c:v",
                "libx264",
                "renders/out.mp4",
            ]
        );
    }

    #[test]
    fn test_filenames_stay_single_arguments() {
        // Names with spaces and shell metacharacters must survive as one
        // argv entry each, exactly as supplied.
        let hostile = "renders/a b;$(rm -rf x)&.mp4";
        let cmd = FfmpegCommand::new(hostile).input("uploads/in put.mp3");
        let args = cmd.build_args();

        assert!(args.contains(&hostile.to_string()));
        assert!(args.contains(&"uploads/in put.mp3".to_string()));
        // Nothing got split or re-quoted.
        assert!(!args.iter().any(|a| a.contains('\'') || a.contains('"')));
    }

    #[test]
    fn test_build_consumes_into_invocation() {
        let inv = FfmpegCommand::new("out.mp4")
            .input("in.mp4")
            .codec_copy()
            .build(Duration::from_secs(180));

        assert_eq!(inv.program, "ffmpeg");
        assert_eq!(inv.output, PathBuf::from("out.mp4"));
        assert_eq!(inv.timeout, Duration::from_secs(180));
        assert!(inv.args.windows(2).any(|w| w == ["-c", "copy"]));
    }

    #[tokio::test]
    async fn test_run_success_with_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.bin");
        let script = format!("echo data > {}", output.display());

        FfmpegRunner::new().run(sh(&script, &output, 10)).await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_captures_stderr() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.bin");

        let err = FfmpegRunner::new()
            .run(sh("echo boom >&2; exit 3", &output, 10))
            .await
            .unwrap_err();

        match err {
            MediaError::FfmpegFailed {
                stderr, exit_code, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.unwrap().contains("boom"));
            }
            other => panic!("expected FfmpegFailed, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.bin");

        let start = Instant::now();
        let err = FfmpegRunner::new()
            .run(sh("sleep 30", &output, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Timeout(1)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_success_without_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("never-written.bin");

        let err = FfmpegRunner::new()
            .run(sh("exit 0", &output, 10))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::OutputMissing(_)));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = FfmpegRunner::new()
            .run(FfmpegInvocation {
                program: "ltake-no-such-binary".to_string(),
                args: vec![],
                output: PathBuf::from("out.bin"),
                timeout: Duration::from_secs(1),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FfmpegNotFound));
    }
}
