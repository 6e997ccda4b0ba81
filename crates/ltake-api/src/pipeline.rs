//! Job orchestration.
//!
//! Sequences validate → build → transcode → upload → cleanup for each job,
//! advancing the job's stage as it goes. Stages are strictly sequential
//! within a job and attempted exactly once; a failure at any stage
//! short-circuits the rest and selects the cleanup coordinator's failure
//! branch.

use std::time::Instant;

use tracing::{error, info};

use ltake_media::cleanup::{self, JobFiles, JobOutcome};
use ltake_media::{concat_invocation, render_invocation, ConcatList, FfmpegInvocation, FfmpegRunner};
use ltake_models::{Job, UploadedArtifact};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// MIME type reported to the storage backend for produced videos.
const OUTPUT_MIME_TYPE: &str = "video/mp4";

/// Run a validated render job to completion.
pub async fn run_render_job(state: &AppState, job: Job) -> ApiResult<UploadedArtifact> {
    let [image, audio] = job.inputs.as_slice() else {
        return Err(ApiError::internal("render job requires image and audio inputs"));
    };

    let invocation = render_invocation(image, audio, &job.output_path);
    transcode_and_upload(state, job, invocation).await
}

/// Run a validated concatenate job to completion.
///
/// The list file is materialized under the scratch directory first; from
/// then on it is an input temp file owned by the job like any other.
pub async fn run_concat_job(
    state: &AppState,
    mut job: Job,
    list: ConcatList,
) -> ApiResult<UploadedArtifact> {
    let list_path = list.write_to(&state.config.uploads_dir).await?;
    job.inputs.push(list_path.clone());

    let invocation = concat_invocation(&list_path, &job.output_path);
    transcode_and_upload(state, job, invocation).await
}

/// Drive a job through transcode, upload and cleanup.
async fn transcode_and_upload(
    state: &AppState,
    job: Job,
    invocation: FfmpegInvocation,
) -> ApiResult<UploadedArtifact> {
    let kind = job.kind;
    let files = JobFiles {
        inputs: job.inputs.clone(),
        output: job.output_path.clone(),
        scratch_dir: state.config.uploads_dir.clone(),
    };

    // Output directory is created on demand.
    if let Some(parent) = job.output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::internal(format!("failed to create output dir: {}", e)))?;
    }

    let job = job.transcoding();
    info!(
        job_id = %job.id,
        kind = %kind,
        output = %job.output_path.display(),
        "Starting transcode"
    );

    let transcode_start = Instant::now();
    if let Err(e) = FfmpegRunner::new().run(invocation).await {
        let api_err = ApiError::from(e);
        cleanup::sweep(JobOutcome::TranscodeFailed, &files).await;
        metrics::record_job_failed(kind.as_str());
        let job = job.fail(api_err.to_string());
        error!(job_id = %job.id, kind = %kind, error = %api_err, "Transcode failed");
        return Err(api_err);
    }
    metrics::record_transcode_duration(kind.as_str(), transcode_start.elapsed().as_secs_f64());

    let job = job.transcoded().uploading();

    let upload_start = Instant::now();
    let artifact = match state
        .drive
        .create_file(&job.output_path, &job.output_name, OUTPUT_MIME_TYPE)
        .await
    {
        Ok(artifact) => artifact,
        Err(e) => {
            let api_err = ApiError::from(e);
            cleanup::sweep(JobOutcome::UploadFailed, &files).await;
            metrics::record_job_failed(kind.as_str());
            let job = job.fail(api_err.to_string());
            error!(job_id = %job.id, kind = %kind, error = %api_err, "Upload failed");
            return Err(api_err);
        }
    };
    metrics::record_upload_duration(upload_start.elapsed().as_secs_f64());

    cleanup::sweep(JobOutcome::Succeeded, &files).await;

    let job = job.complete();
    metrics::record_job_completed(kind.as_str());
    info!(
        job_id = %job.id,
        kind = %kind,
        link = %artifact.web_view_link,
        "Job completed"
    );

    Ok(artifact)
}
