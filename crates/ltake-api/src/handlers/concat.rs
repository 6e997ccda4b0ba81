//! Concatenate endpoint: segment list in, shareable link out.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::handlers::JobResponse;
use crate::pipeline;
use crate::state::AppState;
use crate::validate;

/// Request body for `POST /concat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatRequest {
    /// Concat-directive text, one `file` entry per line
    pub concat_list: Option<String>,
    /// Declared output filename
    pub output: Option<String>,
}

/// `POST /concat` — concatenate existing segments losslessly, upload the
/// result, and return the shareable link.
pub async fn concat(
    State(state): State<AppState>,
    Json(body): Json<ConcatRequest>,
) -> ApiResult<Json<JobResponse>> {
    let (job, list) = validate::validate_concat(
        body.concat_list.as_deref(),
        body.output,
        &state.config.renders_dir,
    )?;
    let artifact = pipeline::run_concat_job(&state, job, list).await?;

    Ok(Json(JobResponse::new("Concatenated and uploaded", artifact)))
}
