//! Render endpoint: image + audio multipart in, shareable link out.

use std::path::PathBuf;

use axum::extract::multipart::{Field, Multipart};
use axum::extract::State;
use axum::Json;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::handlers::JobResponse;
use crate::pipeline;
use crate::state::AppState;
use crate::validate::{self, RenderParts};

/// `POST /render` — render a video from a still image and an audio track,
/// upload it, and return the shareable link.
pub async fn render(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<JobResponse>> {
    let parts = receive_parts(&state, &mut multipart).await?;
    let job = validate::validate_render(parts, &state.config.renders_dir)?;
    let artifact = pipeline::run_render_job(&state, job).await?;

    Ok(Json(JobResponse::new("Rendered and uploaded", artifact)))
}

/// Stream the request's file parts into the scratch directory.
///
/// Parts are saved as they arrive; presence checks are the validator's job.
async fn receive_parts(state: &AppState, multipart: &mut Multipart) -> ApiResult<RenderParts> {
    let mut parts = RenderParts::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => parts.image = Some(save_part(state, &mut field).await?),
            Some("audio") => parts.audio = Some(save_part(state, &mut field).await?),
            Some("filename") => {
                parts.filename = Some(field.text().await.map_err(|e| {
                    ApiError::validation(format!("Malformed filename field: {}", e))
                })?)
            }
            _ => drain_field(&mut field).await?,
        }
    }

    Ok(parts)
}

/// Stream one file part to a uniquely-named scratch file.
async fn save_part(state: &AppState, field: &mut Field<'_>) -> ApiResult<PathBuf> {
    fs::create_dir_all(&state.config.uploads_dir)
        .await
        .map_err(|e| ApiError::internal(format!("failed to create scratch dir: {}", e)))?;

    let path = state.config.uploads_dir.join(Uuid::new_v4().to_string());
    let mut file = fs::File::create(&path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to create scratch file: {}", e)))?;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("failed to write scratch file: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("failed to flush scratch file: {}", e)))?;

    Ok(path)
}

/// Consume an unrecognized field without keeping it.
async fn drain_field(field: &mut Field<'_>) -> ApiResult<()> {
    while field
        .chunk()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
        .is_some()
    {}
    Ok(())
}
