//! HTTP handlers.

pub mod concat;
pub mod health;
pub mod render;

use serde::Serialize;

use ltake_models::UploadedArtifact;

/// Success body for job endpoints.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub message: String,
    #[serde(rename = "driveLink")]
    pub drive_link: String,
}

impl JobResponse {
    pub fn new(message: impl Into<String>, artifact: UploadedArtifact) -> Self {
        Self {
            message: message.into(),
            drive_link: artifact.web_view_link,
        }
    }
}
