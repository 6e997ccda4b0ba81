//! Uploaded artifact returned by the storage backend.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A file created in remote storage: its identifier and shareable link.
///
/// Deserialized directly from the Drive `files` resource
/// (`fields=id,webViewLink`); returned to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UploadedArtifact {
    /// Remote file identifier
    pub id: String,

    /// Shareable link to view the file
    #[serde(rename = "webViewLink")]
    pub web_view_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_response() {
        let artifact: UploadedArtifact = serde_json::from_str(
            r#"{"id":"abc123","webViewLink":"https://drive.google.com/file/d/abc123/view"}"#,
        )
        .unwrap();

        assert_eq!(artifact.id, "abc123");
        assert!(artifact.web_view_link.contains("abc123"));
    }
}
