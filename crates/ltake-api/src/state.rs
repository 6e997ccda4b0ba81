//! Application state.

use std::sync::Arc;

use ltake_drive::DriveClient;

use crate::config::ApiConfig;

/// Shared application state.
///
/// The Drive client is constructed once at startup and handed to the
/// pipeline by reference; there is no process-global storage state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub drive: Arc<DriveClient>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let drive = DriveClient::from_env()?;

        Ok(Self {
            config,
            drive: Arc::new(drive),
        })
    }
}
