//! Google Drive upload client.
//!
//! This crate provides:
//! - Service account authentication via gcp_auth with cached tokens
//! - Resumable uploads that stream the file body from disk
//! - An injectable token source so tests never need real credentials

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{
    materialize_service_account, ServiceAccountTokenSource, StaticTokenSource, TokenSource,
    DRIVE_SCOPE,
};
pub use client::{DriveClient, DriveConfig};
pub use error::{DriveError, DriveResult};
