//! Command implementations.

pub mod completions;
pub mod export;
pub mod folder;
pub mod update;
pub mod verify;
pub mod version;

use std::time::Duration;

use crate::api::{BiliClient, ClientOptions};
use crate::error::{Error, Result};

/// Build the API client for a folder's cookie/timeout settings.
pub(crate) fn client_for(cookie: Option<&str>, timeout_secs: u64) -> Result<BiliClient> {
    BiliClient::new(&ClientOptions {
        cookie: cookie.map(str::to_string),
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// Create the runtime that drives the async API client.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("failed to create async runtime: {e}")))
}
