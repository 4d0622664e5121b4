//! Favorites-folder API access.
//!
//! [`FavSource`] is the seam between the sync engine and the remote API;
//! [`BiliClient`] is the production implementation over reqwest. The client
//! is deliberately thin: no retries, no caching. A transport or API-status
//! failure aborts the current operation and surfaces to the caller.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::error::{Error, Result};
use crate::model::{FolderInfo, RawMediaItem};

const INFO_ENDPOINT: &str = "https://api.bilibili.com/x/v3/fav/folder/info";
const LIST_ENDPOINT: &str = "https://api.bilibili.com/x/v3/fav/resource/list";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0 Safari/537.36";
const REFERER: &str = "https://www.bilibili.com/";

/// Failure reaching or talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network/transport failure, HTTP error status, or undecodable body.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API responded but signaled a business-level failure code.
    #[error("api error at {endpoint}: code={code}, message={message}")]
    Status {
        endpoint: String,
        code: i64,
        message: String,
    },
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct MediaPage {
    /// Raw items, listing order preserved.
    pub items: Vec<RawMediaItem>,
    /// Whether further pages exist.
    pub has_more: bool,
}

/// Paged access to a remote favorites folder.
///
/// Implemented by [`BiliClient`] and by in-memory fakes in tests.
pub trait FavSource {
    /// Fetch folder metadata.
    fn folder_info(
        &self,
        media_id: u64,
    ) -> impl std::future::Future<Output = std::result::Result<FolderInfo, ApiError>> + Send;

    /// Fetch one listing page (pages are numbered from 1).
    fn list_page(
        &self,
        media_id: u64,
        page: u32,
        page_size: u32,
    ) -> impl std::future::Future<Output = std::result::Result<MediaPage, ApiError>> + Send;
}

/// Options for building a [`BiliClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Cookie header value (needed for private folders).
    pub cookie: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            cookie: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Production [`FavSource`] over the public favorites API.
pub struct BiliClient {
    client: reqwest::Client,
}

impl BiliClient {
    /// Build a client with browser-like default headers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the cookie value is not a valid
    /// header value, or when the underlying client cannot be constructed.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER as REFERER_KEY, USER_AGENT as UA_KEY};

        let mut headers = HeaderMap::new();
        headers.insert(UA_KEY, HeaderValue::from_static(USER_AGENT));
        headers.insert(REFERER_KEY, HeaderValue::from_static(REFERER));
        if let Some(cookie) = &options.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| Error::Config(format!("invalid cookie value: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Other(format!("failed to build http client: {e}")))?;

        Ok(Self { client })
    }

    async fn get_data<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<T, ApiError> {
        let transport = |source: reqwest::Error| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        let envelope: ApiEnvelope<T> = response.json().await.map_err(transport)?;

        if envelope.code != 0 {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope.data.ok_or_else(|| ApiError::Status {
            endpoint: endpoint.to_string(),
            code: envelope.code,
            message: "response carried no data".to_string(),
        })
    }
}

impl FavSource for BiliClient {
    fn folder_info(
        &self,
        media_id: u64,
    ) -> impl std::future::Future<Output = std::result::Result<FolderInfo, ApiError>> + Send {
        async move {
            let data: FolderInfoData = self
                .get_data(INFO_ENDPOINT, &[("media_id", media_id.to_string())])
                .await?;
            Ok(FolderInfo {
                media_id: data.id.unwrap_or(media_id),
                fid: data.fid,
                mid: data.mid,
                title: data.title,
                media_count: data.media_count,
            })
        }
    }

    fn list_page(
        &self,
        media_id: u64,
        page: u32,
        page_size: u32,
    ) -> impl std::future::Future<Output = std::result::Result<MediaPage, ApiError>> + Send {
        async move {
            let data: ResourceListData = self
                .get_data(
                    LIST_ENDPOINT,
                    &[
                        ("media_id", media_id.to_string()),
                        ("pn", page.to_string()),
                        ("ps", page_size.to_string()),
                        ("platform", "web".to_string()),
                    ],
                )
                .await?;
            Ok(MediaPage {
                items: data.medias.unwrap_or_default(),
                has_more: data.has_more,
            })
        }
    }
}

/// Standard response envelope: `code` 0 means success, anything else is a
/// business-level failure with a human-readable `message`.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FolderInfoData {
    id: Option<u64>,
    #[serde(default)]
    fid: u64,
    #[serde(default)]
    mid: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    media_count: u64,
}

#[derive(Debug, Deserialize)]
struct ResourceListData {
    #[serde(default)]
    medias: Option<Vec<RawMediaItem>>,
    #[serde(default)]
    has_more: bool,
}

/// Resolve a favlist reference to its numeric folder id.
///
/// Accepts a folder URL whose query carries `fid` or `media_id` (`fid` wins
/// when both are present), or a bare numeric id. No network call is made.
///
/// # Errors
///
/// Returns [`Error::InvalidFolderUrl`] when no numeric id can be resolved.
pub fn parse_folder_url(input: &str) -> Result<u64> {
    let invalid = |reason: String| Error::InvalidFolderUrl {
        url: input.to_string(),
        reason,
    };

    let trimmed = input.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed
            .parse()
            .map_err(|_| invalid(format!("'{trimmed}' is out of range for a folder id")));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == "fid")
        .or_else(|| url.query_pairs().find(|(k, _)| k == "media_id"))
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| invalid("no fid or media_id query parameter".to_string()))?;

    let value = value.trim();
    value
        .parse()
        .map_err(|_| invalid(format!("'{value}' is not a numeric folder id")))
}
