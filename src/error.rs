//! Error types for the bfav CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=config, 3=not_found, 4=parse, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;
use crate::downloader::DownloaderError;

/// Result type alias for bfav operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Config (exit 2)
    ConfigError,

    // Not Found (exit 3)
    FolderNotFound,

    // Parse (exit 4)
    InvalidFolderUrl,

    // Encoding (exit 5)
    InvalidEncoding,

    // Network (exit 6)
    MetadataFetchFailed,
    ListingFetchFailed,

    // Downloader (exit 7)
    DownloaderError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::FolderNotFound => "FOLDER_NOT_FOUND",
            Self::InvalidFolderUrl => "INVALID_FOLDER_URL",
            Self::InvalidEncoding => "INVALID_ENCODING",
            Self::MetadataFetchFailed => "METADATA_FETCH_FAILED",
            Self::ListingFetchFailed => "LISTING_FETCH_FAILED",
            Self::DownloaderError => "DOWNLOADER_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ConfigError => 2,
            Self::FolderNotFound => 3,
            Self::InvalidFolderUrl => 4,
            Self::InvalidEncoding => 5,
            Self::MetadataFetchFailed | Self::ListingFetchFailed => 6,
            Self::DownloaderError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in bfav operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to fetch folder info: {0}")]
    MetadataFetch(#[source] ApiError),

    #[error("failed to fetch folder listing: {0}")]
    ListingFetch(#[source] ApiError),

    #[error("cannot resolve a folder id from '{url}': {reason}")]
    InvalidFolderUrl { url: String, reason: String },

    #[error("unsupported text encoding: {label}")]
    EncodingUnsupported { label: String },

    #[error("cannot decode {path} as {encoding}")]
    LedgerDecode { path: PathBuf, encoding: String },

    #[error("cannot represent ledger rows in {encoding} (writing {path})")]
    LedgerEncode { path: PathBuf, encoding: String },

    #[error("downloader failed: {0}")]
    Downloader(#[from] DownloaderError),

    #[error("no folder at index {index} ({count} registered)")]
    FolderNotFound { index: usize, count: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MetadataFetch(_) => ErrorCode::MetadataFetchFailed,
            Self::ListingFetch(_) => ErrorCode::ListingFetchFailed,
            Self::InvalidFolderUrl { .. } => ErrorCode::InvalidFolderUrl,
            Self::EncodingUnsupported { .. }
            | Self::LedgerDecode { .. }
            | Self::LedgerEncode { .. } => ErrorCode::InvalidEncoding,
            Self::Downloader(_) => ErrorCode::DownloaderError,
            Self::FolderNotFound { .. } => ErrorCode::FolderNotFound,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidFolderUrl { .. } => Some(
                "Expected a favlist URL with a `fid` or `media_id` query \
                 parameter, or a bare numeric folder id."
                    .to_string(),
            ),

            Self::EncodingUnsupported { label } => Some(format!(
                "'{label}' is not a known encoding label. Common values: utf-8, gbk."
            )),

            Self::LedgerDecode { encoding, .. } => Some(format!(
                "The ledger is not valid {encoding}. Re-run with the encoding \
                 it was written with (--encoding or `bfav folder edit`)."
            )),

            Self::FolderNotFound { count, .. } => {
                if *count == 0 {
                    Some("No folders registered yet. Add one: bfav folder add <url>".to_string())
                } else {
                    Some(format!(
                        "Valid indices are 1..={count}. Use `bfav folder list` to see them."
                    ))
                }
            }

            Self::Downloader(DownloaderError::Missing { .. }) => Some(
                "Install BBDown (https://github.com/nilaoda/BBDown) or pass --dry-run."
                    .to_string(),
            ),

            Self::MetadataFetch(ApiError::Status { code, .. })
            | Self::ListingFetch(ApiError::Status { code, .. })
                if *code == -101 =>
            {
                Some("The API reports you are not logged in; set a cookie on the folder.".to_string())
            }

            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, exit code, and optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        let err = Error::FolderNotFound { index: 3, count: 1 };
        assert_eq!(err.exit_code(), 3);

        let err = Error::EncodingUnsupported {
            label: "utf-9".to_string(),
        };
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.error_code().as_str(), "INVALID_ENCODING");

        let err = Error::LedgerDecode {
            path: PathBuf::from("/tmp/x.csv"),
            encoding: "gbk".to_string(),
        };
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::FolderNotFound { index: 2, count: 0 };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "FOLDER_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert!(
            json["error"]["hint"]
                .as_str()
                .unwrap()
                .contains("bfav folder add")
        );
    }

    #[test]
    fn test_invalid_url_hint() {
        let err = Error::InvalidFolderUrl {
            url: "https://example.com".to_string(),
            reason: "no fid or media_id in query".to_string(),
        };
        assert_eq!(err.exit_code(), 4);
        assert!(err.hint().unwrap().contains("media_id"));
    }
}
