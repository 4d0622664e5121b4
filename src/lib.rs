//! bfav - archive bilibili favorites folders
//!
//! This crate provides the core functionality for the `bfav` CLI tool: it
//! mirrors a favorites folder into an append-only CSV ledger, deduplicating
//! against previously recorded entries, and drives the external BBDown
//! downloader for anything not yet present locally.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (`FolderInfo`, `RawMediaItem`, `VideoEntry`)
//! - [`api`] - Remote favorites API access (`FavSource`, `BiliClient`)
//! - [`ledger`] - CSV ledger codec with header-alias tolerance
//! - [`sync`] - Export engine, reconciliation diffs, update flow
//! - [`inventory`] - Local-file inventory by filename scan
//! - [`downloader`] - BBDown invocation
//! - [`config`] - Registered-folder configuration store
//! - [`error`] - Error types and handling
//!
//! # Concurrency
//!
//! Everything runs single-threaded and synchronous per ledger path. The
//! crate takes no file locks: callers must not run two syncs against the
//! same ledger concurrently.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod model;
pub mod sync;

pub use error::{Error, Result};
