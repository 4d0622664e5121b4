//! External downloader invocation.
//!
//! Downloads are delegated to [BBDown](https://github.com/nilaoda/BBDown),
//! one process per identity key, sequentially. A failed invocation is
//! reported per key and never aborts the remaining batch; that policy
//! lives in the callers (`update`/`verify` flows).

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;

/// Default downloader executable name, resolved via `PATH`.
pub const DEFAULT_PROGRAM: &str = "bbdown";

/// Failure invoking the external downloader.
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// The executable is not installed / not on `PATH`.
    #[error("{program} not found on PATH")]
    Missing { program: String },

    /// The process ran but exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The process could not be spawned for another reason.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// One-video download seam, implemented by [`BbdownRunner`] and by
/// recording fakes in tests.
pub trait Downloader {
    /// Download one video into `work_dir`. In dry-run mode the command is
    /// printed instead of executed.
    fn download(
        &self,
        key: &str,
        work_dir: &Path,
        dry_run: bool,
    ) -> std::result::Result<(), DownloaderError>;
}

/// Spawns `bbdown <key> --work-dir <dir>` per download.
#[derive(Debug, Clone)]
pub struct BbdownRunner {
    program: String,
    extra_args: Vec<String>,
}

impl BbdownRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Use a different executable (tests, alternative installs).
    #[must_use]
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            extra_args: Vec::new(),
        }
    }

    /// Append extra arguments to every invocation.
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// The full command line for one key, for dry-run display.
    #[must_use]
    pub fn command_line(&self, key: &str, work_dir: &Path) -> Vec<String> {
        let mut parts = vec![
            self.program.clone(),
            key.to_string(),
            "--work-dir".to_string(),
            work_dir.display().to_string(),
        ];
        parts.extend(self.extra_args.iter().cloned());
        parts
    }
}

impl Default for BbdownRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for BbdownRunner {
    fn download(
        &self,
        key: &str,
        work_dir: &Path,
        dry_run: bool,
    ) -> std::result::Result<(), DownloaderError> {
        if dry_run {
            println!("[dry-run] {}", self.command_line(key, work_dir).join(" "));
            return Ok(());
        }

        tracing::info!(key, program = %self.program, "invoking downloader");
        let status = Command::new(&self.program)
            .arg(key)
            .arg("--work-dir")
            .arg(work_dir)
            .args(&self.extra_args)
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(DownloaderError::Failed {
                program: self.program.clone(),
                status,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(DownloaderError::Missing {
                program: self.program.clone(),
            }),
            Err(e) => Err(DownloaderError::Io {
                program: self.program.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_line_shape() {
        let runner = BbdownRunner::new().with_extra_args(vec!["--use-app-api".to_string()]);
        let line = runner.command_line("BV123", &PathBuf::from("/videos"));
        assert_eq!(line, ["bbdown", "BV123", "--work-dir", "/videos", "--use-app-api"]);
    }

    #[test]
    fn test_dry_run_never_spawns() {
        let runner = BbdownRunner::with_program("definitely-not-installed-anywhere");
        let result = runner.download("BV123", &PathBuf::from("/tmp"), true);
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_executable_is_reported() {
        let runner = BbdownRunner::with_program("definitely-not-installed-anywhere");
        let result = runner.download("BV123", &PathBuf::from("/tmp"), false);
        assert!(matches!(result, Err(DownloaderError::Missing { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_reported() {
        let runner = BbdownRunner::with_program("false");
        let result = runner.download("BV123", &PathBuf::from("/tmp"), false);
        assert!(matches!(result, Err(DownloaderError::Failed { .. })));
    }
}
