//! Version command implementation.

use std::process::Command;

use crate::downloader::DEFAULT_PROGRAM;
use crate::error::Result;

/// Whether the external downloader is reachable on `PATH`.
fn downloader_status() -> &'static str {
    match Command::new(DEFAULT_PROGRAM).arg("--version").output() {
        Ok(output) if output.status.success() => "found",
        _ => "not found",
    }
}

/// Execute the version command.
///
/// Besides the package version this reports whether BBDown is installed,
/// since every download path depends on it.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };
    let downloader = downloader_status();

    if json {
        let output = serde_json::json!({
            "version": version,
            "build": build,
            "downloader": downloader,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("bfav version {version} ({build})");
    println!("{DEFAULT_PROGRAM}: {downloader}");
    Ok(())
}
