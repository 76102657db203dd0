//! Hand a file to the host's default player.

use std::path::Path;
use std::process::Stdio;

use reelhouse_common::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

fn default_opener() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["open"]
    } else if cfg!(windows) {
        &["cmd", "/C", "start", ""]
    } else {
        &["xdg-open"]
    }
}

/// Split the configured opener command, falling back to the platform default.
pub fn opener_command(configured: Option<&str>) -> Vec<String> {
    let parts: Vec<String> = configured
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    if parts.is_empty() {
        default_opener().iter().map(|s| s.to_string()).collect()
    } else {
        parts
    }
}

/// Spawn the opener on `path` without waiting for the player to exit.
///
/// Only spawning is checked; whatever the player does afterwards is not
/// reported.
pub fn open_external(path: &Path, configured: Option<&str>) -> Result<()> {
    let command = opener_command(configured);
    let Some((program, args)) = command.split_first() else {
        return Err(Error::internal("no external opener configured"));
    };

    let mut child = Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::unavailable(format!("failed to start {program}: {e}")))?;

    info!(path = ?path, opener = %program, "Opened in external player");

    // reap the opener so it does not linger as a zombie
    tokio::spawn(async move {
        if let Ok(status) = child.wait().await {
            debug!(status = %status, "External opener exited");
        }
    });

    Ok(())
}
