//! Media duration lookup via ffprobe, cached per file for the process lifetime.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use dashmap::DashMap;
use tokio::process::Command;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct DurationProber {
    ffprobe: Option<PathBuf>,
    cache: DashMap<PathBuf, f64>,
}

impl DurationProber {
    /// A prober that runs `ffprobe` at the given path, or never probes when
    /// no prober is available.
    pub fn new(ffprobe: Option<PathBuf>) -> Self {
        Self {
            ffprobe,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self, path: &Path) -> Option<f64> {
        self.cache.get(path).map(|d| *d)
    }

    /// Duration of `path` in seconds. Failures are not cached.
    pub async fn duration(&self, path: &Path) -> Option<f64> {
        if let Some(seconds) = self.cached(path) {
            return Some(seconds);
        }

        let ffprobe = self.ffprobe.as_ref()?;
        let seconds = run_ffprobe(ffprobe, path).await?;
        self.cache.insert(path.to_path_buf(), seconds);
        Some(seconds)
    }
}

async fn run_ffprobe(ffprobe: &Path, path: &Path) -> Option<f64> {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ])
    .arg(path)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .kill_on_drop(true);

    let output = match tokio::time::timeout(PROBE_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(path = ?path, "ffprobe failed to run: {}", e);
            return None;
        }
        Err(_) => {
            debug!(path = ?path, "ffprobe timed out");
            return None;
        }
    };

    if !output.status.success() {
        debug!(path = ?path, status = %output.status, "ffprobe exited unsuccessfully");
        return None;
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

/// First positive number printed by ffprobe.
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5417.312000\n"), Some(5417.312));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[tokio::test]
    async fn test_without_ffprobe() {
        let prober = DurationProber::new(None);
        assert_eq!(prober.duration(Path::new("/nonexistent.mkv")).await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_caches_result() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        let counter = dir.path().join("calls");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho x >> {}\necho 12.5\n", counter.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = DurationProber::new(Some(script));
        let media = Path::new("/media/a.mkv");
        assert_eq!(prober.duration(media).await, Some(12.5));
        assert_eq!(prober.duration(media).await, Some(12.5));

        let calls = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }
}
