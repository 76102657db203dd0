mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Locate the config file to use: the explicit path, else the first default
/// location that exists.
pub fn find_config_path(custom_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        return Some(path.to_path_buf());
    }

    let default_paths = [
        "./config.toml",
        "./reelhouse.toml",
        "~/.config/reelhouse/config.toml",
        "/etc/reelhouse/config.toml",
    ];

    default_paths
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    match find_config_path(custom_path) {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Directory holding the database and progress file: the config file's
/// parent, or the working directory.
pub fn data_dir(config_path: Option<&Path>) -> PathBuf {
    config_path
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.scan.max_dirs == 0 || config.scan.max_files == 0 {
        anyhow::bail!("Scan caps must be greater than 0");
    }

    if config.transcode.max_concurrent == 0 {
        anyhow::bail!("transcode.max_concurrent must be greater than 0");
    }

    if config.transcode.startup_timeout_secs == 0 {
        anyhow::bail!("transcode.startup_timeout_secs must be greater than 0");
    }

    let threshold = config.playback.completion_threshold_secs;
    if threshold.is_nan() || threshold < 0.0 {
        anyhow::bail!("playback.completion_threshold_secs must be non-negative");
    }

    for (name, dir) in [
        ("movies_dir", &config.library.movies_dir),
        ("tv_dir", &config.library.tv_dir),
        ("music_dir", &config.library.music_dir),
    ] {
        if let Some(dir) = dir {
            if !dir.is_dir() {
                tracing::warn!("Library {} does not exist: {:?}", name, dir);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scan.max_dirs, 10_000);
        assert_eq!(config.scan.cooldown_secs, 15);
        assert_eq!(config.playback.max_progress_entries, 800);
        assert_eq!(config.transcode.startup_timeout_secs, 15);
        assert!(config.library.movies_dir.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[library]
movies_dir = "/srv/movies"

[transcode]
max_concurrent = 4
"#
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.library.root(reelhouse_common::LibraryKind::Movies),
            Some(Path::new("/srv/movies"))
        );
        assert!(config.library.root(reelhouse_common::LibraryKind::Music).is_none());
        assert_eq!(config.transcode.max_concurrent, 4);
        assert_eq!(config.transcode.video_preset, "veryfast");
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.transcode.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_data_dir_from_config_path() {
        assert_eq!(
            data_dir(Some(Path::new("/etc/reelhouse/config.toml"))),
            PathBuf::from("/etc/reelhouse")
        );
        // bare file name falls back to the working directory
        assert_eq!(
            data_dir(Some(Path::new("config.toml"))),
            std::env::current_dir().unwrap()
        );
    }
}
