use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use reelhouse_common::LibraryKind;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Media roots. Relative paths resolve against the working directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub movies_dir: Option<PathBuf>,

    #[serde(default)]
    pub tv_dir: Option<PathBuf>,

    #[serde(default)]
    pub music_dir: Option<PathBuf>,
}

impl LibraryConfig {
    /// Configured root for a library kind, if any.
    pub fn root(&self, kind: LibraryKind) -> Option<&Path> {
        match kind {
            LibraryKind::Movies => self.movies_dir.as_deref(),
            LibraryKind::Tv => self.tv_dir.as_deref(),
            LibraryKind::Music => self.music_dir.as_deref(),
        }
    }

    /// Configured root made absolute against the working directory.
    pub fn resolved_root(&self, kind: LibraryKind) -> Option<PathBuf> {
        let root = self.root(kind)?;
        if root.is_absolute() {
            return Some(root.to_path_buf());
        }
        match std::env::current_dir() {
            Ok(cwd) => Some(cwd.join(root)),
            Err(_) => Some(root.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Stop walking after this many directories
    #[serde(default = "default_max_dirs")]
    pub max_dirs: usize,

    /// Stop walking after collecting this many files
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Minimum seconds between two walks of the same scope
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_max_dirs() -> usize {
    10_000
}
fn default_max_files() -> usize {
    10_000
}
fn default_cooldown_secs() -> u64 {
    15
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_dirs: default_max_dirs(),
            max_files: default_max_files(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Progress store location (default: `<data dir>/playback-progress.json`)
    #[serde(default)]
    pub progress_file: Option<PathBuf>,

    #[serde(default = "default_max_progress_entries")]
    pub max_progress_entries: usize,

    /// Progress within this many seconds of the end counts as finished
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold_secs: f64,

    /// Command used to open a file in the host's default player
    #[serde(default)]
    pub external_opener: Option<String>,
}

fn default_max_progress_entries() -> usize {
    800
}
fn default_completion_threshold() -> f64 {
    3.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_file: None,
            max_progress_entries: default_max_progress_entries(),
            completion_threshold_secs: default_completion_threshold(),
            external_opener: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Seconds to wait for the encoder's first output chunk
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Encoder processes allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_video_preset")]
    pub video_preset: String,

    #[serde(default = "default_video_crf")]
    pub video_crf: u32,

    /// Bytes of encoder stderr kept for diagnostics
    #[serde(default = "default_stderr_capture")]
    pub stderr_capture_bytes: usize,
}

fn default_startup_timeout() -> u64 {
    15
}
fn default_max_concurrent() -> usize {
    2
}
fn default_audio_bitrate() -> String {
    "192k".to_string()
}
fn default_video_preset() -> String {
    "veryfast".to_string()
}
fn default_video_crf() -> u32 {
    23
}
fn default_stderr_capture() -> usize {
    16 * 1024
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: default_startup_timeout(),
            max_concurrent: default_max_concurrent(),
            audio_bitrate: default_audio_bitrate(),
            video_preset: default_video_preset(),
            video_crf: default_video_crf(),
            stderr_capture_bytes: default_stderr_capture(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}
