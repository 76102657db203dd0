//! External tool discovery.
//!
//! The [`ToolRegistry`] locates the encoder (ffmpeg) and prober (ffprobe)
//! once at startup. Lookup order per tool: environment override, configured
//! path, a binary bundled next to the running executable, then `PATH`.
//! Tools that are not found are left out; callers get an error from
//! [`ToolRegistry::require`] when they need one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::ToolsConfig;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

const KNOWN_TOOLS: &[&str] = &[FFMPEG, FFPROBE];

/// How a tool path was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    Environment,
    Config,
    Bundled,
    SystemPath,
}

/// A resolved tool.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub source: Option<ToolSource>,
}

fn env_var_for(name: &str) -> String {
    format!("REELHOUSE_{}", name.to_uppercase())
}

fn bundled_candidates(name: &str) -> Vec<PathBuf> {
    let file_name = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };

    let Ok(exe) = std::env::current_exe() else {
        return Vec::new();
    };
    let Some(dir) = exe.parent() else {
        return Vec::new();
    };
    vec![dir.join(&file_name), dir.join("bin").join(&file_name)]
}

fn resolve(name: &str, configured: Option<&Path>) -> Option<Tool> {
    let found = |path: PathBuf, source: ToolSource| Tool {
        name: name.to_string(),
        path,
        source,
    };

    if let Ok(value) = std::env::var(env_var_for(name)) {
        let path = PathBuf::from(value);
        if path.is_file() {
            return Some(found(path, ToolSource::Environment));
        }
        debug!(tool = name, path = ?path, "Environment override does not exist, ignoring");
    }

    if let Some(path) = configured {
        if path.exists() {
            return Some(found(path.to_path_buf(), ToolSource::Config));
        }
        debug!(tool = name, path = ?path, "Configured path does not exist, ignoring");
    }

    if let Some(path) = bundled_candidates(name).into_iter().find(|p| p.is_file()) {
        return Some(found(path, ToolSource::Bundled));
    }

    which::which(name)
        .ok()
        .map(|path| found(path, ToolSource::SystemPath))
}

/// Registry of discovered tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Discover the encoder and prober.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let configured = match name {
                FFMPEG => config.ffmpeg_path.as_deref(),
                FFPROBE => config.ffprobe_path.as_deref(),
                _ => None,
            };
            if let Some(tool) = resolve(name, configured) {
                debug!(tool = name, path = ?tool.path, source = ?tool.source, "Tool found");
                tools.insert(name.to_string(), tool);
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths, skipping discovery.
    pub fn with_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, PathBuf)>,
    {
        let tools = paths
            .into_iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    Tool {
                        name: name.to_string(),
                        path,
                        source: ToolSource::Config,
                    },
                )
            })
            .collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(tool) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(&tool.path),
                    path: Some(tool.path.clone()),
                    source: Some(tool.source),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                    source: None,
                },
            })
            .collect()
    }
}

fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
