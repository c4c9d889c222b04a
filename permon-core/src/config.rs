//! Persistent configuration
//!
//! Stored as JSON in the platform config directory, or wherever
//! `PERMON_CONFIG` points. Missing keys fall back to their defaults.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::Layout;
use crate::process::MemoryKind;
use crate::sampler::SamplerConfig;
use crate::stats::Settings;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PERMON_CONFIG";

/// Stats shown when neither the command line nor the config name any
pub const DEFAULT_STATS: [&str; 4] = [
    "core.cpu_usage",
    "core.ram_usage",
    "core.read_speed",
    "core.write_speed",
];

/// A stat to display: either a bare tag or a tag with setting overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatSpec {
    Tag(String),
    WithSettings {
        tag: String,
        #[serde(default)]
        settings: Settings,
    },
}

impl StatSpec {
    pub fn tag(&self) -> &str {
        match self {
            StatSpec::Tag(tag) => tag,
            StatSpec::WithSettings { tag, .. } => tag,
        }
    }

    /// Setting overrides; empty for a bare tag
    pub fn settings(&self) -> Settings {
        match self {
            StatSpec::Tag(_) => Settings::new(),
            StatSpec::WithSettings { settings, .. } => settings.clone(),
        }
    }
}

impl From<&str> for StatSpec {
    fn from(tag: &str) -> Self {
        StatSpec::Tag(tag.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermonConfig {
    pub stats: Vec<StatSpec>,
    /// Display refresh rate of the terminal frontend
    pub fps: u32,
    pub axis_width: usize,
    pub right_axis_width: usize,
    pub sampler_interval_ms: u64,
    /// Contributors shown per breakdown, "other" included
    pub contributors: usize,
    /// Memory figure attributed to each process
    pub memory: MemoryKind,
}

impl Default for PermonConfig {
    fn default() -> Self {
        Self {
            stats: DEFAULT_STATS.iter().map(|&tag| StatSpec::from(tag)).collect(),
            fps: 10,
            axis_width: 10,
            right_axis_width: 20,
            sampler_interval_ms: 1000,
            contributors: crate::apportion::DEFAULT_TOP_N,
            memory: MemoryKind::Resident,
        }
    }
}

impl PermonConfig {
    pub fn layout(&self) -> Layout {
        Layout {
            axis_width: self.axis_width,
            right_axis_width: self.right_axis_width,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.sampler_interval_ms.max(1)),
            memory_kind: self.memory,
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Save to `path` atomically (write a `.tmp` sibling, then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("tmp");
        let data = self.to_json()?;
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;

        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(path);
            if let Err(rename_err) = std::fs::rename(&tmp_path, path) {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(anyhow::anyhow!(
                    "rename failed: {} (original error: {})",
                    rename_err,
                    e
                ));
            }
        }
        Ok(())
    }

    /// Overwrite `path` with the defaults and return them.
    pub fn reset(path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Pretty-printed JSON, as written by [`PermonConfig::save`]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config")
    }

    /// Tags of the configured stats, in display order
    pub fn tags(&self) -> Vec<&str> {
        self.stats.iter().map(StatSpec::tag).collect()
    }
}

/// `PERMON_CONFIG` if set, otherwise `config.json` in the platform config
/// directory. `None` when no home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("", "", "permon").map(|dirs| dirs.config_dir().join("config.json"))
}
