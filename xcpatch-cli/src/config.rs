//! Configuration file loading for xcpatch.
//!
//! Discovers and loads `xcpatch.toml` from the project root. Merges config
//! file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "xcpatch.toml";

/// Top-level configuration from xcpatch.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct XcpatchConfig {
    /// Hook invocation defaults.
    pub hook: HookConfig,

    /// Artifact output settings.
    pub artifacts: ArtifactsConfig,
}

/// Hook section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Plugin identifier, e.g. "com.example.pay".
    pub plugin_id: Option<String>,

    /// Major version of the invoking Cordova tooling.
    pub tooling_major: Option<u32>,
}

/// Artifacts section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Output directory for report artifacts.
    pub out_dir: Option<Utf8PathBuf>,
}

/// Discover the xcpatch.toml config file in the project root.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an xcpatch.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<XcpatchConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<XcpatchConfig> {
    let config: XcpatchConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<XcpatchConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(XcpatchConfig::default()),
    }
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub plugin_id: String,
    pub tooling_major: u32,
    pub out_dir: Option<Utf8PathBuf>,
}

pub struct ConfigMerger {
    file: XcpatchConfig,
}

impl ConfigMerger {
    pub fn new(file: XcpatchConfig) -> Self {
        Self { file }
    }

    /// CLI arguments win over config file values. `plugin_id` must come from
    /// one of the two.
    pub fn merge(
        self,
        plugin_id: Option<String>,
        tooling_major: Option<u32>,
        out_dir: Option<Utf8PathBuf>,
    ) -> anyhow::Result<MergedConfig> {
        let plugin_id = plugin_id
            .or(self.file.hook.plugin_id)
            .context("no plugin id: pass --plugin-id or set [hook].plugin_id in xcpatch.toml")?;
        let tooling_major = tooling_major.or(self.file.hook.tooling_major).unwrap_or(6);
        let out_dir = out_dir.or(self.file.artifacts.out_dir);
        Ok(MergedConfig {
            plugin_id,
            tooling_major,
            out_dir,
        })
    }
}
