//! Configuration file support.
//!
//! Two locations are read and merged:
//! - Global: `<config dir>/webrtc-natives/config.toml` - user-wide defaults
//! - Project: `natives.toml` in the project root - project settings
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_NAME: &str = "natives.toml";

/// webrtc-natives configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Package identity settings
    pub project: ProjectConfig,

    /// Native build settings
    pub build: BuildConfig,

    /// Per-platform toolchain overrides, keyed by platform tag
    pub toolchains: BTreeMap<String, ToolchainOverride>,
}

/// Identity of the produced library and its packages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Library base name (`webrtc-java`)
    pub library: Option<String>,

    /// Release version recorded in manifests and package names
    pub version: Option<String>,

    /// Human-readable title
    pub title: Option<String>,

    /// Vendor string
    pub vendor: Option<String>,

    /// Base of the automatic module name
    pub module: Option<String>,
}

/// Native build settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// CMake source directory
    pub source_dir: Option<PathBuf>,

    /// Root of the per-platform build directories
    pub build_root: Option<PathBuf>,

    /// Where packaged units are written
    pub output_dir: Option<PathBuf>,

    /// Directory containing toolchain files
    pub toolchain_dir: Option<PathBuf>,

    /// WebRTC branch passed to CMake
    pub revision: Option<String>,

    /// Prebuilt WebRTC install directory
    pub webrtc_install_dir: Option<PathBuf>,

    /// Run the install target instead of building in place
    pub install: Option<bool>,

    /// Parallel build jobs (None = logical CPU count)
    pub jobs: Option<usize>,

    /// Path to the cmake executable
    pub cmake: Option<PathBuf>,

    /// What to do when a toolchain file is missing
    pub missing_toolchain: Option<MissingToolchainPolicy>,

    /// Extra arguments appended to the configure call
    #[serde(default)]
    pub cmake_args: Vec<String>,
}

/// Handling of a toolchain file that does not exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingToolchainPolicy {
    /// Warn and configure without `CMAKE_TOOLCHAIN_FILE` (host-native build)
    #[default]
    Warn,
    /// Fail the configure stage
    Error,
}

impl std::str::FromStr for MissingToolchainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(MissingToolchainPolicy::Warn),
            "error" => Ok(MissingToolchainPolicy::Error),
            _ => Err(format!(
                "invalid missing toolchain policy '{}'; expected 'warn' or 'error'",
                s
            )),
        }
    }
}

/// A `[toolchains.<tag>]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainOverride {
    /// Toolchain file (relative to the toolchain directory unless absolute)
    pub file: Option<PathBuf>,

    /// CMake generator
    pub generator: Option<String>,

    /// CMake generator platform (`-A`)
    pub architecture: Option<String>,

    /// Architecture-translation command prefix
    pub wrapper: Option<Vec<String>>,

    /// Set to false to drop the platform from the catalog
    pub enabled: bool,
}

impl Default for ToolchainOverride {
    fn default() -> Self {
        ToolchainOverride {
            file: None,
            generator: None,
            architecture: None,
            wrapper: None,
            enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let p = other.project;
        merge_opt(&mut self.project.library, p.library);
        merge_opt(&mut self.project.version, p.version);
        merge_opt(&mut self.project.title, p.title);
        merge_opt(&mut self.project.vendor, p.vendor);
        merge_opt(&mut self.project.module, p.module);

        let b = other.build;
        merge_opt(&mut self.build.source_dir, b.source_dir);
        merge_opt(&mut self.build.build_root, b.build_root);
        merge_opt(&mut self.build.output_dir, b.output_dir);
        merge_opt(&mut self.build.toolchain_dir, b.toolchain_dir);
        merge_opt(&mut self.build.revision, b.revision);
        merge_opt(&mut self.build.webrtc_install_dir, b.webrtc_install_dir);
        merge_opt(&mut self.build.install, b.install);
        merge_opt(&mut self.build.jobs, b.jobs);
        merge_opt(&mut self.build.cmake, b.cmake);
        merge_opt(&mut self.build.missing_toolchain, b.missing_toolchain);
        if !b.cmake_args.is_empty() {
            self.build.cmake_args = b.cmake_args;
        }

        // Whole tables replace; a project entry fully describes its override.
        self.toolchains.extend(other.toolchains);
    }
}

fn merge_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (natives.toml)
/// 2. Global config
/// 3. Defaults
///
/// A file that exists but fails to parse is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global) = global_path.filter(|p| p.exists()) {
        tracing::debug!("loading global config from {}", global.display());
        config.merge(Config::load(global)?);
    }

    if project_path.exists() {
        tracing::debug!("loading project config from {}", project_path.display());
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "kastle", "webrtc-natives")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
