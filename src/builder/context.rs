//! Build context - project identity, directory layout and build settings.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::toolchain::ToolchainCatalog;
use crate::core::host::HostInfo;
use crate::core::manifest::ProjectIdentity;
use crate::core::platform::PlatformId;
use crate::util::config::{Config, MissingToolchainPolicy};

/// Default CMake source directory, relative to the project root.
pub const DEFAULT_SOURCE_DIR: &str = "webrtc-jni/src/main/cpp";

/// Default root of the per-platform build directories.
pub const DEFAULT_BUILD_ROOT: &str = "build/natives";

/// Default directory for packaged units.
pub const DEFAULT_OUTPUT_DIR: &str = "build/libs";

/// Install prefix directory name inside a platform's build directory.
pub const INSTALL_DIR_NAME: &str = "install";

/// Default WebRTC branch.
pub const DEFAULT_REVISION: &str = "main";

/// Settings shared by every platform pipeline in one run.
#[derive(Clone)]
pub struct BuildContext {
    /// Project root; relative config paths resolve against it
    pub project_root: PathBuf,

    /// Probed host
    pub host: HostInfo,

    /// Toolchain catalog with configuration overrides applied
    pub catalog: ToolchainCatalog,

    /// Library identity for naming and manifests
    pub project: ProjectIdentity,

    /// CMake source directory
    pub source_dir: PathBuf,

    /// Root of the build directories
    pub build_root: PathBuf,

    /// Where packaged units are written
    pub output_dir: PathBuf,

    /// Directory holding toolchain files
    pub toolchain_dir: PathBuf,

    /// WebRTC branch selector
    pub revision: String,

    /// Prebuilt WebRTC install directory
    pub webrtc_install_dir: Option<PathBuf>,

    /// Build the install target instead of building in place
    pub install: bool,

    /// Parallel jobs (None = logical CPU count)
    pub jobs: Option<usize>,

    /// Explicit cmake executable
    pub cmake: Option<PathBuf>,

    /// Missing toolchain file handling
    pub missing_toolchain: MissingToolchainPolicy,

    /// Extra configure arguments
    pub cmake_args: Vec<String>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project_root", &self.project_root)
            .field("host", &self.host)
            .field("project", &self.project)
            .field("source_dir", &self.source_dir)
            .field("build_root", &self.build_root)
            .field("output_dir", &self.output_dir)
            .field("toolchain_dir", &self.toolchain_dir)
            .field("revision", &self.revision)
            .field("install", &self.install)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a build context from merged configuration.
    pub fn new(project_root: &Path, config: &Config, host: HostInfo) -> Result<Self> {
        let project = ProjectIdentity::from_config(&config.project)?;
        let catalog = ToolchainCatalog::builtin()
            .with_overrides(&config.toolchains)
            .context("invalid [toolchains] configuration")?;

        let resolve = |p: Option<&PathBuf>, default: &str| -> PathBuf {
            let p = p.cloned().unwrap_or_else(|| PathBuf::from(default));
            if p.is_absolute() {
                p
            } else {
                project_root.join(p)
            }
        };

        let source_dir = resolve(config.build.source_dir.as_ref(), DEFAULT_SOURCE_DIR);
        let toolchain_dir = match config.build.toolchain_dir {
            Some(ref dir) => resolve(Some(dir), ""),
            None => source_dir.join("toolchain"),
        };

        Ok(BuildContext {
            project_root: project_root.to_path_buf(),
            host,
            catalog,
            project,
            build_root: resolve(config.build.build_root.as_ref(), DEFAULT_BUILD_ROOT),
            output_dir: resolve(config.build.output_dir.as_ref(), DEFAULT_OUTPUT_DIR),
            toolchain_dir,
            source_dir,
            revision: config
                .build
                .revision
                .clone()
                .unwrap_or_else(|| DEFAULT_REVISION.to_string()),
            webrtc_install_dir: config
                .build
                .webrtc_install_dir
                .as_ref()
                .map(|p| resolve(Some(p), "")),
            install: config.build.install.unwrap_or(false),
            jobs: config.build.jobs,
            cmake: config.build.cmake.clone(),
            missing_toolchain: config.build.missing_toolchain.unwrap_or_default(),
            cmake_args: config.build.cmake_args.clone(),
        })
    }

    /// Build directory for one platform.
    pub fn build_dir(&self, platform: PlatformId) -> PathBuf {
        self.build_root.join(platform.tag())
    }

    /// Flattened staging directory for one platform.
    pub fn staging_dir(&self, platform: PlatformId) -> PathBuf {
        self.build_root.join("staging").join(platform.tag())
    }

    /// Install prefix used when the install target is requested.
    pub fn install_prefix(&self, platform: PlatformId) -> PathBuf {
        self.build_dir(platform).join(INSTALL_DIR_NAME)
    }

    /// Shorten a path for display relative to the project root.
    pub fn display_path(&self, path: &Path) -> String {
        crate::util::fs::relative_path(&self.project_root, path)
            .display()
            .to_string()
    }
}
