//! Toolchain catalog.
//!
//! Maps each supported platform onto the inputs CMake needs to build for it:
//! a toolchain file, an optional generator and `-A` architecture, and an
//! optional host wrapper for running x86_64 builds on ARM hosts.
//!
//! Toolchain files are opaque. Nothing here reads them or checks that they
//! exist; the invoker does that right before configuring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;

use crate::core::errors::BuildError;
use crate::core::host::HostInfo;
use crate::core::platform::{Arch, OsFamily, PlatformId};
use crate::util::config::ToolchainOverride;

/// Everything needed to configure CMake for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainDescriptor {
    /// Target platform
    pub platform: PlatformId,
    /// Toolchain file, relative to the toolchain directory unless absolute
    pub toolchain_file: PathBuf,
    /// CMake generator (`-G`)
    pub generator: Option<String>,
    /// CMake generator platform (`-A`)
    pub architecture: Option<String>,
    /// Command prefix that runs the build under architecture translation
    pub host_wrapper: Option<Vec<String>>,
}

impl ToolchainDescriptor {
    fn new(platform: PlatformId, toolchain_file: &str) -> Self {
        ToolchainDescriptor {
            platform,
            toolchain_file: PathBuf::from(toolchain_file),
            generator: None,
            architecture: None,
            host_wrapper: None,
        }
    }

    fn generator(mut self, generator: &str, architecture: &str) -> Self {
        self.generator = Some(generator.to_string());
        self.architecture = Some(architecture.to_string());
        self
    }

    fn wrapper(mut self, wrapper: &[&str]) -> Self {
        self.host_wrapper = Some(wrapper.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Absolute path of the toolchain file.
    pub fn toolchain_path(&self, toolchain_dir: &Path) -> PathBuf {
        if self.toolchain_file.is_absolute() {
            self.toolchain_file.clone()
        } else {
            toolchain_dir.join(&self.toolchain_file)
        }
    }

    /// The wrapper to prefix every CMake invocation with on this host.
    ///
    /// Applies only to an x86_64 target built on an aarch64 host of the same
    /// OS family, and only when the descriptor declares a wrapper.
    pub fn wrapper_for(&self, host: &HostInfo) -> Option<&[String]> {
        let wrapper = self.host_wrapper.as_deref().filter(|w| !w.is_empty())?;
        let host = host.platform().ok()?;

        let translated = host.arch == Arch::Aarch64
            && host.os == self.platform.os
            && self.platform.arch == Arch::X86_64;

        translated.then_some(wrapper)
    }

    fn apply(&mut self, ov: &ToolchainOverride) {
        if let Some(ref file) = ov.file {
            self.toolchain_file = file.clone();
        }
        if ov.generator.is_some() {
            self.generator = ov.generator.clone();
        }
        if ov.architecture.is_some() {
            self.architecture = ov.architecture.clone();
        }
        if ov.wrapper.is_some() {
            self.host_wrapper = ov.wrapper.clone();
        }
    }
}

/// Static table of supported platforms.
#[derive(Debug, Clone)]
pub struct ToolchainCatalog {
    entries: BTreeMap<PlatformId, ToolchainDescriptor>,
}

impl ToolchainCatalog {
    /// The built-in table.
    pub fn builtin() -> Self {
        use Arch::*;
        use OsFamily::*;

        let descriptors = [
            ToolchainDescriptor::new(PlatformId::new(Linux, X86_64), "x86_64-linux-clang.cmake"),
            ToolchainDescriptor::new(PlatformId::new(Linux, Aarch64), "aarch64-linux-clang.cmake"),
            ToolchainDescriptor::new(PlatformId::new(Linux, Arm32), "aarch32-linux-clang.cmake"),
            ToolchainDescriptor::new(
                PlatformId::new(Windows, X86_64),
                "x86_64-windows-clang.cmake",
            )
            .generator("Visual Studio 17 2022", "x64"),
            ToolchainDescriptor::new(PlatformId::new(Macos, X86_64), "x86_64-macos-cross.cmake")
                .wrapper(&["arch", "-x86_64"]),
            ToolchainDescriptor::new(PlatformId::new(Macos, Aarch64), "aarch64-macos-clang.cmake"),
        ];

        ToolchainCatalog {
            entries: descriptors.into_iter().map(|d| (d.platform, d)).collect(),
        }
    }

    /// Apply `[toolchains.<tag>]` overrides from configuration.
    ///
    /// An override can adjust an entry, disable it, or register a new
    /// platform as long as it names a toolchain file.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, ToolchainOverride>) -> Result<Self> {
        for (tag, ov) in overrides {
            let platform: PlatformId = tag.parse()?;

            if !ov.enabled {
                tracing::debug!("toolchain `{}` disabled by configuration", platform);
                self.entries.remove(&platform);
                continue;
            }

            match self.entries.get_mut(&platform) {
                Some(descriptor) => descriptor.apply(ov),
                None => {
                    let Some(ref file) = ov.file else {
                        bail!(
                            "toolchain override for `{}` adds a new platform but sets no `file`",
                            tag
                        );
                    };
                    let mut descriptor =
                        ToolchainDescriptor::new(platform, &file.to_string_lossy());
                    descriptor.apply(ov);
                    self.entries.insert(platform, descriptor);
                }
            }
        }
        Ok(self)
    }

    /// Look up the descriptor for a platform.
    pub fn lookup(&self, platform: PlatformId) -> Result<&ToolchainDescriptor, BuildError> {
        self.entries
            .get(&platform)
            .ok_or(BuildError::UnknownToolchain { platform })
    }

    /// Check whether a platform has an entry.
    pub fn contains(&self, platform: PlatformId) -> bool {
        self.entries.contains_key(&platform)
    }

    /// All supported platforms, in tag order.
    pub fn platforms(&self) -> impl Iterator<Item = PlatformId> + '_ {
        self.entries.keys().copied()
    }

    /// All descriptors, in tag order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolchainDescriptor> {
        self.entries.values()
    }
}

impl Default for ToolchainCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
