//! Host probing and target platform resolution.

use crate::builder::toolchain::ToolchainCatalog;
use crate::core::errors::BuildError;
use crate::core::platform::PlatformId;

/// Environment variable that bypasses host probing.
pub const PLATFORM_ENV: &str = "WEBRTC_NATIVES_PLATFORM";

/// Raw OS and CPU strings as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

impl HostInfo {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        HostInfo {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Probe the running host.
    ///
    /// An x86_64 process translated by Rosetta reports the physical arm64
    /// chip, since that is what decides whether a translation wrapper is
    /// needed.
    pub fn probe() -> Self {
        let os = std::env::consts::OS;
        let mut arch = std::env::consts::ARCH.to_string();

        if os == "macos" && arch == "x86_64" && is_rosetta_translated() {
            tracing::debug!("process is running under Rosetta; reporting arm64 host");
            arch = "arm64".to_string();
        }

        HostInfo::new(os, arch)
    }

    /// The host as a platform identifier, if it maps onto one.
    pub fn platform(&self) -> Result<PlatformId, BuildError> {
        PlatformId::from_parts(&self.os, &self.arch)
    }
}

#[cfg(target_os = "macos")]
fn is_rosetta_translated() -> bool {
    use crate::util::process::ProcessBuilder;

    ProcessBuilder::new("sysctl")
        .args(["-in", "sysctl.proc_translated"])
        .exec()
        .map(|out| String::from_utf8_lossy(&out.stdout).trim() == "1")
        .unwrap_or(false)
}

#[cfg(not(target_os = "macos"))]
fn is_rosetta_translated() -> bool {
    false
}

/// Determine the effective target platform.
///
/// An explicit override wins and the host is ignored entirely. Without one
/// the probed host values are normalized. Either way the platform must have
/// a catalog entry.
pub fn resolve_platform(
    explicit_override: Option<&str>,
    host: &HostInfo,
    catalog: &ToolchainCatalog,
) -> Result<PlatformId, BuildError> {
    let platform = match explicit_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            tracing::debug!("using explicit platform override `{}`", raw);
            raw.parse::<PlatformId>()?
        }
        None => host.platform()?,
    };

    if !catalog.contains(platform) {
        return Err(BuildError::UnsupportedPlatform {
            token: platform.tag(),
        });
    }

    Ok(platform)
}
