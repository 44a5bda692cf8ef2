//! Platform identifiers.
//!
//! A platform is an OS family plus a CPU architecture. Its tag
//! (`linux-x86_64`, `macos-aarch64`, ...) namespaces build directories,
//! artifact names and package classifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::BuildError;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Windows,
}

impl OsFamily {
    pub const ALL: [OsFamily; 3] = [OsFamily::Linux, OsFamily::Macos, OsFamily::Windows];

    /// Canonical token used in platform tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
            OsFamily::Windows => "windows",
        }
    }

    /// Normalize a raw OS string (override token or probed host value).
    ///
    /// Returns `None` for anything outside the supported families.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        match s.as_str() {
            "linux" => Some(OsFamily::Linux),
            "macos" | "mac" | "osx" | "darwin" | "mac os x" | "macosx" => Some(OsFamily::Macos),
            "windows" | "win" | "win32" | "win64" => Some(OsFamily::Windows),
            // JVM-style names such as "Windows 11"
            _ if s.starts_with("windows ") => Some(OsFamily::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
    #[serde(rename = "arm32")]
    Arm32,
}

impl Arch {
    pub const ALL: [Arch; 3] = [Arch::X86_64, Arch::Aarch64, Arch::Arm32];

    /// Canonical token used in platform tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Arm32 => "arm32",
        }
    }

    /// Normalize a raw architecture string.
    ///
    /// `amd64`, `x86-64`, `x86_64` and `x64` are the same chip; `arm64` and
    /// `aarch64` are the 64-bit ARM bucket; every other `arm*` string lands in
    /// the 32-bit ARM bucket.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        match s.as_str() {
            "x86_64" | "x86-64" | "amd64" | "x64" => Some(Arch::X86_64),
            "aarch64" | "arm64" => Some(Arch::Aarch64),
            "aarch32" => Some(Arch::Arm32),
            _ if s.starts_with("arm") => Some(Arch::Arm32),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target platform: OS family and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformId {
    pub os: OsFamily,
    pub arch: Arch,
}

impl PlatformId {
    pub const fn new(os: OsFamily, arch: Arch) -> Self {
        PlatformId { os, arch }
    }

    /// Normalize a pair of raw OS / architecture strings.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, BuildError> {
        let os_family = OsFamily::from_alias(os).ok_or_else(|| BuildError::UnsupportedPlatform {
            token: os.trim().to_string(),
        })?;
        let arch = Arch::from_alias(arch).ok_or_else(|| BuildError::UnsupportedPlatform {
            token: arch.trim().to_string(),
        })?;
        Ok(PlatformId::new(os_family, arch))
    }

    /// The `{os}-{arch}` tag.
    pub fn tag(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Classifier attached to the packaged unit.
    ///
    /// Identical to the tag; kept separate so call sites say which of the
    /// two roles they need.
    pub fn classifier(&self) -> String {
        normalize_classifier(&self.tag())
    }

    /// Every OS/arch combination the identifier space can express.
    pub fn all() -> impl Iterator<Item = PlatformId> {
        OsFamily::ALL
            .into_iter()
            .flat_map(|os| Arch::ALL.into_iter().map(move |arch| PlatformId::new(os, arch)))
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for PlatformId {
    type Err = BuildError;

    /// Parse an override such as `linux-x86_64`, `linux_x86-64` or
    /// `macos_arm64`. The OS token ends at the first `-` or `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(split) = s.find(&['-', '_'][..]) else {
            return Err(BuildError::UnsupportedPlatform {
                token: s.to_string(),
            });
        };
        let (os, arch) = (&s[..split], &s[split + 1..]);
        if os.is_empty() || arch.is_empty() {
            return Err(BuildError::UnsupportedPlatform {
                token: s.to_string(),
            });
        }
        PlatformId::from_parts(os, arch)
    }
}

/// Normalize the separator between OS and arch to `-`.
///
/// Only the first separator is touched so the `_` inside `x86_64` survives.
pub fn normalize_classifier(tag: &str) -> String {
    match tag.find(&['-', '_', ' '][..]) {
        Some(i) => format!("{}-{}", &tag[..i], &tag[i + 1..]),
        None => tag.to_string(),
    }
}
