//! Package identity and JAR manifest generation.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use semver::Version;
use serde::Serialize;

use crate::core::platform::PlatformId;
use crate::util::config::ProjectConfig;

/// Default library base name.
pub const DEFAULT_LIBRARY: &str = "webrtc-java";

/// Default release version when none is configured.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Default human-readable title.
pub const DEFAULT_TITLE: &str = "WebRTC Java";

/// Fixed vendor string.
pub const DEFAULT_VENDOR: &str = "Kas-tle";

/// Default module name base.
pub const DEFAULT_MODULE: &str = "dev.kastle.webrtc";

/// Environment variable pinning the build timestamp for reproducible builds.
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

/// Maximum manifest line length in bytes, excluding the line break.
const MAX_LINE: usize = 72;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));

/// Identity of the library being packaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectIdentity {
    pub library: String,
    pub version: Version,
    pub title: String,
    pub vendor: String,
    pub module: String,
}

impl Default for ProjectIdentity {
    fn default() -> Self {
        ProjectIdentity {
            library: DEFAULT_LIBRARY.to_string(),
            version: Version::new(0, 1, 0),
            title: DEFAULT_TITLE.to_string(),
            vendor: DEFAULT_VENDOR.to_string(),
            module: DEFAULT_MODULE.to_string(),
        }
    }
}

impl ProjectIdentity {
    /// Build from configuration, validating the version.
    pub fn from_config(cfg: &ProjectConfig) -> Result<Self> {
        let raw_version = cfg.version.as_deref().unwrap_or(DEFAULT_VERSION);
        let version = Version::parse(raw_version)
            .with_context(|| format!("invalid project version `{}`", raw_version))?;

        Ok(ProjectIdentity {
            library: cfg
                .library
                .clone()
                .unwrap_or_else(|| DEFAULT_LIBRARY.to_string()),
            version,
            title: cfg.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            vendor: cfg.vendor.clone().unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
            module: cfg.module.clone().unwrap_or_else(|| DEFAULT_MODULE.to_string()),
        })
    }

    /// Module name for one platform's package: `dev.kastle.webrtc.linux_x86_64`.
    pub fn module_name(&self, platform: PlatformId) -> String {
        format!(
            "{}.{}",
            self.module,
            NON_ALNUM.replace_all(&platform.tag(), "_")
        )
    }

    /// File name of a platform's packaged unit.
    pub fn package_file_name(&self, platform: PlatformId) -> String {
        format!(
            "{}-{}-{}.jar",
            self.library,
            self.version,
            platform.classifier()
        )
    }

    /// File name of the primary (platform-independent) package.
    pub fn primary_file_name(&self) -> String {
        format!("{}-{}.jar", self.library, self.version)
    }
}

/// WebRTC branch plus the project's git commit, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRevision {
    pub branch: String,
    pub commit: Option<String>,
}

impl SourceRevision {
    pub fn new(branch: impl Into<String>, commit: Option<String>) -> Self {
        SourceRevision {
            branch: branch.into(),
            commit,
        }
    }

    /// Detect the HEAD commit of the repository containing `root`.
    pub fn detect(root: &Path, branch: &str) -> Self {
        let commit = git2::Repository::discover(root)
            .and_then(|repo| repo.head()?.peel_to_commit().map(|c| c.id()))
            .map(|id| id.to_string().chars().take(12).collect::<String>());

        match commit {
            Ok(commit) => SourceRevision::new(branch, Some(commit)),
            Err(e) => {
                tracing::debug!("no git revision for {}: {}", root.display(), e.message());
                SourceRevision::new(branch, None)
            }
        }
    }
}

impl fmt::Display for SourceRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.commit {
            Some(commit) => write!(f, "{}@{}", self.branch, commit),
            None => write!(f, "{}", self.branch),
        }
    }
}

/// Build timestamp, pinned by `SOURCE_DATE_EPOCH` when set.
pub fn build_timestamp() -> DateTime<Utc> {
    let pinned = std::env::var(SOURCE_DATE_EPOCH)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    match pinned {
        Some(ts) => ts,
        None => {
            let now = Utc::now();
            DateTime::<Utc>::from_timestamp(now.timestamp(), 0).unwrap_or(now)
        }
    }
}

/// Ordered JAR manifest attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JarManifest {
    attributes: Vec<(String, String)>,
}

impl JarManifest {
    /// Manifest for one platform's packaged unit.
    pub fn for_platform(
        project: &ProjectIdentity,
        platform: PlatformId,
        revision: &SourceRevision,
        built_at: DateTime<Utc>,
    ) -> Self {
        let tag = platform.tag();
        let attributes = vec![
            ("Manifest-Version", "1.0".to_string()),
            (
                "Implementation-Title",
                format!("{} ({})", project.title, tag),
            ),
            ("Implementation-Version", project.version.to_string()),
            ("Implementation-Vendor", project.vendor.clone()),
            ("Automatic-Module-Name", project.module_name(platform)),
            (
                "Created-By",
                format!("webrtc-natives {}", env!("CARGO_PKG_VERSION")),
            ),
            ("Build-Platform", tag),
            ("Source-Revision", revision.to_string()),
            (
                "Build-Date",
                built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];

        JarManifest {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Look up an attribute value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in manifest order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Render in JAR manifest format: CRLF line endings, lines wrapped at
    /// 72 bytes with single-space continuation lines, trailing blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.attributes {
            write_wrapped(&mut out, &format!("{}: {}", key, value));
        }
        out.push_str("\r\n");
        out
    }
}

fn write_wrapped(out: &mut String, line: &str) {
    let mut budget = MAX_LINE;
    let mut used = 0;

    for ch in line.chars() {
        let len = ch.len_utf8();
        if used + len > budget {
            out.push_str("\r\n ");
            // The leading space counts against the continuation line.
            budget = MAX_LINE - 1;
            used = 0;
        }
        out.push(ch);
        used += len;
    }
    out.push_str("\r\n");
}
