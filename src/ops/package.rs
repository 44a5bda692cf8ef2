//! Packaging of staged libraries into a classifier JAR.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::manifest::{build_timestamp, JarManifest, ProjectIdentity, SourceRevision};
use crate::core::platform::PlatformId;
use crate::ops::stage::StagedArtifact;
use crate::util::fs::ensure_dir;
use crate::util::hash::sha256_file;

/// Manifest location inside the archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Options for packaging.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Identity used for the file name and the manifest
    pub project: ProjectIdentity,

    /// Directory the unit is written to
    pub output_dir: PathBuf,

    /// Recorded build instant
    pub built_at: DateTime<Utc>,
}

impl PackageOptions {
    /// Options stamped with the current (or pinned) build time.
    pub fn new(project: ProjectIdentity, output_dir: impl Into<PathBuf>) -> Self {
        PackageOptions {
            project,
            output_dir: output_dir.into(),
            built_at: build_timestamp(),
        }
    }
}

/// One platform's packaged deliverable.
#[derive(Debug, Clone, Serialize)]
pub struct PackagedUnit {
    pub platform: PlatformId,
    pub classifier: String,
    pub manifest: JarManifest,
    /// Archived libraries, ordered by name
    pub artifacts: Vec<StagedArtifact>,
    pub path: PathBuf,
    pub sha256: String,
    pub size: u64,
}

/// Package staged libraries into `{output_dir}/{library}-{version}-{classifier}.jar`.
///
/// The archive is written to a temporary file beside the destination and
/// persisted once complete. Entry timestamps are fixed, so identical inputs
/// produce identical bytes.
pub fn package(
    platform: PlatformId,
    staged: &[StagedArtifact],
    revision: &SourceRevision,
    opts: &PackageOptions,
) -> Result<PackagedUnit> {
    if staged.is_empty() {
        bail!("nothing to package for `{}`", platform);
    }
    if let Some(other) = staged.iter().find(|a| a.platform != platform) {
        bail!(
            "staged artifact `{}` belongs to `{}`, not `{}`",
            other.file_name,
            other.platform,
            platform
        );
    }

    let mut artifacts = staged.to_vec();
    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let manifest = JarManifest::for_platform(&opts.project, platform, revision, opts.built_at);
    let path = opts
        .output_dir
        .join(opts.project.package_file_name(platform));

    ensure_dir(&opts.output_dir)?;
    let mut tmp = NamedTempFile::new_in(&opts.output_dir).with_context(|| {
        format!(
            "failed to create temporary file in {}",
            opts.output_dir.display()
        )
    })?;

    write_jar(tmp.as_file_mut(), &manifest, &artifacts)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tmp.persist(&path)
        .with_context(|| format!("failed to persist {}", path.display()))?;

    let size = std::fs::metadata(&path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    let sha256 = sha256_file(&path)?;

    tracing::info!(
        "Packaged {} ({} librar{}, {} bytes)",
        path.display(),
        artifacts.len(),
        if artifacts.len() == 1 { "y" } else { "ies" },
        size
    );

    Ok(PackagedUnit {
        platform,
        classifier: platform.classifier(),
        manifest,
        artifacts,
        path,
        sha256,
        size,
    })
}

fn write_jar(file: &mut File, manifest: &JarManifest, artifacts: &[StagedArtifact]) -> Result<()> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(file);

    zip.add_directory("META-INF/", options.unix_permissions(0o755))?;
    zip.start_file(MANIFEST_PATH, options)?;
    zip.write_all(manifest.render().as_bytes())?;

    for artifact in artifacts {
        zip.start_file(artifact.file_name.as_str(), options)?;
        let mut src = File::open(&artifact.destination)
            .with_context(|| format!("failed to open {}", artifact.destination.display()))?;
        io::copy(&mut src, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// Read the manifest back out of a packaged unit.
pub fn read_manifest(jar: &Path) -> Result<String> {
    let file = File::open(jar).with_context(|| format!("failed to open {}", jar.display()))?;
    let mut archive = zip::ZipArchive::new(io::BufReader::new(file))
        .with_context(|| format!("{} is not a valid archive", jar.display()))?;

    let mut entry = archive
        .by_name(MANIFEST_PATH)
        .with_context(|| format!("{} has no manifest", jar.display()))?;
    let mut manifest = String::new();
    io::Read::read_to_string(&mut entry, &mut manifest)?;
    Ok(manifest)
}
