//! Staging of native build outputs.
//!
//! Collects the shared libraries a build directory produced, renames the
//! project's own libraries to their platform-qualified names and flattens
//! everything into one staging directory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::builder::context::INSTALL_DIR_NAME;
use crate::core::errors::{BuildError, BuildWarning, Outcome};
use crate::core::platform::PlatformId;
use crate::util::fs::{copy_file, ensure_dir, resolve_path};

/// Directories that only hold intermediate build products.
const INTERMEDIATE_DIRS: &[&str] = &["CMakeFiles", "obj", "Intermediate"];

/// Directory name suffixes of intermediate build products.
const INTERMEDIATE_DIR_SUFFIXES: &[&str] = &[".dir", ".tlog"];

/// Import libraries, export definitions and debug databases.
const EXCLUDED_SUFFIXES: &[&str] = &[".lib", ".exp", ".dll.a", ".a", ".pdb", ".ilk", ".def"];

/// Kind of dynamic library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    So,
    Dll,
    Dylib,
}

impl LibraryKind {
    /// Classify a file name by its extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "so" => Some(LibraryKind::So),
            "dll" => Some(LibraryKind::Dll),
            "dylib" => Some(LibraryKind::Dylib),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            LibraryKind::So => "so",
            LibraryKind::Dll => "dll",
            LibraryKind::Dylib => "dylib",
        }
    }

    /// File name prefix the platform loader expects.
    pub fn prefix(&self) -> &'static str {
        match self {
            LibraryKind::So | LibraryKind::Dylib => "lib",
            LibraryKind::Dll => "",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Platform-qualified name for one of the project's libraries.
///
/// `output_file_name("webrtc-java", linux-x86_64, So)` is
/// `libwebrtc-java-linux-x86_64.so`.
pub fn output_file_name(library: &str, platform: PlatformId, kind: LibraryKind) -> String {
    format!(
        "{}{}-{}.{}",
        kind.prefix(),
        library,
        platform.tag(),
        kind.extension()
    )
}

/// Options for staging.
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Library base identifier
    pub library: String,

    /// Flattened output directory; libraries from earlier runs are replaced
    pub output_dir: PathBuf,
}

impl StageOptions {
    pub fn new(library: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        StageOptions {
            library: library.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// A library copied into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedArtifact {
    /// Original location inside the build directory
    pub source: PathBuf,

    pub platform: PlatformId,

    pub kind: LibraryKind,

    /// Name inside the staging directory and the packaged unit
    pub file_name: String,

    /// Location inside the staging directory
    pub destination: PathBuf,

    /// Whether the platform naming template was applied
    pub renamed: bool,

    /// Size in bytes
    pub size: u64,
}

/// Check whether a walked directory holds only intermediate products.
fn is_intermediate_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    INTERMEDIATE_DIRS.contains(&name.as_ref())
        || INTERMEDIATE_DIR_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Check whether a walked directory is the install prefix of an install build.
fn is_install_prefix(entry: &DirEntry) -> bool {
    entry.depth() == 1 && entry.file_type().is_dir() && entry.file_name() == INSTALL_DIR_NAME
}

fn is_excluded_file(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    EXCLUDED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Remove the libraries an earlier run left in `output_dir`.
///
/// Anything that is not a dynamic library is left alone.
fn clear_staged(output_dir: &Path) -> Result<()> {
    if !output_dir.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(output_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("failed to read {}", output_dir.display()))?;
        if !entry.file_type().is_file()
            || LibraryKind::from_file_name(&entry.file_name().to_string_lossy()).is_none()
        {
            continue;
        }
        std::fs::remove_file(entry.path())
            .with_context(|| format!("failed to remove {}", entry.path().display()))?;
        tracing::debug!("Removed stale {}", entry.path().display());
    }
    Ok(())
}

/// Decide the staged name of one build output, if it is a deliverable at all.
///
/// Returns the kind, the output name and whether the naming template applied.
pub fn classify(
    file_name: &str,
    library: &str,
    platform: PlatformId,
) -> Option<(LibraryKind, String, bool)> {
    if is_excluded_file(file_name) {
        return None;
    }
    let kind = LibraryKind::from_file_name(file_name)?;

    if file_name.contains(library) {
        Some((kind, output_file_name(library, platform, kind), true))
    } else {
        Some((kind, file_name.to_string(), false))
    }
}

/// Stage the shared libraries of one platform's build directory.
///
/// Libraries left in the output directory by an earlier run are removed
/// first, so staging an unchanged tree twice yields the same result. The
/// output directory may not be the build directory or one of its ancestors.
/// The install prefix of an install build is not walked. When two outputs map to the same staged name the
/// first in walk order wins and the others become warnings.
pub fn stage(
    build_dir: &Path,
    platform: PlatformId,
    opts: &StageOptions,
) -> Result<Outcome<Vec<StagedArtifact>>> {
    if !build_dir.is_dir() {
        bail!(
            "build directory {} does not exist\n\
             hint: run `webrtc-natives build --platform {}` first",
            build_dir.display(),
            platform
        );
    }
    let build_dir = resolve_path(build_dir)?;
    let output_dir = resolve_path(&opts.output_dir)?;
    if build_dir.starts_with(&output_dir) {
        bail!(
            "staging directory {} must not contain the build directory {}",
            opts.output_dir.display(),
            build_dir.display()
        );
    }

    let mut selected: BTreeMap<String, StagedArtifact> = BTreeMap::new();
    let mut warnings = Vec::new();

    let walker = WalkDir::new(&build_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !is_intermediate_dir(e) && !is_install_prefix(e) && e.path() != output_dir.as_path()
        });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("failed to walk {}", build_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some((kind, file_name, renamed)) = classify(&name, &opts.library, platform) else {
            continue;
        };

        if selected.contains_key(&file_name) {
            let warning = BuildWarning::DuplicateArtifact {
                name: file_name,
                skipped: entry.path().to_path_buf(),
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
            continue;
        }

        tracing::debug!("selected {} as {}", entry.path().display(), file_name);
        selected.insert(
            file_name.clone(),
            StagedArtifact {
                source: entry.path().to_path_buf(),
                platform,
                kind,
                destination: output_dir.join(&file_name),
                file_name,
                renamed,
                size: 0,
            },
        );
    }

    if !selected.values().any(|a| a.renamed) {
        return Err(BuildError::NoArtifactsProduced {
            platform,
            library: opts.library.clone(),
            build_dir,
        }
        .into());
    }

    clear_staged(&output_dir)?;
    ensure_dir(&output_dir)?;

    let mut staged = Vec::with_capacity(selected.len());
    for (_, mut artifact) in selected {
        artifact.size = copy_file(&artifact.source, &artifact.destination)?;
        tracing::debug!(
            "Copied {} -> {}",
            artifact.source.display(),
            artifact.destination.display()
        );
        staged.push(artifact);
    }

    tracing::info!(
        "Staged {} librar{} for {} into {}",
        staged.len(),
        if staged.len() == 1 { "y" } else { "ies" },
        platform,
        output_dir.display()
    );

    Ok(Outcome {
        value: staged,
        warnings,
    })
}

/// Read back a staging directory left by an earlier run.
///
/// Used when resuming at the package stage; the staged files act as their
/// own sources.
pub fn load_staged(
    staging_dir: &Path,
    platform: PlatformId,
    library: &str,
) -> Result<Vec<StagedArtifact>> {
    let no_artifacts = || BuildError::NoArtifactsProduced {
        platform,
        library: library.to_string(),
        build_dir: staging_dir.to_path_buf(),
    };
    if !staging_dir.is_dir() {
        return Err(no_artifacts().into());
    }

    let mut staged = Vec::new();
    for entry in WalkDir::new(staging_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to read {}", staging_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(kind) = LibraryKind::from_file_name(&file_name) else {
            continue;
        };

        staged.push(StagedArtifact {
            source: entry.path().to_path_buf(),
            platform,
            kind,
            renamed: file_name == output_file_name(library, platform, kind),
            destination: entry.path().to_path_buf(),
            size: entry.metadata().map(|m| m.len()).unwrap_or(0),
            file_name,
        });
    }

    if !staged.iter().any(|a| a.renamed) {
        return Err(no_artifacts().into());
    }
    Ok(staged)
}
