//! Collection of packaged units for publication.
//!
//! Per-platform builds run on separate machines; their units are gathered
//! into one directory and attached to a single release by classifier.
//! Publishing itself happens elsewhere.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::core::platform::normalize_classifier;
use crate::util::fs::write_string;
use crate::util::hash::sha256_file;

/// File name of the generated index.
pub const INDEX_FILE: &str = "natives-index.json";

/// Options for collecting units.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Library base identifier
    pub library: String,

    /// Release version
    pub version: String,
}

/// One attached unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub classifier: String,
    pub file: String,
    pub sha256: String,
    pub size: u64,
}

/// Every unit attached to one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativesIndex {
    pub library: String,
    pub version: String,
    pub units: Vec<IndexEntry>,
}

impl NativesIndex {
    pub fn classifiers(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.classifier.as_str())
    }
}

/// Extract the classifier from a unit file name.
///
/// Returns `None` for files that must never be attached: non-JARs, other
/// libraries, the primary JAR, and sources or javadoc JARs.
pub fn classifier_of(file_name: &str, opts: &AggregateOptions) -> Option<String> {
    if !file_name.ends_with(".jar") || !file_name.contains(&opts.library) {
        return None;
    }
    if file_name == format!("{}-{}.jar", opts.library, opts.version)
        || file_name.contains("-sources")
        || file_name.contains("-javadoc")
    {
        return None;
    }

    let prefix = format!("{}-{}-", opts.library, opts.version);
    let classifier = file_name.strip_prefix(&prefix)?.strip_suffix(".jar")?;
    (!classifier.is_empty()).then(|| normalize_classifier(classifier))
}

/// Collect packaged units from `dir`, in sorted file order.
///
/// Classifiers are normalized to `{os}-{arch}`; one seen twice keeps its
/// first unit.
pub fn collect_units(dir: &Path, opts: &AggregateOptions) -> Result<NativesIndex> {
    if !dir.is_dir() {
        bail!("unit directory {} does not exist", dir.display());
    }

    let mut seen = BTreeSet::new();
    let mut units = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.file_name().to_string_lossy().into_owned();
        let Some(classifier) = classifier_of(&file, opts) else {
            if file.ends_with(".jar") {
                tracing::debug!("not attaching {}", file);
            }
            continue;
        };

        if !seen.insert(classifier.clone()) {
            tracing::warn!(
                "classifier `{}` already attached; skipping {}",
                classifier,
                file
            );
            continue;
        }

        let path = entry.path();
        units.push(IndexEntry {
            classifier,
            sha256: sha256_file(path)?,
            size: entry
                .metadata()
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len(),
            file,
        });
    }

    tracing::info!(
        "Collected {} unit{} for {} {}",
        units.len(),
        if units.len() == 1 { "" } else { "s" },
        opts.library,
        opts.version
    );

    Ok(NativesIndex {
        library: opts.library.clone(),
        version: opts.version.clone(),
        units,
    })
}

/// Write the index as pretty JSON into `dir`.
pub fn write_index(dir: &Path, index: &NativesIndex) -> Result<PathBuf> {
    let path = dir.join(INDEX_FILE);
    let json = serde_json::to_string_pretty(index).context("failed to serialize index")?;
    write_string(&path, &json)?;
    Ok(path)
}
