//! Pipeline error and warning types.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::platform::PlatformId;
use crate::util::diagnostic::Diagnostic;

/// Fatal errors raised by the per-platform pipeline.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    #[error("unsupported platform: `{token}`")]
    #[diagnostic(
        code(natives::resolve::unsupported_platform),
        help("Run `webrtc-natives platform --list` to see supported platforms")
    )]
    UnsupportedPlatform { token: String },

    #[error("no toolchain registered for `{platform}`")]
    #[diagnostic(
        code(natives::lookup::unknown_toolchain),
        help("Check the [toolchains] section of natives.toml for a disabled entry")
    )]
    UnknownToolchain { platform: PlatformId },

    #[error("toolchain file for `{platform}` not found: {}", .path.display())]
    #[diagnostic(
        code(natives::configure::missing_toolchain_file),
        help("Set `build.missing_toolchain = \"warn\"` to fall back to a host-native build")
    )]
    MissingToolchainFile { platform: PlatformId, path: PathBuf },

    #[error("native {step} step failed (exit code {}): `{command}`", .code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    #[diagnostic(
        code(natives::build::native_failure),
        help("The build directory was left in place; inspect CMakeFiles/CMakeError.log")
    )]
    NativeBuildFailure {
        step: NativeStep,
        command: String,
        code: Option<i32>,
    },

    #[error("no `{library}` libraries were produced for `{platform}` under {}", .build_dir.display())]
    #[diagnostic(
        code(natives::stage::no_artifacts),
        help("Check OUTPUT_NAME_SUFFIX handling in the CMake project")
    )]
    NoArtifactsProduced {
        platform: PlatformId,
        library: String,
        build_dir: PathBuf,
    },
}

/// Which external CMake invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeStep {
    Configure,
    Build,
}

impl fmt::Display for NativeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeStep::Configure => write!(f, "configure"),
            NativeStep::Build => write!(f, "build"),
        }
    }
}

impl BuildError {
    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());

        match self {
            BuildError::UnsupportedPlatform { token } => {
                diag = diag.with_context(format!(
                    "`{}` is not a known OS family or architecture",
                    token
                ));
            }
            BuildError::MissingToolchainFile { path, .. } => {
                diag = diag.with_location(path);
            }
            BuildError::NativeBuildFailure { step, .. } => {
                diag = diag.with_context(format!("cmake {} exited unsuccessfully", step));
            }
            BuildError::NoArtifactsProduced { build_dir, .. } => {
                diag = diag.with_location(build_dir);
            }
            BuildError::UnknownToolchain { .. } => {}
        }

        if let Some(help) = MietteDiagnostic::help(self) {
            diag = diag.with_suggestion(help.to_string());
        }
        diag
    }
}

/// Recoverable conditions that let the pipeline continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The descriptor's toolchain file is absent; configure ran without
    /// `CMAKE_TOOLCHAIN_FILE`.
    MissingToolchainFile { platform: PlatformId, path: PathBuf },
    /// Two build outputs mapped to the same staged name; the later one was skipped.
    DuplicateArtifact { name: String, skipped: PathBuf },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::MissingToolchainFile { platform, path } => write!(
                f,
                "toolchain file for `{}` not found ({}); configuring without it",
                platform,
                path.display()
            ),
            BuildWarning::DuplicateArtifact { name, skipped } => {
                write!(f, "`{}` already staged; skipped {}", name, skipped.display())
            }
        }
    }
}

/// A successful result that may carry warnings.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<BuildWarning>,
}

impl<T> Outcome<T> {
    /// A clean success.
    pub fn ok(value: T) -> Self {
        Outcome {
            value,
            warnings: Vec::new(),
        }
    }

    /// Attach a warning.
    pub fn with_warning(mut self, warning: BuildWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// True if the step succeeded with caveats.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Move the warnings into `sink` and return the value.
    pub fn drain_into(self, sink: &mut Vec<BuildWarning>) -> T {
        sink.extend(self.warnings);
        self.value
    }
}
