//! CMake invocation for one platform.
//!
//! Two external processes per platform: configure, then build. Both run
//! through the descriptor's host wrapper when it applies to this host.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::builder::context::BuildContext;
use crate::builder::toolchain::ToolchainDescriptor;
use crate::core::errors::{BuildError, BuildWarning, NativeStep, Outcome};
use crate::core::host::HostInfo;
use crate::core::platform::OsFamily;
use crate::util::config::MissingToolchainPolicy;
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, logical_cpus, ProcessBuilder};

/// CMake build type used for every deliverable.
pub const BUILD_TYPE: &str = "Release";

/// Inputs to the configure step beyond the descriptor.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// WebRTC branch (`-DWEBRTC_BRANCH`)
    pub revision: String,
    /// Directory that relative toolchain files resolve against
    pub toolchain_dir: PathBuf,
    /// Prebuilt WebRTC (`-DWEBRTC_INSTALL_DIR`)
    pub webrtc_install_dir: Option<PathBuf>,
    /// Install prefix, set when the install target will be built
    pub install_prefix: Option<PathBuf>,
    /// Missing toolchain file handling
    pub missing_toolchain: MissingToolchainPolicy,
    /// Extra user arguments
    pub extra_args: Vec<String>,
}

impl ConfigureOptions {
    /// Derive configure options for one platform from the context.
    pub fn from_context(ctx: &BuildContext, descriptor: &ToolchainDescriptor) -> Self {
        ConfigureOptions {
            revision: ctx.revision.clone(),
            toolchain_dir: ctx.toolchain_dir.clone(),
            webrtc_install_dir: ctx.webrtc_install_dir.clone(),
            install_prefix: ctx
                .install
                .then(|| ctx.install_prefix(descriptor.platform)),
            missing_toolchain: ctx.missing_toolchain,
            extra_args: ctx.cmake_args.clone(),
        }
    }
}

/// Inputs to the build step.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Build the `install` target
    pub install: bool,
    /// Parallel jobs (None = logical CPU count)
    pub jobs: Option<usize>,
}

/// Drives CMake for one toolchain descriptor.
#[derive(Debug, Clone)]
pub struct CMakeInvoker<'a> {
    descriptor: &'a ToolchainDescriptor,
    cmake: PathBuf,
    wrapper: Option<Vec<String>>,
}

impl<'a> CMakeInvoker<'a> {
    /// Create an invoker, locating cmake.
    pub fn new(
        descriptor: &'a ToolchainDescriptor,
        host: &HostInfo,
        cmake: Option<&Path>,
    ) -> Result<Self> {
        let cmake = find_cmake(cmake).ok_or_else(|| {
            anyhow!(
                "CMake not found\n\
                 \n\
                 CMake is required to build the native library.\n\
                 Install CMake and ensure it's in your PATH, or set WEBRTC_NATIVES_CMAKE."
            )
        })?;

        Ok(Self::with_program(descriptor, host, cmake))
    }

    /// Create an invoker for an explicit cmake program without searching PATH.
    pub fn with_program(
        descriptor: &'a ToolchainDescriptor,
        host: &HostInfo,
        cmake: impl Into<PathBuf>,
    ) -> Self {
        let wrapper = descriptor.wrapper_for(host).map(|w| w.to_vec());
        if let Some(ref w) = wrapper {
            tracing::info!(
                "Host {}/{} cannot run {} natively; wrapping cmake with `{}`",
                host.os,
                host.arch,
                descriptor.platform,
                w.join(" ")
            );
        }

        CMakeInvoker {
            descriptor,
            cmake: cmake.into(),
            wrapper,
        }
    }

    /// The wrapper applied to every invocation, if any.
    pub fn wrapper(&self) -> Option<&[String]> {
        self.wrapper.as_deref()
    }

    /// Build the configure command without running it.
    ///
    /// A missing toolchain file drops `CMAKE_TOOLCHAIN_FILE` and yields a
    /// warning, unless the policy makes it fatal.
    pub fn plan_configure(
        &self,
        build_dir: &Path,
        source_root: &Path,
        opts: &ConfigureOptions,
    ) -> Result<Outcome<ProcessBuilder>, BuildError> {
        let d = self.descriptor;
        let mut warnings = Vec::new();

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("-S")
            .arg(source_root)
            .arg("-B")
            .arg(build_dir);

        if let Some(ref generator) = d.generator {
            cmd = cmd.arg("-G").arg(generator);
        }
        if let Some(ref arch) = d.architecture {
            cmd = cmd.arg("-A").arg(arch);
        }

        cmd = cmd.arg(format!("-DCMAKE_BUILD_TYPE={}", BUILD_TYPE));

        let toolchain = d.toolchain_path(&opts.toolchain_dir);
        if toolchain.is_file() {
            cmd = cmd.arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain.display()));
        } else {
            match opts.missing_toolchain {
                MissingToolchainPolicy::Error => {
                    return Err(BuildError::MissingToolchainFile {
                        platform: d.platform,
                        path: toolchain,
                    });
                }
                MissingToolchainPolicy::Warn => {
                    warnings.push(BuildWarning::MissingToolchainFile {
                        platform: d.platform,
                        path: toolchain,
                    });
                }
            }
        }

        cmd = cmd
            .arg(format!("-DWEBRTC_BRANCH={}", opts.revision))
            .arg(format!("-DOUTPUT_NAME_SUFFIX={}", d.platform.tag()));

        if let Some(ref dir) = opts.webrtc_install_dir {
            cmd = cmd.arg(format!("-DWEBRTC_INSTALL_DIR={}", dir.display()));
        }
        if let Some(ref prefix) = opts.install_prefix {
            cmd = cmd.arg(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()));
        }

        cmd = cmd.args(&opts.extra_args);

        Ok(Outcome {
            value: cmd.wrapped(self.wrapper()),
            warnings,
        })
    }

    /// Build the compile command without running it.
    pub fn plan_build(&self, build_dir: &Path, opts: &CompileOptions) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("--build")
            .arg(build_dir)
            .arg("--config")
            .arg(BUILD_TYPE);

        if opts.install {
            cmd = cmd.arg("--target").arg("install");
        }

        // The Visual Studio path of this pipeline never passes a job count.
        if self.descriptor.platform.os != OsFamily::Windows {
            let jobs = opts.jobs.unwrap_or_else(logical_cpus);
            cmd = cmd.arg("--parallel").arg(jobs.to_string());
        }

        cmd.wrapped(self.wrapper())
    }

    /// Create the build directory and run the configure step.
    pub fn configure(
        &self,
        build_dir: &Path,
        source_root: &Path,
        opts: &ConfigureOptions,
    ) -> Result<Outcome<()>> {
        ensure_dir(build_dir)?;

        let planned = self.plan_configure(build_dir, source_root, opts)?;
        for warning in &planned.warnings {
            tracing::warn!("{}", warning);
        }

        tracing::info!("Configuring {}", self.descriptor.platform);
        run(&planned.value, NativeStep::Configure)?;

        Ok(Outcome {
            value: (),
            warnings: planned.warnings,
        })
    }

    /// Run the build step.
    pub fn build(&self, build_dir: &Path, opts: &CompileOptions) -> Result<()> {
        tracing::info!(
            "Building {}{}",
            self.descriptor.platform,
            if opts.install { " (install)" } else { "" }
        );
        run(&self.plan_build(build_dir, opts), NativeStep::Build)
    }
}

fn run(cmd: &ProcessBuilder, step: NativeStep) -> Result<()> {
    tracing::debug!("running `{}`", cmd.display_command());

    let status = cmd.status()?;
    if !status.success() {
        return Err(BuildError::NativeBuildFailure {
            step,
            command: cmd.display_command(),
            code: status.code(),
        }
        .into());
    }
    Ok(())
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}
