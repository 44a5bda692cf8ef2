//! The per-platform build pipeline.
//!
//! resolve -> lookup -> configure -> build -> stage -> package, strictly in
//! order for one platform. Several platforms may run side by side; their
//! directories are namespaced by tag so nothing is shared.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::builder::cmake::{is_cmake_project, CMakeInvoker, CompileOptions, ConfigureOptions};
use crate::builder::context::BuildContext;
use crate::core::errors::{BuildError, BuildWarning};
use crate::core::host::resolve_platform;
use crate::core::manifest::SourceRevision;
use crate::core::platform::PlatformId;
use crate::ops::package::{package, PackageOptions, PackagedUnit};
use crate::ops::stage::{load_staged, stage, StageOptions, StagedArtifact};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Lookup,
    Configure,
    Build,
    Stage,
    Package,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Resolve,
        Stage::Lookup,
        Stage::Configure,
        Stage::Build,
        Stage::Stage,
        Stage::Package,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::Lookup => "lookup",
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Stage => "stage",
            Stage::Package => "package",
        }
    }

    /// Whether a run can be resumed at this stage.
    pub fn is_resumable(&self) -> bool {
        *self >= Stage::Configure
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stage = Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown stage `{}` (expected one of: configure, build, stage, package)",
                    s
                )
            })?;
        if !stage.is_resumable() {
            return Err(format!("cannot resume at `{}`; it always runs", stage));
        }
        Ok(stage)
    }
}

/// A failure in one platform's pipeline.
#[derive(Debug, Error)]
#[error("{stage} stage failed for `{platform}`")]
pub struct StageError {
    /// Platform tag, or the raw override token when resolution failed
    pub platform: String,
    pub stage: Stage,
    pub source: anyhow::Error,
}

impl StageError {
    fn new(platform: impl Into<String>, stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        StageError {
            platform: platform.into(),
            stage,
            source: source.into(),
        }
    }

    /// The typed build error behind this failure, if any.
    pub fn build_error(&self) -> Option<&BuildError> {
        self.source
            .chain()
            .find_map(|e| e.downcast_ref::<BuildError>())
    }

    /// Convert to a user-facing diagnostic with a resume hint.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = match self.build_error() {
            Some(err) => {
                let inner = err.to_diagnostic();
                let mut diag = Diagnostic::error(self.to_string()).with_context(inner.message);
                for ctx in inner.context {
                    diag = diag.with_context(ctx);
                }
                if let Some(location) = inner.location {
                    diag = diag.with_location(location);
                }
                for suggestion in inner.suggestions {
                    diag = diag.with_suggestion(suggestion);
                }
                diag
            }
            None => Diagnostic::error(self.to_string()).with_context(format!("{:#}", self.source)),
        };

        let hint = match self.stage {
            Stage::Resolve | Stage::Lookup => Some(suggestions::LIST_PLATFORMS),
            Stage::Configure | Stage::Build => Some(suggestions::BUILD_FAILED),
            Stage::Stage | Stage::Package => None,
        };
        if let Some(hint) = hint {
            if !diag.suggestions.iter().any(|s| s == hint) {
                diag = diag.with_suggestion(hint);
            }
        }

        if self.stage.is_resumable() {
            diag = diag.with_suggestion(format!(
                "After fixing the problem, resume with `webrtc-natives build --platform {} --from {}`",
                self.platform, self.stage
            ));
        }
        diag
    }
}

fn fail_at<E>(platform: &str, stage: Stage) -> impl FnOnce(E) -> StageError + '_
where
    E: Into<anyhow::Error>,
{
    move |e| StageError::new(platform, stage, e)
}

/// One requested platform pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Explicit platform; `None` probes the host
    pub platform: Option<String>,

    /// First stage to run; earlier resumable stages are skipped
    pub from: Stage,

    /// Print the cmake commands instead of running anything
    pub dry_run: bool,
}

impl PipelineRequest {
    pub fn new(platform: Option<String>) -> Self {
        PipelineRequest {
            platform,
            from: Stage::Configure,
            dry_run: false,
        }
    }

    pub fn from_stage(mut self, from: Stage) -> Self {
        self.from = from;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The label used for errors before resolution succeeds.
    fn label(&self, ctx: &BuildContext) -> String {
        match self.platform.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => format!("{}-{}", ctx.host.os, ctx.host.arch),
        }
    }
}

/// Result of a successful pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub platform: PlatformId,
    /// Stages that actually ran
    pub stages: Vec<Stage>,
    /// Recoverable problems, in the order they occurred
    pub warnings: Vec<String>,
    /// Commands a dry run would have executed
    pub planned: Vec<String>,
    pub staged: Vec<StagedArtifact>,
    pub unit: Option<PackagedUnit>,
}

impl PipelineReport {
    fn new(platform: PlatformId) -> Self {
        PipelineReport {
            platform,
            stages: Vec::new(),
            warnings: Vec::new(),
            planned: Vec::new(),
            staged: Vec::new(),
            unit: None,
        }
    }

    fn warn(&mut self, warnings: Vec<BuildWarning>) {
        for warning in warnings {
            tracing::warn!("{}", warning);
            self.warnings.push(warning.to_string());
        }
    }
}

/// Run one platform's pipeline.
pub fn run_pipeline(ctx: &BuildContext, req: &PipelineRequest) -> Result<PipelineReport, StageError> {
    let platform = resolve_platform(req.platform.as_deref(), &ctx.host, &ctx.catalog)
        .map_err(|e| StageError::new(req.label(ctx), Stage::Resolve, e))?;
    let tag = platform.tag();

    let descriptor = ctx.catalog.lookup(platform).map_err(fail_at(&tag, Stage::Lookup))?;

    let mut report = PipelineReport::new(platform);
    report.stages.extend([Stage::Resolve, Stage::Lookup]);

    let build_dir = ctx.build_dir(platform);
    let compile = CompileOptions {
        install: ctx.install,
        jobs: ctx.jobs,
    };

    if req.dry_run {
        let invoker = CMakeInvoker::new(descriptor, &ctx.host, ctx.cmake.as_deref())
            .unwrap_or_else(|_| CMakeInvoker::with_program(descriptor, &ctx.host, "cmake"));
        let configure = invoker
            .plan_configure(
                &build_dir,
                &ctx.source_dir,
                &ConfigureOptions::from_context(ctx, descriptor),
            )
            .map_err(fail_at(&tag, Stage::Configure))?;
        let mut warnings = Vec::new();
        let configure = configure.drain_into(&mut warnings);
        report.warn(warnings);

        if req.from <= Stage::Configure {
            report.planned.push(configure.display_command());
        }
        if req.from <= Stage::Build {
            report.planned.push(invoker.plan_build(&build_dir, &compile).display_command());
        }
        return Ok(report);
    }

    if req.from <= Stage::Build {
        let invoker = CMakeInvoker::new(descriptor, &ctx.host, ctx.cmake.as_deref())
            .map_err(fail_at(&tag, Stage::Configure))?;

        if req.from <= Stage::Configure {
            if !is_cmake_project(&ctx.source_dir) {
                return Err(StageError::new(
                    &tag,
                    Stage::Configure,
                    anyhow!(
                        "no CMakeLists.txt in {}\nhint: {}",
                        ctx.display_path(&ctx.source_dir),
                        suggestions::NO_CMAKE_PROJECT
                    ),
                ));
            }

            let outcome = invoker
                .configure(
                    &build_dir,
                    &ctx.source_dir,
                    &ConfigureOptions::from_context(ctx, descriptor),
                )
                .map_err(fail_at(&tag, Stage::Configure))?;
            report.warnings.extend(outcome.warnings.iter().map(|w| w.to_string()));
            report.stages.push(Stage::Configure);
        } else if !build_dir.is_dir() {
            return Err(StageError::new(
                &tag,
                Stage::Build,
                anyhow!(
                    "build directory {} does not exist; resume from `configure` instead",
                    ctx.display_path(&build_dir)
                ),
            ));
        }

        invoker.build(&build_dir, &compile).map_err(fail_at(&tag, Stage::Build))?;
        report.stages.push(Stage::Build);
    }

    let staging_dir = ctx.staging_dir(platform);
    let staged = if req.from <= Stage::Stage {
        let outcome = stage(
            &build_dir,
            platform,
            &StageOptions::new(&ctx.project.library, &staging_dir),
        )
        .map_err(fail_at(&tag, Stage::Stage))?;
        report.stages.push(Stage::Stage);
        report.warnings.extend(outcome.warnings.iter().map(|w| w.to_string()));
        outcome.value
    } else {
        load_staged(&staging_dir, platform, &ctx.project.library).map_err(fail_at(&tag, Stage::Package))?
    };

    let revision = SourceRevision::detect(&ctx.project_root, &ctx.revision);
    let unit = package(
        platform,
        &staged,
        &revision,
        &PackageOptions::new(ctx.project.clone(), &ctx.output_dir),
    )
    .map_err(fail_at(&tag, Stage::Package))?;
    report.stages.push(Stage::Package);

    report.staged = staged;
    report.unit = Some(unit);
    Ok(report)
}

/// Drop requests that name the same platform twice, keeping the first.
///
/// Requests that do not parse are kept so their errors are reported.
fn dedupe(requests: &[PipelineRequest]) -> Vec<&PipelineRequest> {
    let mut seen = BTreeSet::new();
    requests
        .iter()
        .filter(|req| match req.platform.as_deref().map(str::parse::<PlatformId>) {
            Some(Ok(platform)) => {
                let fresh = seen.insert(platform);
                if !fresh {
                    tracing::warn!("platform `{}` requested more than once; building it once", platform);
                }
                fresh
            }
            _ => true,
        })
        .collect()
}

/// Run several platform pipelines.
///
/// A failure in one platform never stops the others; every result is
/// returned in request order.
pub fn run_pipelines(
    ctx: &BuildContext,
    requests: &[PipelineRequest],
    parallel: bool,
) -> Vec<Result<PipelineReport, StageError>> {
    let requests = dedupe(requests);

    if parallel && requests.len() > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(requests.len())
            .build()
        {
            Ok(pool) => {
                tracing::info!("Building {} platforms in parallel", requests.len());
                return pool.install(|| {
                    requests
                        .par_iter()
                        .map(|req| run_pipeline(ctx, req))
                        .collect()
                });
            }
            Err(e) => tracing::warn!("falling back to sequential builds: {}", e),
        }
    }

    requests.iter().map(|req| run_pipeline(ctx, req)).collect()
}

/// Summarize a set of pipeline results, failing if any platform failed.
pub fn check_results(results: &[Result<PipelineReport, StageError>]) -> Result<()> {
    let failed: Vec<&str> = results
        .iter()
        .filter_map(|r| r.as_ref().err().map(|e| e.platform.as_str()))
        .collect();

    if !failed.is_empty() {
        bail!(
            "{} of {} platform{} failed: {}",
            failed.len(),
            results.len(),
            if results.len() == 1 { "" } else { "s" },
            failed.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::HostInfo;
    use crate::util::config::Config;
    use std::path::Path;
    use tempfile::TempDir;

    fn context(root: &Path, host: HostInfo) -> BuildContext {
        BuildContext::new(root, &Config::default(), host).unwrap()
    }

    #[test]
    fn test_stage_order_and_parsing() {
        assert!(Stage::Resolve < Stage::Configure);
        assert!(Stage::Stage < Stage::Package);
        assert_eq!("build".parse::<Stage>().unwrap(), Stage::Build);
        assert_eq!("Package".parse::<Stage>().unwrap(), Stage::Package);
        assert!("resolve".parse::<Stage>().is_err());
        assert!("deploy".parse::<Stage>().is_err());
    }

    #[test]
    fn test_unsupported_override_fails_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));

        let err = run_pipeline(&ctx, &PipelineRequest::new(Some("solaris-sparc".to_string())))
            .unwrap_err();

        assert_eq!(err.stage, Stage::Resolve);
        assert_eq!(err.platform, "solaris-sparc");
        assert!(matches!(
            err.build_error(),
            Some(BuildError::UnsupportedPlatform { token }) if token == "solaris"
        ));
        assert!(!ctx.build_root.exists());
    }

    #[test]
    fn test_unknown_host_reports_host_label() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), HostInfo::new("freebsd", "x86_64"));

        let err = run_pipeline(&ctx, &PipelineRequest::new(None)).unwrap_err();
        assert_eq!(err.stage, Stage::Resolve);
        assert_eq!(err.platform, "freebsd-x86_64");
    }

    #[test]
    fn test_dry_run_plans_commands() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));

        let report = run_pipeline(
            &ctx,
            &PipelineRequest::new(Some("windows-x86_64".to_string())).dry_run(true),
        )
        .unwrap();

        assert_eq!(report.planned.len(), 2);
        assert!(report.planned[0].contains("-A x64"));
        assert!(report.planned[0].contains("-DOUTPUT_NAME_SUFFIX=windows-x86_64"));
        assert!(report.planned[1].contains("--build"));
        assert!(!report.planned[1].contains("--parallel"));
        // Toolchain files are absent in this project.
        assert_eq!(report.warnings.len(), 1);
        assert!(report.unit.is_none());
        assert!(!ctx.build_dir(report.platform).exists());
    }

    #[test]
    fn test_resume_at_package_uses_staging_dir() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));
        let platform: PlatformId = "linux-x86_64".parse().unwrap();

        crate::test_support::write_files(
            &ctx.staging_dir(platform),
            &[("libwebrtc-java-linux-x86_64.so", "elf")],
        );

        let report = run_pipeline(
            &ctx,
            &PipelineRequest::new(Some("linux-x86_64".to_string())).from_stage(Stage::Package),
        )
        .unwrap();

        assert_eq!(
            report.stages,
            [Stage::Resolve, Stage::Lookup, Stage::Package]
        );
        let unit = report.unit.unwrap();
        assert!(unit.path.ends_with("build/libs/webrtc-java-0.1.0-linux-x86_64.jar"));
    }

    #[test]
    fn test_resume_at_build_requires_build_dir() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));
        ctx.cmake = Some(tmp.path().join("cmake"));
        std::fs::write(tmp.path().join("cmake"), "").unwrap();

        let err = run_pipeline(
            &ctx,
            &PipelineRequest::new(Some("linux-x86_64".to_string())).from_stage(Stage::Build),
        )
        .unwrap_err();
        assert_eq!(err.stage, Stage::Build);
        assert!(format!("{:#}", err.source).contains("resume from `configure`"));
    }

    #[test]
    fn test_stage_error_diagnostic_has_resume_hint() {
        let err = StageError::new(
            "linux-x86_64",
            Stage::Build,
            BuildError::NativeBuildFailure {
                step: crate::core::errors::NativeStep::Build,
                command: "cmake --build out".to_string(),
                code: Some(2),
            },
        );

        let output = err.to_diagnostic().format(false);
        assert!(output.starts_with("error: build stage failed for `linux-x86_64`"));
        assert!(output.contains("exit code 2"));
        assert!(output.contains("--from build"));
    }

    #[test]
    fn test_duplicate_requests_run_once() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));

        let requests = vec![
            PipelineRequest::new(Some("linux-x86_64".to_string())).dry_run(true),
            PipelineRequest::new(Some("linux_amd64".to_string())).dry_run(true),
            PipelineRequest::new(Some("bogus".to_string())).dry_run(true),
        ];
        let results = run_pipelines(&ctx, &requests, false);

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(check_results(&results).is_err());
    }

    #[cfg(unix)]
    mod end_to_end {
        use super::*;
        use crate::test_support::assertions::assert_error_contains;
        use crate::test_support::fixtures::{cmake_project, recorded_args, FakeCmake};

        fn scripted_context(root: &Path, cmake: FakeCmake) -> BuildContext {
            cmake_project(root);
            let mut ctx = context(root, HostInfo::new("linux", "x86_64"));
            ctx.cmake = Some(cmake.install(&root.join("bin")));
            ctx
        }

        #[test]
        fn test_full_pipeline_produces_unit() {
            let tmp = TempDir::new().unwrap();
            let ctx = scripted_context(
                tmp.path(),
                FakeCmake::producing(&[
                    "lib/libwebrtc-java-linux-x86_64.so",
                    "CMakeFiles/libwebrtc-java-linux-x86_64.so",
                    "lib/libwebrtc-java-linux-x86_64.a",
                ]),
            );

            let report =
                run_pipeline(&ctx, &PipelineRequest::new(Some("linux-x86_64".to_string())))
                    .unwrap();

            assert!(report.warnings.is_empty());
            assert_eq!(report.stages.len(), 6);
            assert_eq!(report.staged.len(), 1);
            assert_eq!(report.staged[0].file_name, "libwebrtc-java-linux-x86_64.so");

            let build_dir = ctx.build_dir(report.platform);
            let configure = recorded_args(&build_dir, "configure").unwrap();
            assert!(configure.contains("-DCMAKE_TOOLCHAIN_FILE="));
            assert!(configure.contains("-DWEBRTC_BRANCH=main"));
            let build = recorded_args(&build_dir, "build").unwrap();
            assert!(build.contains("--parallel"));

            let unit = report.unit.unwrap();
            assert!(unit.path.is_file());
            assert_eq!(unit.classifier, "linux-x86_64");
        }

        #[test]
        fn test_install_build_stages_each_library_once() {
            let tmp = TempDir::new().unwrap();
            let mut ctx = scripted_context(
                tmp.path(),
                FakeCmake::producing(&[
                    "lib/libwebrtc-java-linux-x86_64.so",
                    "install/lib/libwebrtc-java-linux-x86_64.so",
                ]),
            );
            ctx.install = true;

            let report =
                run_pipeline(&ctx, &PipelineRequest::new(Some("linux-x86_64".to_string())))
                    .unwrap();

            assert!(report.warnings.is_empty(), "{:?}", report.warnings);
            assert_eq!(report.staged.len(), 1);
            assert!(report.staged[0].source.ends_with("lib/libwebrtc-java-linux-x86_64.so"));
            assert!(!report.staged[0]
                .source
                .to_string_lossy()
                .contains("/install/"));
            let build = recorded_args(&ctx.build_dir(report.platform), "build").unwrap();
            assert!(build.contains("--target install"));
        }

        #[test]
        fn test_missing_toolchain_warns_and_builds_natively() {
            let tmp = TempDir::new().unwrap();
            let ctx = scripted_context(
                tmp.path(),
                FakeCmake::producing(&["libwebrtc-java-linux-aarch64.so"]),
            );

            let report =
                run_pipeline(&ctx, &PipelineRequest::new(Some("linux-aarch64".to_string())))
                    .unwrap();

            assert_eq!(report.warnings.len(), 1);
            assert!(report.warnings[0].contains("toolchain file"));
            let configure = recorded_args(&ctx.build_dir(report.platform), "configure").unwrap();
            assert!(!configure.contains("CMAKE_TOOLCHAIN_FILE"));
            assert!(report.unit.is_some());
        }

        #[test]
        fn test_build_failure_stops_before_staging() {
            let tmp = TempDir::new().unwrap();
            let ctx = scripted_context(tmp.path(), FakeCmake::failing_in("build"));
            let platform: PlatformId = "linux-x86_64".parse().unwrap();

            let err = run_pipeline(&ctx, &PipelineRequest::new(Some(platform.tag())))
                .unwrap_err();

            assert_eq!(err.stage, Stage::Build);
            assert!(matches!(
                err.build_error(),
                Some(BuildError::NativeBuildFailure { code: Some(2), .. })
            ));
            assert!(ctx.build_dir(platform).is_dir());
            assert!(!ctx.staging_dir(platform).exists());
            assert!(!ctx.output_dir.exists());
        }

        #[test]
        fn test_no_libraries_is_reported_at_stage() {
            let tmp = TempDir::new().unwrap();
            let ctx = scripted_context(tmp.path(), FakeCmake::producing(&["lib/libother.so"]));

            let err = run_pipeline(&ctx, &PipelineRequest::new(Some("linux-x86_64".to_string())))
                .unwrap_err();
            assert_eq!(err.stage, Stage::Stage);
            assert!(matches!(
                err.build_error(),
                Some(BuildError::NoArtifactsProduced { .. })
            ));
        }

        #[test]
        fn test_failure_is_isolated_per_platform() {
            let tmp = TempDir::new().unwrap();
            let ctx = scripted_context(
                tmp.path(),
                FakeCmake::producing(&["lib/libwebrtc-java-linux-x86_64.so"]),
            );

            let requests = vec![
                PipelineRequest::new(Some("linux-x86_64".to_string())),
                PipelineRequest::new(Some("windows-arm32".to_string())),
            ];
            let results = run_pipelines(&ctx, &requests, true);

            assert_eq!(results.len(), 2);
            assert!(results[0].is_ok());
            assert_eq!(results[1].as_ref().unwrap_err().stage, Stage::Resolve);
        }

        #[test]
        fn test_missing_source_dir() {
            let tmp = TempDir::new().unwrap();
            let mut ctx = context(tmp.path(), HostInfo::new("linux", "x86_64"));
            ctx.cmake = Some(FakeCmake::default().install(&tmp.path().join("bin")));

            let result = run_pipeline(&ctx, &PipelineRequest::new(Some("linux-x86_64".to_string())))
                .map_err(|e| e.source);
            assert_error_contains(result, "no CMakeLists.txt");
        }
    }
}
