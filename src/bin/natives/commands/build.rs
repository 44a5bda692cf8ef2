//! `webrtc-natives build` command

use std::path::Path;

use anyhow::Result;

use super::load_context;
use crate::cli::BuildArgs;
use natives::ops::{check_results, run_pipelines, PipelineRequest, Stage};
use natives::util::diagnostic::emit;

pub fn execute(args: BuildArgs, config: Option<&Path>, color: bool) -> Result<()> {
    let mut ctx = load_context(config)?;

    // CLI overrides config
    ctx.install |= args.install;
    if args.jobs.is_some() {
        ctx.jobs = args.jobs;
    }
    if let Some(revision) = args.revision {
        ctx.revision = revision;
    }
    if let Some(policy) = args.missing_toolchain {
        ctx.missing_toolchain = policy;
    }

    let platforms: Vec<Option<String>> = if args.all {
        ctx.catalog.platforms().map(|p| Some(p.tag())).collect()
    } else if args.platforms.is_empty() {
        vec![None]
    } else {
        args.platforms.into_iter().map(Some).collect()
    };

    let from = args.from.unwrap_or(Stage::Configure);
    let requests: Vec<PipelineRequest> = platforms
        .into_iter()
        .map(|p| PipelineRequest::new(p).from_stage(from).dry_run(args.dry_run))
        .collect();

    let results = run_pipelines(&ctx, &requests, args.parallel);

    for result in &results {
        match result {
            Ok(report) if args.dry_run => {
                println!("# {}", report.platform);
                for command in &report.planned {
                    println!("{}", command);
                }
            }
            Ok(report) => {
                if let Some(ref unit) = report.unit {
                    eprintln!(
                        "    Finished {} ({} librar{}) -> {}",
                        report.platform,
                        unit.artifacts.len(),
                        if unit.artifacts.len() == 1 { "y" } else { "ies" },
                        ctx.display_path(&unit.path)
                    );
                }
                for warning in &report.warnings {
                    eprintln!("             warning: {}", warning);
                }
            }
            Err(e) => emit(&e.to_diagnostic(), color),
        }
    }

    check_results(&results)
}
