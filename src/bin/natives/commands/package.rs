//! `webrtc-natives package` command

use std::path::Path;

use anyhow::Result;

use super::{load_context, resolve};
use crate::cli::PackageArgs;
use natives::core::SourceRevision;
use natives::ops::{package, stage, PackageOptions, StageOptions};

pub fn execute(args: PackageArgs, config: Option<&Path>) -> Result<()> {
    let ctx = load_context(config)?;
    let platform = resolve(&ctx, args.platform.as_deref())?;

    let build_dir = args.build_dir.unwrap_or_else(|| ctx.build_dir(platform));
    let output = args.output.unwrap_or_else(|| ctx.output_dir.clone());

    let staged = stage(
        &build_dir,
        platform,
        &StageOptions::new(&ctx.project.library, ctx.staging_dir(platform)),
    )?;

    let revision = SourceRevision::detect(&ctx.project_root, &ctx.revision);
    let unit = package(
        platform,
        &staged.value,
        &revision,
        &PackageOptions::new(ctx.project.clone(), output),
    )?;

    eprintln!("   Packaged {}", ctx.display_path(&unit.path));
    println!("{}  {}", unit.sha256, unit.path.display());

    Ok(())
}
