//! `webrtc-natives stage` command

use std::path::Path;

use anyhow::{bail, Result};

use super::{load_context, resolve};
use crate::cli::StageArgs;
use natives::ops::{stage, StageOptions};
use natives::util::fs::resolve_path;

pub fn execute(args: StageArgs, config: Option<&Path>) -> Result<()> {
    let ctx = load_context(config)?;
    let platform = resolve(&ctx, args.platform.as_deref())?;

    let build_dir = args.build_dir.unwrap_or_else(|| ctx.build_dir(platform));
    let output = args.output.unwrap_or_else(|| ctx.staging_dir(platform));
    if resolve_path(&ctx.project_root)?.starts_with(resolve_path(&output)?) {
        bail!(
            "staging directory {} must not contain the project root",
            output.display()
        );
    }

    let outcome = stage(
        &build_dir,
        platform,
        &StageOptions::new(&ctx.project.library, &output),
    )?;

    for artifact in &outcome.value {
        eprintln!(
            "      Staged {} -> {}",
            ctx.display_path(&artifact.source),
            artifact.file_name
        );
    }
    eprintln!(
        "    Finished {} librar{} in {}",
        outcome.value.len(),
        if outcome.value.len() == 1 { "y" } else { "ies" },
        ctx.display_path(&output)
    );

    Ok(())
}
