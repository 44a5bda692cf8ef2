//! `webrtc-natives clean` command

use std::path::Path;

use anyhow::Result;

use super::{load_context, resolve};
use crate::cli::CleanArgs;
use natives::util::fs::remove_dir_all_if_exists;

pub fn execute(args: CleanArgs, config: Option<&Path>) -> Result<()> {
    let ctx = load_context(config)?;

    let mut targets = Vec::new();
    if let Some(ref raw) = args.platform {
        let platform = resolve(&ctx, Some(raw))?;
        targets.push(ctx.build_dir(platform));
        targets.push(ctx.staging_dir(platform));
    } else {
        targets.push(ctx.build_root.clone());
        if args.all {
            targets.push(ctx.output_dir.clone());
        }
    }

    for dir in targets {
        if dir.exists() {
            remove_dir_all_if_exists(&dir)?;
            eprintln!("     Removed {}", ctx.display_path(&dir));
        }
    }

    Ok(())
}
