//! `webrtc-natives aggregate` command

use std::path::Path;

use anyhow::Result;

use super::load_context;
use crate::cli::AggregateArgs;
use natives::ops::{collect_units, write_index, AggregateOptions};

pub fn execute(args: AggregateArgs, config: Option<&Path>) -> Result<()> {
    let ctx = load_context(config)?;

    let dir = args.dir.unwrap_or_else(|| ctx.output_dir.clone());
    let opts = AggregateOptions {
        library: ctx.project.library.clone(),
        version: args
            .version
            .unwrap_or_else(|| ctx.project.version.to_string()),
    };

    let index = collect_units(&dir, &opts)?;

    for unit in &index.units {
        println!("{:<16} {}", unit.classifier, unit.file);
    }

    if !args.no_index {
        let path = write_index(&dir, &index)?;
        eprintln!("       Wrote {}", ctx.display_path(&path));
    }

    Ok(())
}
