//! Command implementations

pub mod aggregate;
pub mod build;
pub mod clean;
pub mod completions;
pub mod package;
pub mod platform;
pub mod stage;

use std::path::Path;

use anyhow::{bail, Context, Result};

use natives::builder::BuildContext;
use natives::core::host::{resolve_platform, HostInfo};
use natives::core::PlatformId;
use natives::util::config::{global_config_path, load_config, PROJECT_CONFIG_NAME};

/// Build the context for the project in the current directory.
///
/// An explicit `--config` must exist; the implicit `natives.toml` is optional.
pub fn load_context(config: Option<&Path>) -> Result<BuildContext> {
    let root = std::env::current_dir().context("failed to determine current directory")?;

    let project_config = match config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => root.join(PROJECT_CONFIG_NAME),
    };

    let config = load_config(global_config_path().as_deref(), &project_config)?;
    BuildContext::new(&root, &config, HostInfo::probe())
}

/// Resolve the target platform for a single-platform command.
pub fn resolve(ctx: &BuildContext, platform: Option<&str>) -> Result<PlatformId> {
    Ok(resolve_platform(platform, &ctx.host, &ctx.catalog)?)
}
