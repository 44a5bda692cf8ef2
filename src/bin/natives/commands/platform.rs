//! `webrtc-natives platform` command

use std::path::Path;

use anyhow::Result;

use super::{load_context, resolve};
use crate::cli::PlatformArgs;
use natives::builder::{BuildContext, ToolchainDescriptor};

pub fn execute(args: PlatformArgs, config: Option<&Path>) -> Result<()> {
    let ctx = load_context(config)?;

    if args.list {
        list_platforms(&ctx);
        return Ok(());
    }

    let platform = resolve(&ctx, args.platform.as_deref())?;
    let descriptor = ctx.catalog.lookup(platform)?;

    println!("Host:       {}-{}", ctx.host.os, ctx.host.arch);
    println!("Platform:   {}", platform);
    println!("Classifier: {}", platform.classifier());
    println!("Module:     {}", ctx.project.module_name(platform));
    println!("Package:    {}", ctx.project.package_file_name(platform));
    println!();
    print_descriptor(&ctx, descriptor);

    Ok(())
}

fn print_descriptor(ctx: &BuildContext, descriptor: &ToolchainDescriptor) {
    let toolchain = descriptor.toolchain_path(&ctx.toolchain_dir);
    println!("Toolchain:");
    println!(
        "  File:      {} ({})",
        ctx.display_path(&toolchain),
        if toolchain.is_file() { "found" } else { "missing" }
    );
    if let Some(ref generator) = descriptor.generator {
        println!("  Generator: {}", generator);
    }
    if let Some(ref arch) = descriptor.architecture {
        println!("  Arch:      {}", arch);
    }
    if let Some(wrapper) = descriptor.wrapper_for(&ctx.host) {
        println!("  Wrapper:   {}", wrapper.join(" "));
    }
}

fn list_platforms(ctx: &BuildContext) {
    let host = ctx.host.platform().ok();

    println!("Supported platforms:");
    for descriptor in ctx.catalog.descriptors() {
        let marker = if Some(descriptor.platform) == host {
            " (host)"
        } else {
            ""
        };
        let toolchain = descriptor.toolchain_path(&ctx.toolchain_dir);
        println!(
            "  {:<16} {}{}",
            descriptor.platform.tag(),
            toolchain
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            marker
        );
    }
}
