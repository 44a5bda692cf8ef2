//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use natives::core::host::PLATFORM_ENV;
use natives::ops::Stage;
use natives::util::config::MissingToolchainPolicy;

/// webrtc-natives - build and package the native webrtc-java libraries
#[derive(Parser)]
#[command(name = "webrtc-natives")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project configuration file (defaults to ./natives.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the host and the resolved target platform
    Platform(PlatformArgs),

    /// Configure, build, stage and package one or more platforms
    Build(BuildArgs),

    /// Stage the libraries of an existing build directory
    Stage(StageArgs),

    /// Stage and package an existing build directory
    Package(PackageArgs),

    /// Collect packaged units and write a release index
    Aggregate(AggregateArgs),

    /// Remove build, staging and package outputs
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct PlatformArgs {
    /// Target platform override (e.g. linux-x86_64)
    #[arg(short, long, env = PLATFORM_ENV)]
    pub platform: Option<String>,

    /// List every supported platform
    #[arg(long)]
    pub list: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target platforms (defaults to the host)
    #[arg(short, long = "platform", env = PLATFORM_ENV, value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Build every supported platform (ignores --platform)
    #[arg(long)]
    pub all: bool,

    /// Resume at this stage (configure, build, stage, package)
    #[arg(long, value_name = "STAGE")]
    pub from: Option<Stage>,

    /// Build the install target
    #[arg(long)]
    pub install: bool,

    /// Number of parallel compile jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// WebRTC branch to build
    #[arg(long)]
    pub revision: Option<String>,

    /// What to do when a toolchain file is missing (warn, error)
    #[arg(long, value_name = "POLICY")]
    pub missing_toolchain: Option<MissingToolchainPolicy>,

    /// Print the cmake commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Build several platforms concurrently
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Args)]
pub struct StageArgs {
    /// Target platform (defaults to the host)
    #[arg(short, long, env = PLATFORM_ENV)]
    pub platform: Option<String>,

    /// Build directory to stage from (defaults to <build_root>/<platform>)
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Staging directory (defaults to <build_root>/staging/<platform>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PackageArgs {
    /// Target platform (defaults to the host)
    #[arg(short, long, env = PLATFORM_ENV)]
    pub platform: Option<String>,

    /// Build directory to package (defaults to <build_root>/<platform>)
    #[arg(long)]
    pub build_dir: Option<PathBuf>,

    /// Directory for the packaged unit (defaults to build.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct AggregateArgs {
    /// Directory holding the downloaded units (defaults to build.output_dir)
    pub dir: Option<PathBuf>,

    /// Release version (defaults to project.version)
    #[arg(long)]
    pub version: Option<String>,

    /// Only list the units; don't write natives-index.json
    #[arg(long)]
    pub no_index: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Only clean this platform
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Also remove packaged units
    #[arg(long, conflicts_with = "platform")]
    pub all: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
