//! Subprocess execution for the cmake steps.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};

/// Environment variable naming the cmake executable.
pub const CMAKE_ENV: &str = "WEBRTC_NATIVES_CMAKE";

/// A command line that can be displayed, wrapped and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Run this command through a prefix such as `arch -x86_64`.
    ///
    /// The wrapper's first element becomes the program; the wrapped program
    /// and its arguments follow the wrapper's own arguments.
    pub fn wrapped(self, wrapper: Option<&[String]>) -> Self {
        let Some((program, prefix)) = wrapper.and_then(|w| w.split_first()) else {
            return self;
        };

        ProcessBuilder::new(program)
            .args(prefix)
            .arg(&self.program)
            .args(self.args)
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Run with captured output; used for short probes.
    pub fn exec(&self) -> Result<Output> {
        self.command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))
    }

    /// Run with inherited stdio so cmake output streams to the terminal.
    pub fn status(&self) -> Result<ExitStatus> {
        self.command()
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// The command line as a user could paste it into a shell.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Locate cmake.
///
/// Checks the configured path first, then `WEBRTC_NATIVES_CMAKE`, then PATH.
pub fn find_cmake(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }

    match std::env::var(CMAKE_ENV) {
        Ok(cmake) if !cmake.is_empty() => Some(PathBuf::from(cmake)),
        _ => which::which("cmake").ok(),
    }
}

/// Number of logical CPUs on the host.
pub fn logical_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
