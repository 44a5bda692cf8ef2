//! Fatal error reports for the terminal.
//!
//! A report names what failed, where it failed, and what to try next.

use std::fmt;
use std::path::PathBuf;

/// Hints shared between error sites.
pub mod suggestions {
    pub const BUILD_FAILED: &str = "Run `webrtc-natives build --verbose` for the full cmake command";

    pub const LIST_PLATFORMS: &str = "Run `webrtc-natives platform --list` to see supported platforms";

    pub const NO_CMAKE_PROJECT: &str =
        "Set `build.source_dir` in natives.toml to the directory containing CMakeLists.txt";
}

const RED: &str = "\x1b[1;31m";
const GREEN: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

/// An error with context lines and numbered hints.
#[derive(Debug, Clone, Default)]
pub struct Diagnostic {
    pub message: String,
    /// Indented `= ...` lines under the message
    pub context: Vec<String>,
    pub suggestions: Vec<String>,
    /// Directory or file the error concerns
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for stderr, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, label: &str| {
            if color {
                format!("{}{}{}", code, label, RESET)
            } else {
                label.to_string()
            }
        };

        let mut out = format!("{}: {}\n", paint(RED, "error"), self.message);

        if let Some(ref path) = self.location {
            out.push_str(&format!("  --> {}\n", path.display()));
        }
        for line in &self.context {
            out.push_str(&format!("  = {}\n", line));
        }

        if !self.suggestions.is_empty() {
            out.push_str(&format!("\n{}: consider:\n", paint(GREEN, "help")));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
