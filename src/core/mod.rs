//! Core data types: platforms, host probing, package identity and errors.

pub mod errors;
pub mod host;
pub mod manifest;
pub mod platform;

pub use errors::{BuildError, BuildWarning, NativeStep, Outcome};
pub use host::{resolve_platform, HostInfo, PLATFORM_ENV};
pub use manifest::{JarManifest, ProjectIdentity, SourceRevision};
pub use platform::{Arch, OsFamily, PlatformId};
