//! webrtc-natives - builds and packages the native half of webrtc-java
//!
//! This crate resolves the target platform, drives CMake with the matching
//! toolchain, stages the produced shared libraries and packages them into a
//! classifier JAR per platform.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for unit tests.
///
/// Only available when compiling with `--cfg test`. Provides fixture build
/// trees and a scripted stand-in for `cmake`.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildContext, ToolchainCatalog};
pub use core::{BuildError, HostInfo, PlatformId};
pub use ops::{PipelineReport, PipelineRequest, Stage, StageError};
