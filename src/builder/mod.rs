//! Native build driver.
//!
//! The toolchain catalog, the per-run build context, and CMake invocation.

pub mod cmake;
pub mod context;
pub mod toolchain;

pub use cmake::{CMakeInvoker, CompileOptions, ConfigureOptions};
pub use context::BuildContext;
pub use toolchain::{ToolchainCatalog, ToolchainDescriptor};
