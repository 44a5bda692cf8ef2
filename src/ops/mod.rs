//! High-level operations.
//!
//! This module contains the implementation of the webrtc-natives commands.

pub mod aggregate;
pub mod package;
pub mod pipeline;
pub mod stage;

pub use aggregate::{collect_units, write_index, AggregateOptions, NativesIndex};
pub use package::{package, PackageOptions, PackagedUnit};
pub use pipeline::{
    check_results, run_pipeline, run_pipelines, PipelineReport, PipelineRequest, Stage,
    StageError,
};
pub use stage::{output_file_name, stage, LibraryKind, StageOptions, StagedArtifact};
