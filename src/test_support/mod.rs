//! Test utilities for unit tests.
//!
//! Only compiled for tests. Provides fixture build trees and a scripted
//! `cmake` so pipeline tests never need a real toolchain.

pub mod fixtures;

pub use fixtures::*;

/// Assertion helpers for testing.
pub mod assertions {
    use crate::core::errors::BuildError;

    /// Assert that an error message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: Result<T, anyhow::Error>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }

    /// Extract the `BuildError` at the root of an error chain.
    pub fn build_error(err: &anyhow::Error) -> &BuildError {
        err.chain()
            .find_map(|e| e.downcast_ref::<BuildError>())
            .unwrap_or_else(|| panic!("expected a BuildError, got: {:#}", err))
    }
}
