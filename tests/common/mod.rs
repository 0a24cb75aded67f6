//! Common test utilities for spyglass integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch
//! the user's `~/.local/share/spyglass/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `sg()` method returns a `Command` that sets `SPYGLASS_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated data directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the sg binary with isolated data directory.
    pub fn sg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sg"));
        cmd.env("SPYGLASS_DATA_DIR", self.data_dir.path());
        cmd.env_remove("SPYGLASS_GITHUB_TOKEN");
        cmd.env_remove("SPYGLASS_OWNER");
        cmd.env_remove("SPYGLASS_CATALOG");
        cmd
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
