//! packaging
//!
//! The packaging tool that turns a packaging tree into a prepared tree.
//!
//! # Architecture
//!
//! The pipeline only needs one thing from the packaging tool: unpack the
//! upstream sources and apply the carried patches, one commit per patch,
//! under the packaging tree. [`PackagingTool`] is that seam; [`Fedpkg`]
//! runs `fedpkg --path <dir> prep`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Errors from the packaging tool.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// The tool could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and failed.
    #[error("{tool} prep failed: {stderr}")]
    Failed { tool: String, stderr: String },
}

/// Materializes the prepared tree inside a packaging tree.
pub trait PackagingTool {
    /// Short name of the tool, for logs.
    fn name(&self) -> &str;

    /// Prepare the sources of the packaging tree at `pkg_dir`.
    fn prep(&self, pkg_dir: &Path) -> Result<(), PackagingError>;
}

/// `fedpkg prep`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fedpkg {
    binary: String,
}

impl Fedpkg {
    /// Use `binary` as the fedpkg executable.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for preparing `pkg_dir`. `--path` is a global option and
    /// goes before the subcommand.
    pub fn prep_args(pkg_dir: &Path) -> Vec<OsString> {
        vec!["--path".into(), pkg_dir.as_os_str().to_owned(), "prep".into()]
    }
}

impl Default for Fedpkg {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_FEDPKG)
    }
}

impl PackagingTool for Fedpkg {
    fn name(&self) -> &str {
        &self.binary
    }

    fn prep(&self, pkg_dir: &Path) -> Result<(), PackagingError> {
        debug!(tool = %self.binary, dir = %pkg_dir.display(), "preparing packaging tree");

        let output = Command::new(&self.binary)
            .args(Self::prep_args(pkg_dir))
            .current_dir(pkg_dir)
            .output()
            .map_err(|source| PackagingError::Spawn {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PackagingError::Failed {
                tool: self.binary.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
