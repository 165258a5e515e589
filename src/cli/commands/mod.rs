//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves what it needs from the configuration
//! 2. Calls the engine or the build system
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that talk to the hub (build, listen) are async. Each builds a
//! tokio runtime and blocks on its async implementation.

mod build;
mod extract;
mod listen;
mod resolve;

pub use build::build;
pub use extract::extract;
pub use listen::listen;
pub use resolve::resolve;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::ops::WorkTreeLock;
use crate::engine::reconstruct::AuxiliaryFiles;
use crate::engine::PipelineSettings;
use crate::git::Git;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Build { build, no_fetch } => build::build(ctx, &build, !no_fetch),
        Command::Listen { no_fetch } => listen::listen(ctx, !no_fetch),
        Command::Resolve { spec, gitrev } => resolve::resolve(ctx, &spec, gitrev.as_deref()),
        Command::Extract {
            prepared_tree,
            stable_update,
            output,
        } => extract::extract(ctx, &prepared_tree, stable_update, output.as_deref()),
    }
}

/// The two repositories a pipeline run works on.
pub(crate) struct Trees {
    pub packaging: Git,
    pub upstream: Git,
}

impl Trees {
    pub fn open(ctx: &Context) -> Result<Self> {
        let pkg_dir = ctx.config.pkg_git_dir()?;
        let linux_dir = ctx.config.linux_git_dir()?;
        let packaging = Git::open(pkg_dir)
            .with_context(|| format!("cannot open packaging tree {}", pkg_dir.display()))?;
        let upstream = Git::open(linux_dir)
            .with_context(|| format!("cannot open upstream tree {}", linux_dir.display()))?;
        Ok(Self {
            packaging,
            upstream,
        })
    }

    /// Take the working-tree lock on the upstream repository.
    pub fn lock(&self) -> Result<WorkTreeLock> {
        Ok(WorkTreeLock::acquire(self.upstream.git_dir())?)
    }
}

/// Pipeline settings from configuration.
pub(crate) fn pipeline_settings(ctx: &Context, fetch: bool) -> PipelineSettings {
    let config = &ctx.config;
    PipelineSettings {
        package: config.package().to_string(),
        arch: config.arch().to_string(),
        auxiliary: config.auxiliary_dir().map(|source| AuxiliaryFiles {
            source,
            dest: config.auxiliary_dest().to_path_buf(),
        }),
        require_patches: config.require_patches(),
        fetch,
    }
}
