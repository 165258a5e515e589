//! engine::pipeline
//!
//! One build, end to end.
//!
//! ```text
//! build identity
//!   -> branch mapping          (retired distributions stop here)
//!   -> packaging tree at the build's commit, prepared by the packaging tool
//!   -> version metadata        (package description)
//!   -> base reference          (tag or stored commit)
//!   -> patch set               (prepared tree history)
//!   -> reconstructed, tagged upstream tree
//! ```
//!
//! The pipeline does not lock anything; callers run one build at a time.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::extract::{ExtractError, PatchSet, PatchStackExtractor};
use super::reconstruct::{AuxiliaryFiles, ReconstructError, ReconstructedTree, TreeReconstructor};
use crate::buildsys::BuildIdentity;
use crate::core::paths::prepared_tree_dir;
use crate::core::types::{BranchName, NvrTag, Oid};
use crate::git::{Git, GitError};
use crate::kernel::base::read_gitrev;
use crate::kernel::{
    branch_for_build, resolve, BaseReference, BranchError, BranchMapping, ResolveError, SpecError,
    VersionMetadata,
};
use crate::packaging::{PackagingError, PackagingTool};

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("failed to write patch file: {0}")]
    PatchFile(#[source] std::io::Error),
}

/// How a build ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Reconstructed {
        tree: ReconstructedTree,
        /// The patch series, kept for inspection
        patch_file: PathBuf,
    },
    /// The build's distribution is retired.
    Skipped { nvr: NvrTag, suffix: String },
}

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Package name; the description is `<package>.spec`
    pub package: String,
    /// Architecture of the prepared tree
    pub arch: String,
    /// Distribution files to commit after the patches
    pub auxiliary: Option<AuxiliaryFiles>,
    /// Fail on builds without carried patches
    pub require_patches: bool,
    /// Update remotes before checking out
    pub fetch: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            package: crate::core::config::DEFAULT_PACKAGE.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            auxiliary: None,
            require_patches: false,
            fetch: true,
        }
    }
}

/// Builds exploded trees from packaging builds.
pub struct Pipeline<'a> {
    packaging: &'a Git,
    upstream: &'a Git,
    tool: &'a dyn PackagingTool,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        packaging: &'a Git,
        upstream: &'a Git,
        tool: &'a dyn PackagingTool,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            packaging,
            upstream,
            tool,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Reconstruct the exploded tree for one build.
    pub fn create_tree(&self, build: &BuildIdentity) -> Result<PipelineOutcome, PipelineError> {
        let nvr = &build.nvr;
        info!(nvr = %nvr, commit = %build.dist_git_commit.short(12), "creating tree");

        let (packaging_branch, integration_branch) = match branch_for_build(nvr)? {
            BranchMapping::Active {
                packaging,
                integration,
            } => (packaging, integration),
            BranchMapping::Retired { suffix } => {
                warn!(nvr = %nvr, suffix = %suffix, "distribution retired, skipping");
                return Ok(PipelineOutcome::Skipped {
                    nvr: nvr.clone(),
                    suffix,
                });
            }
        };

        let pkg_dir = self.prepare_packaging_tree(&packaging_branch, &build.dist_git_commit)?;

        let meta = VersionMetadata::from_file(&pkg_dir.join(format!("{}.spec", self.settings.package)))?;
        let gitrev = read_gitrev(&pkg_dir);
        let base = resolve(&meta, gitrev.as_deref())?;
        info!(nvr = %nvr, base = %base, "resolved upstream base");

        let prepared_dir = pkg_dir.join(prepared_tree_dir(&meta, nvr, &self.settings.arch)?);
        let patches = self.extract(&prepared_dir, &meta)?;
        let patch_file = write_patch_file(&patches)?;
        info!(nvr = %nvr, patches = patches.len(), file = %patch_file.display(), "extracted patch set");

        let tree = self.reconstruct(&integration_branch, &base, &patches, nvr)?;

        Ok(PipelineOutcome::Reconstructed { tree, patch_file })
    }

    /// Check out the packaging tree at the build's commit and run the
    /// packaging tool over it. Returns the packaging tree's work dir.
    pub fn prepare_packaging_tree(
        &self,
        branch: &BranchName,
        commit: &Oid,
    ) -> Result<PathBuf, PipelineError> {
        if self.settings.fetch {
            self.packaging.update_remotes()?;
        }
        self.packaging.checkout_branch(branch)?;
        self.packaging.reset_hard(commit)?;

        let pkg_dir = self.packaging.info()?.work_dir;
        debug!(branch = %branch, dir = %pkg_dir.display(), tool = self.tool.name(), "prepping packaging tree");
        self.tool.prep(&pkg_dir)?;
        Ok(pkg_dir)
    }

    fn extract(&self, prepared_dir: &Path, meta: &VersionMetadata) -> Result<PatchSet, PipelineError> {
        let prepared = Git::open(prepared_dir)?;
        let patches = PatchStackExtractor::new()
            .require_non_empty(self.settings.require_patches)
            .extract(&prepared, meta)?;
        Ok(patches)
    }

    fn reconstruct(
        &self,
        branch: &BranchName,
        base: &BaseReference,
        patches: &PatchSet,
        nvr: &NvrTag,
    ) -> Result<ReconstructedTree, PipelineError> {
        let mut reconstructor = TreeReconstructor::new(self.upstream);
        let tree = reconstructor.run(
            branch,
            base,
            patches,
            &nvr.tag_name(),
            self.settings.auxiliary.as_ref(),
            self.settings.fetch,
        )?;
        Ok(tree)
    }
}

/// Persist the patch series to a temporary `.patch` file.
fn write_patch_file(patches: &PatchSet) -> Result<PathBuf, PipelineError> {
    let file = tempfile::Builder::new()
        .prefix("kexplode-")
        .suffix(".patch")
        .tempfile()
        .map_err(PipelineError::PatchFile)?;
    patches
        .write_mbox(file.path())
        .map_err(|e| match e {
            ExtractError::Io(io) => PipelineError::PatchFile(io),
            other => PipelineError::Extract(other),
        })?;
    let (_, path) = file.keep().map_err(|e| PipelineError::PatchFile(e.error))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.package, "kernel");
        assert!(settings.fetch);
        assert!(!settings.require_patches);
        assert!(settings.auxiliary.is_none());
    }

    #[test]
    fn patch_file_is_kept() {
        let set = PatchSet::new(
            Oid::new("0123456789012345678901234567890123456789").unwrap(),
            Vec::new(),
        );
        let path = write_patch_file(&set).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("patch"));
        std::fs::remove_file(path).unwrap();
    }
}
