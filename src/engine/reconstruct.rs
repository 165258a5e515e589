//! engine::reconstruct
//!
//! Rebuild the exploded tree in the upstream repository.
//!
//! # State machine
//!
//! ```text
//! Idle -> BranchSelected -> ResetToBase -> PatchesApplied -> AuxiliaryCommitted -> Tagged
//! ```
//!
//! - **BranchSelected**: remotes fetched, integration branch checked out
//! - **ResetToBase**: branch tip forced to the base reference; earlier
//!   history on the branch is discarded, the branch is a derived artifact
//! - **PatchesApplied**: every patch applied in order with its original
//!   author and message; on any failure the tree returns to the base
//! - **AuxiliaryCommitted**: distribution files copied to a fixed location
//!   and committed as `<tag> configs`
//! - **Tagged**: annotated tag named after the build
//!
//! # Idempotence
//!
//! Commits reuse the author's timestamp for the committer, so re-running
//! the same reconstruction recreates the same tree. An existing tag whose
//! tree matches is accepted as-is; one with a different tree is a conflict.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::extract::PatchSet;
use crate::core::paths::is_contained;
use crate::core::types::{BranchName, Oid, TagName};
use crate::git::{Git, GitError};
use crate::kernel::base::BaseReference;

/// Reconstruction phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReconstructState {
    Idle,
    BranchSelected,
    ResetToBase,
    PatchesApplied,
    AuxiliaryCommitted,
    Tagged,
}

impl std::fmt::Display for ReconstructState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconstructState::Idle => "idle",
            ReconstructState::BranchSelected => "branch-selected",
            ReconstructState::ResetToBase => "reset-to-base",
            ReconstructState::PatchesApplied => "patches-applied",
            ReconstructState::AuxiliaryCommitted => "auxiliary-committed",
            ReconstructState::Tagged => "tagged",
        };
        f.write_str(name)
    }
}

/// Errors from tree reconstruction.
#[derive(Debug, Error)]
pub enum ReconstructError {
    /// A step was requested out of order.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReconstructState,
        to: ReconstructState,
    },

    /// The base reference does not exist in the upstream tree.
    #[error("base reference {base} not found in upstream tree: {source}")]
    BaseNotFound {
        base: String,
        #[source]
        source: GitError,
    },

    /// A patch did not apply cleanly; the tree was returned to the base.
    #[error("patch {} ({commit}) failed to apply: {subject}: {conflict}", index + 1)]
    PatchApply {
        /// Zero-based position in the patch set
        index: usize,
        /// Commit the patch came from
        commit: Oid,
        /// Patch subject line
        subject: String,
        /// What the apply step reported
        conflict: String,
    },

    /// The tag exists and names a different tree.
    #[error("tag {tag} already exists at {existing} with different content")]
    TagConflict {
        tag: TagName,
        /// Commit the existing tag points at
        existing: Oid,
    },

    /// Copying the auxiliary files failed.
    #[error("failed to copy auxiliary files from '{path}': {message}")]
    Auxiliary { path: PathBuf, message: String },

    /// The auxiliary destination is not strictly inside the work tree.
    #[error("auxiliary destination '{dest}' is not inside the work tree")]
    AuxiliaryDest { dest: PathBuf },

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

/// Distribution files committed on top of the patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFiles {
    /// Directory to copy from
    pub source: PathBuf,
    /// Destination relative to the upstream work dir
    pub dest: PathBuf,
}

/// How the final tag step resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Created,
    /// An identical tag already existed.
    Unchanged,
}

/// The externally visible result of a reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedTree {
    pub tag: TagName,
    pub branch: BranchName,
    pub base: Oid,
    pub tip: Oid,
    pub tree: Oid,
    pub applied: usize,
    pub auxiliary_commit: Option<Oid>,
    pub tag_outcome: TagOutcome,
}

/// Drives the upstream tree through one reconstruction.
///
/// Owns the working tree for its lifetime; callers serialize runs.
#[derive(Debug)]
pub struct TreeReconstructor<'a> {
    git: &'a Git,
    state: ReconstructState,
    branch: Option<BranchName>,
    base: Option<Oid>,
    applied: usize,
    auxiliary_commit: Option<Oid>,
}

impl<'a> TreeReconstructor<'a> {
    pub fn new(git: &'a Git) -> Self {
        Self {
            git,
            state: ReconstructState::Idle,
            branch: None,
            base: None,
            applied: 0,
            auxiliary_commit: None,
        }
    }

    pub fn state(&self) -> ReconstructState {
        self.state
    }

    fn advance(&mut self, from: ReconstructState, to: ReconstructState) -> Result<(), ReconstructError> {
        if self.state != from {
            return Err(ReconstructError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    /// Fetch remotes and check out the integration branch.
    pub fn select_branch(
        &mut self,
        branch: &BranchName,
        fetch: bool,
    ) -> Result<(), ReconstructError> {
        self.advance(ReconstructState::Idle, ReconstructState::BranchSelected)?;

        if fetch {
            self.git.update_remotes()?;
        }
        self.git.checkout_branch(branch)?;

        info!(branch = %branch, "selected integration branch");
        self.branch = Some(branch.clone());
        self.state = ReconstructState::BranchSelected;
        Ok(())
    }

    /// Force the branch tip to the base reference.
    pub fn reset_to_base(&mut self, base: &BaseReference) -> Result<Oid, ReconstructError> {
        self.advance(ReconstructState::BranchSelected, ReconstructState::ResetToBase)?;

        let oid = self
            .git
            .resolve_revision(base.as_revspec())
            .map_err(|source| ReconstructError::BaseNotFound {
                base: base.to_string(),
                source,
            })?;
        self.git.reset_hard(&oid)?;

        info!(base = %base, commit = %oid.short(12), "reset branch to base");
        self.base = Some(oid.clone());
        self.state = ReconstructState::ResetToBase;
        Ok(oid)
    }

    /// Apply the patch set in order.
    ///
    /// If any patch fails the branch is reset to the base again and the
    /// reconstructor stays in `ResetToBase`.
    pub fn apply_patches(&mut self, patches: &PatchSet) -> Result<usize, ReconstructError> {
        self.advance(ReconstructState::ResetToBase, ReconstructState::PatchesApplied)?;
        let base = self.base.clone().ok_or(ReconstructError::InvalidTransition {
            from: self.state,
            to: ReconstructState::PatchesApplied,
        })?;

        for (index, patch) in patches.entries().iter().enumerate() {
            let result = self
                .git
                .apply_diff(&patch.diff)
                .and_then(|_| self.git.commit_index(&patch.author, &patch.message));

            match result {
                Ok(Some(oid)) => {
                    debug!(index, commit = %oid.short(12), subject = patch.subject(), "applied patch");
                }
                Ok(None) => {
                    warn!(index, subject = patch.subject(), "patch produced no change");
                }
                Err(err) => {
                    self.git.reset_hard(&base)?;
                    return Err(ReconstructError::PatchApply {
                        index,
                        commit: patch.commit.clone(),
                        subject: patch.subject().to_string(),
                        conflict: err.to_string(),
                    });
                }
            }
        }

        info!(count = patches.len(), "applied patch set");
        self.applied = patches.len();
        self.state = ReconstructState::PatchesApplied;
        Ok(self.applied)
    }

    /// Copy auxiliary files into place and commit them as `<tag> configs`.
    ///
    /// With no files, or files identical to what the tree already holds,
    /// nothing is committed.
    pub fn commit_auxiliary(
        &mut self,
        files: Option<&AuxiliaryFiles>,
        tag: &TagName,
    ) -> Result<Option<Oid>, ReconstructError> {
        self.advance(
            ReconstructState::PatchesApplied,
            ReconstructState::AuxiliaryCommitted,
        )?;

        let commit = match files {
            Some(files) => {
                let work_dir = self.git.info()?.work_dir;
                copy_tree(&files.source, &work_dir, &files.dest)?;
                self.git.stage_path(&files.dest)?;

                // Stamp with HEAD's time so a re-run yields the same commit.
                let author = crate::git::Identity {
                    when: self.git.head_author()?.when,
                    ..self.git.default_identity()
                };
                let commit = self
                    .git
                    .commit_index(&author, &format!("{} configs", tag))?;
                match &commit {
                    Some(oid) => info!(dest = %files.dest.display(), commit = %oid.short(12), "committed auxiliary files"),
                    None => debug!(dest = %files.dest.display(), "auxiliary files unchanged"),
                }
                commit
            }
            None => None,
        };

        self.auxiliary_commit = commit.clone();
        self.state = ReconstructState::AuxiliaryCommitted;
        Ok(commit)
    }

    /// Create the annotated tag at the current tip.
    ///
    /// An existing tag is compared by tree, not by commit: a tag whose
    /// commit differs from the tip but whose tree matches is left where it
    /// is and reported as [`TagOutcome::Unchanged`]. Only content decides a
    /// [`ReconstructError::TagConflict`].
    pub fn tag(&mut self, tag: &TagName) -> Result<TagOutcome, ReconstructError> {
        self.advance(ReconstructState::AuxiliaryCommitted, ReconstructState::Tagged)?;

        let tip = self.git.head_oid()?;
        let outcome = match self.git.tag_target(tag)? {
            None => {
                self.git
                    .create_annotated_tag(tag, &tip, &format!("{}\n", tag))?;
                info!(tag = %tag, commit = %tip.short(12), "created tag");
                TagOutcome::Created
            }
            Some(existing) => {
                let same_tree = self.git.tag_tree(tag)? == Some(self.git.head_tree()?);
                if !same_tree {
                    return Err(ReconstructError::TagConflict {
                        tag: tag.clone(),
                        existing,
                    });
                }
                if existing != tip {
                    warn!(
                        tag = %tag,
                        existing = %existing.short(12),
                        tip = %tip.short(12),
                        "tag names another commit with the same tree, leaving it"
                    );
                } else {
                    info!(tag = %tag, commit = %existing.short(12), "tag already present with identical tree");
                }
                TagOutcome::Unchanged
            }
        };

        self.state = ReconstructState::Tagged;
        Ok(outcome)
    }

    /// Run every step in order.
    pub fn reconstruct(
        mut self,
        branch: &BranchName,
        base: &BaseReference,
        patches: &PatchSet,
        tag: &TagName,
        auxiliary: Option<&AuxiliaryFiles>,
    ) -> Result<ReconstructedTree, ReconstructError> {
        self.run(branch, base, patches, tag, auxiliary, true)
    }

    /// Like [`reconstruct`](Self::reconstruct), optionally without fetching.
    pub fn run(
        &mut self,
        branch: &BranchName,
        base: &BaseReference,
        patches: &PatchSet,
        tag: &TagName,
        auxiliary: Option<&AuxiliaryFiles>,
        fetch: bool,
    ) -> Result<ReconstructedTree, ReconstructError> {
        self.select_branch(branch, fetch)?;
        let base = self.reset_to_base(base)?;
        let applied = self.apply_patches(patches)?;
        let auxiliary_commit = self.commit_auxiliary(auxiliary, tag)?;
        let tag_outcome = self.tag(tag)?;

        Ok(ReconstructedTree {
            tag: tag.clone(),
            branch: branch.clone(),
            base,
            tip: self.git.head_oid()?,
            tree: self.git.head_tree()?,
            applied,
            auxiliary_commit,
            tag_outcome,
        })
    }
}

/// Replace `root/relative` with a copy of the directory `source`.
///
/// `relative` must name a location strictly inside `root`; anything else
/// is refused before the filesystem is touched.
fn copy_tree(source: &Path, root: &Path, relative: &Path) -> Result<(), ReconstructError> {
    let fail = |message: String| ReconstructError::Auxiliary {
        path: source.to_path_buf(),
        message,
    };

    if !is_contained(relative) {
        return Err(ReconstructError::AuxiliaryDest {
            dest: relative.to_path_buf(),
        });
    }
    let dest = root.join(relative);
    if !source.is_dir() {
        return Err(fail("not a directory".into()));
    }
    if dest.exists() {
        std::fs::remove_dir_all(&dest).map_err(|e| fail(e.to_string()))?;
    }

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| fail(e.to_string()))?;
        let inner = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| fail(e.to_string()))?;
        let target = dest.join(inner);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| fail(e.to_string()))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| fail(e.to_string()))?;
        }
    }
    Ok(())
}
