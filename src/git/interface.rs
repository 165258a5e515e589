//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! kexplode. Both the packaging tree and the upstream tree are driven through
//! [`Git`], which returns strong types and normalizes errors into typed
//! failure categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref or revision does not exist
//! - [`GitError::ApplyFailed`]: A patch did not apply cleanly
//! - [`GitError::CommandFailed`]: The `git` porcelain exited non-zero
//!
//! # Example
//!
//! ```ignore
//! use kexplode::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/linux"))?;
//! let oid = git.resolve_revision("v5.10")?;
//! git.reset_hard(&oid)?;
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, TagName, TypeError};

/// Identity used when the repository has no `user.name`/`user.email`.
const FALLBACK_NAME: &str = "kexplode";
const FALLBACK_EMAIL: &str = "kexplode@localhost";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref or revision does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// A patch could not be parsed or applied.
    #[error("patch does not apply: {message}")]
    ApplyFailed {
        /// What libgit2 reported
        message: String,
    },

    /// The git porcelain exited unsuccessfully.
    #[error("`git {command}` failed: {stderr}")]
    CommandFailed {
        /// The arguments passed to git
        command: String,
        /// Captured standard error
        stderr: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Conflict | git2::ErrorCode::ApplyFail => GitError::ApplyFailed {
                message: format!("{}: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::InvalidRefName {
                message: other.to_string(),
            },
        }
    }
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to .git directory
    pub git_dir: PathBuf,
    /// Path to working directory
    pub work_dir: PathBuf,
}

/// Author of a commit, with the original timezone preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Identity {
    fn from_signature(sig: &git2::Signature<'_>) -> Self {
        let time = sig.when();
        let offset =
            FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
        let when = offset
            .timestamp_opt(time.seconds(), 0)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.with_timezone(&offset));
        Self {
            name: sig.name().unwrap_or("").to_string(),
            email: sig.email().unwrap_or("").to_string(),
            when,
        }
    }

    fn to_signature(&self) -> Result<git2::Signature<'static>, GitError> {
        let time = git2::Time::new(self.when.timestamp(), self.when.offset().local_minus_utc() / 60);
        git2::Signature::new(&self.name, &self.email, &time)
            .map_err(|e| GitError::from_git2(e, "signature"))
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Commit author
    pub author: Identity,
    /// Number of parents (0 for the root, >1 for merges)
    pub parent_count: usize,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface. No other module should
/// import `git2` directly.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Unlike discovery, the path must be the top of a working tree: the
    /// prepared packaging tree lives inside another repository and must not
    /// resolve to its parent.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Get repository information (git_dir and work_dir paths).
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        let git_dir = self.repo.path().to_path_buf();
        let work_dir = self.repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(RepoInfo { git_dir, work_dir })
    }

    /// Get direct access to the .git directory path.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    /// Fetch every configured remote (`git remote update`).
    ///
    /// This is the only operation that shells out: it needs the user's
    /// transport and credential configuration.
    pub fn update_remotes(&self) -> Result<(), GitError> {
        self.run_porcelain(&["remote", "update"])
    }

    /// Names of the configured remotes, `origin` first when present.
    pub fn remotes(&self) -> Result<Vec<String>, GitError> {
        let remotes = self.repo.remotes().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let mut names: Vec<String> = remotes.iter().flatten().map(String::from).collect();
        names.sort_by_key(|name| name != "origin");
        Ok(names)
    }

    fn run_porcelain(&self, args: &[&str]) -> Result<(), GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.work_dir()?)
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: args.join(" "),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a revision (tag, branch, or commit id) to a commit OID.
    ///
    /// Annotated tags are peeled to the commit they point at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the revision does not exist
    pub fn resolve_revision(&self, revspec: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(revspec)
            .map_err(|e| GitError::RefNotFound {
                refname: format!("{}: {}", revspec, e.message()),
            })?;

        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, revspec))?;

        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Ok(Oid::new(oid.to_string())?)
    }

    /// Tree OID of the HEAD commit.
    pub fn head_tree(&self) -> Result<Oid, GitError> {
        let tree = self
            .repo
            .head()
            .and_then(|h| h.peel_to_tree())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(Oid::new(tree.id().to_string())?)
    }

    /// Check if a ref exists.
    pub fn ref_exists(&self, refname: &str) -> bool {
        self.repo.find_reference(refname).is_ok()
    }

    // =========================================================================
    // Working Tree Mutation
    // =========================================================================

    /// Switch the working tree to a local branch.
    ///
    /// If the branch does not exist locally it is created from the first
    /// remote that has it, the way `git checkout <branch>` does.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if neither a local nor a remote branch exists
    pub fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let local_ref = branch.local_ref();

        if !self.ref_exists(&local_ref) {
            let start = self
                .remotes()?
                .iter()
                .map(|remote| branch.remote_ref(remote))
                .find(|r| self.ref_exists(r))
                .ok_or_else(|| GitError::RefNotFound {
                    refname: local_ref.clone(),
                })?;

            let commit = self
                .repo
                .find_reference(&start)
                .and_then(|r| r.peel_to_commit())
                .map_err(|e| GitError::from_git2(e, &start))?;
            self.repo
                .branch(branch.as_str(), &commit, false)
                .map_err(|e| GitError::from_git2(e, &local_ref))?;
        }

        let target = self
            .repo
            .find_reference(&local_ref)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_tree(target.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &local_ref))?;
        self.repo
            .set_head(&local_ref)
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        Ok(())
    }

    /// Move the current branch to `oid`, discarding index and worktree
    /// changes (`git reset --hard`).
    pub fn reset_hard(&self, oid: &Oid) -> Result<(), GitError> {
        let object = self
            .repo
            .find_object(to_git2(oid)?, None)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo
            .reset(&object, git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Every commit reachable from HEAD, oldest first.
    pub fn rev_list_reverse(&self) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
        revwalk
            .push_head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        revwalk
            .map(|oid| -> Result<Oid, GitError> {
                let oid = oid.map_err(|e| GitError::Internal {
                    message: e.message().to_string(),
                })?;
                Ok(Oid::new(oid.to_string())?)
            })
            .collect()
    }

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(oid)?;
        let author = commit.author();

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author: Identity::from_signature(&author),
            parent_count: commit.parent_count(),
        })
    }

    /// The change a commit introduces over its first parent, as a unified
    /// diff with full index lines and binary data.
    ///
    /// Root commits are diffed against the empty tree. The bytes are kept
    /// as stored; file contents need not be UTF-8.
    pub fn commit_diff(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let commit = self.find_commit(oid)?;
        let tree = commit
            .tree()
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(
                parent
                    .tree()
                    .map_err(|e| GitError::from_git2(e, oid.as_str()))?,
            ),
            Err(_) => None,
        };

        let mut opts = git2::DiffOptions::new();
        opts.show_binary(true);
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let mut buf = Vec::new();
        diff.print(git2::DiffFormat::Patch, |_, _, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                buf.push(line.origin() as u8);
            }
            buf.extend_from_slice(line.content());
            true
        })
        .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(buf)
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    // =========================================================================
    // Patch Application and Commits
    // =========================================================================

    /// Apply a unified diff to both the index and the working tree.
    ///
    /// Nothing is written when any hunk fails: libgit2 checks the whole
    /// patch before touching the tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::ApplyFailed`] if the patch cannot be parsed or applied
    pub fn apply_diff(&self, patch: &[u8]) -> Result<(), GitError> {
        let diff = git2::Diff::from_buffer(patch).map_err(|e| GitError::ApplyFailed {
            message: e.message().to_string(),
        })?;

        self.repo
            .apply(&diff, git2::ApplyLocation::Both, None)
            .map_err(|e| GitError::ApplyFailed {
                message: e.message().to_string(),
            })
    }

    /// Stage everything under `path` (relative to the work dir), including
    /// deletions.
    pub fn stage_path(&self, path: &Path) -> Result<(), GitError> {
        let context = path.display().to_string();
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, &context))?;
        index
            .add_all([path], git2::IndexAddOption::FORCE, None)
            .map_err(|e| GitError::from_git2(e, &context))?;
        index
            .update_all([path], None)
            .map_err(|e| GitError::from_git2(e, &context))?;
        index.write().map_err(|e| GitError::from_git2(e, &context))?;
        Ok(())
    }

    /// Commit the current index on top of HEAD.
    ///
    /// The committer is the repository's configured identity, stamped with
    /// the author's time so that re-creating the same change yields the same
    /// commit. Returns `None` without committing when the index matches HEAD.
    pub fn commit_index(&self, author: &Identity, message: &str) -> Result<Option<Oid>, GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "index"))?;

        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        if head.tree_id() == tree_id {
            return Ok(None);
        }

        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "index tree"))?;

        let author_sig = author.to_signature()?;
        let committer = Identity {
            when: author.when,
            ..self.default_identity()
        }
        .to_signature()?;

        let oid = self
            .repo
            .commit(Some("HEAD"), &author_sig, &committer, message, &tree, &[&head])
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        Ok(Some(Oid::new(oid.to_string())?))
    }

    /// Identity from `user.name`/`user.email`, or a fixed fallback, at the
    /// current time.
    pub fn default_identity(&self) -> Identity {
        match self.repo.signature() {
            Ok(sig) => Identity::from_signature(&sig),
            Err(_) => Identity {
                name: FALLBACK_NAME.to_string(),
                email: FALLBACK_EMAIL.to_string(),
                when: Utc::now().fixed_offset(),
            },
        }
    }

    /// Identity of the HEAD commit's author.
    pub fn head_author(&self) -> Result<Identity, GitError> {
        let oid = self.head_oid()?;
        Ok(self.commit_info(&oid)?.author)
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// The commit a tag points at, peeled through annotated tag objects.
    ///
    /// Returns `Ok(None)` if the tag does not exist.
    pub fn tag_target(&self, tag: &TagName) -> Result<Option<Oid>, GitError> {
        let refname = tag.tag_ref();
        match self.repo.find_reference(&refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, &refname))?;
                Ok(Some(Oid::new(commit.id().to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, &refname)),
        }
    }

    /// Tree of the commit a tag points at.
    pub fn tag_tree(&self, tag: &TagName) -> Result<Option<Oid>, GitError> {
        match self.tag_target(tag)? {
            Some(commit) => {
                let tree = self
                    .find_commit(&commit)?
                    .tree_id();
                Ok(Some(Oid::new(tree.to_string())?))
            }
            None => Ok(None),
        }
    }

    /// Create an annotated tag at `target`. Fails if the tag exists.
    pub fn create_annotated_tag(
        &self,
        tag: &TagName,
        target: &Oid,
        message: &str,
    ) -> Result<Oid, GitError> {
        let object = self
            .repo
            .find_object(to_git2(target)?, Some(git2::ObjectType::Commit))
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;
        let tagger = Identity {
            when: Utc::now().fixed_offset(),
            ..self.default_identity()
        }
        .to_signature()?;

        let oid = self
            .repo
            .tag(tag.as_str(), &object, &tagger, message, false)
            .map_err(|e| GitError::from_git2(e, &tag.tag_ref()))?;

        Ok(Oid::new(oid.to_string())?)
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = GitError::CommandFailed {
                command: "remote update".into(),
                stderr: "fatal: unable to access".into(),
            };
            assert_eq!(
                err.to_string(),
                "`git remote update` failed: fatal: unable to access"
            );

            let err = GitError::ApplyFailed {
                message: "patch does not apply".into(),
            };
            assert!(err.to_string().contains("patch does not apply"));
        }

        #[test]
        fn type_errors_convert() {
            let err: GitError = TypeError::InvalidOid("short".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));

            let err: GitError = TypeError::InvalidBranchName("a..b".into()).into();
            assert!(matches!(err, GitError::InvalidRefName { .. }));
        }
    }

    mod identity {
        use super::*;

        #[test]
        fn signature_roundtrip_keeps_offset() {
            let when = FixedOffset::east_opt(2 * 3600)
                .unwrap()
                .with_ymd_and_hms(2015, 6, 1, 12, 0, 0)
                .unwrap();
            let id = Identity {
                name: "Josh".into(),
                email: "josh@example.com".into(),
                when,
            };
            let sig = id.to_signature().unwrap();
            assert_eq!(sig.when().offset_minutes(), 120);
            assert_eq!(Identity::from_signature(&sig), id);
        }
    }

    #[test]
    fn open_non_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Git::open(dir.path()),
            Err(GitError::NotARepo { .. })
        ));
    }
}
