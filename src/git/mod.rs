//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Both the packaging tree and
//! the upstream tree are read and rewritten through it. No other module
//! should import `git2`.
//!
//! All object and ref work goes through `git2`. Fetching remotes is the one
//! exception and runs `git remote update`, so that the user's transport and
//! credential setup applies unchanged.
//!
//! # Responsibilities
//!
//! - Repository opening
//! - Remote updates, branch checkout, hard resets
//! - History listing and per-commit diffs
//! - Patch application and commits with preserved authorship
//! - Annotated tag lookup and creation
//!
//! # Example
//!
//! ```ignore
//! use kexplode::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/linux"))?;
//! git.update_remotes()?;
//! let base = git.resolve_revision("v5.19-rc1")?;
//! git.reset_hard(&base)?;
//! ```

mod interface;

pub use interface::{CommitInfo, Git, GitError, Identity, RepoInfo};
