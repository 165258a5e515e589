//! kernel::base
//!
//! Translate versioning fields into the upstream revision the exploded tree
//! starts from.
//!
//! # Decision table
//!
//! Evaluated in order:
//!
//! 1. `gitrev == 0`: an upstream **tag** derived from the version numbers.
//! 2. `gitrev != 0` on a released kernel: ambiguous, rejected.
//! 3. otherwise: the snapshot commit recorded in the packaging tree's
//!    `gitrev` file.
//!
//! Tag derivation for unreleased kernels bumps the sublevel by one unless the
//! sources come from an RC tarball: `v{major}.{sublevel + 1}-rc{rc}` when the
//! RC patch sits on top of the previous release, `v{major}.{sublevel}-rc{rc}`
//! when `tar_suffix` says the tarball already is the RC.
//!
//! # Example
//!
//! ```
//! use kexplode::kernel::base::{resolve, BaseReference};
//! use kexplode::kernel::metadata::VersionMetadata;
//!
//! let meta = VersionMetadata {
//!     released_kernel: true,
//!     major_version: "5".into(),
//!     base_sublevel: 10,
//!     rc_revision: 0,
//!     git_revision: "0".into(),
//!     stable_update: 3,
//!     tar_suffix: None,
//! };
//! let base = resolve(&meta, None).unwrap();
//! assert_eq!(base.to_string(), "v5.10.3");
//! assert!(matches!(base, BaseReference::Tag(_)));
//! ```

use std::path::Path;

use thiserror::Error;

use super::metadata::VersionMetadata;
use crate::core::types::{Oid, TagName};

/// Name of the file in the packaging tree holding the snapshot commit.
pub const GITREV_FILE: &str = "gitrev";

/// Errors from base reference resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The version fields do not select exactly one resolution path.
    #[error("ambiguous version metadata: {reason}")]
    Ambiguous {
        /// Which combination of fields was rejected
        reason: String,
    },

    /// `gitrev` is set but no stored commit id is available.
    #[error("gitrev {gitrev} is set but no stored upstream commit is available")]
    MissingGitRevision {
        /// The declared gitrev value
        gitrev: String,
    },

    /// The stored commit id is not a valid object id.
    #[error("stored upstream commit '{value}' is not a valid object id")]
    InvalidGitRevision {
        /// The stored value
        value: String,
    },

    /// The next sublevel does not fit in a `u32`.
    #[error("base_sublevel {sublevel} has no next sublevel")]
    SublevelOverflow {
        /// The declared base sublevel
        sublevel: u32,
    },

    /// The derived tag is not a valid tag name.
    #[error("derived tag '{tag}' is not a valid tag name")]
    InvalidTag {
        /// The formatted tag
        tag: String,
    },
}

/// The upstream revision an exploded tree is reset to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseReference {
    /// An upstream release or release-candidate tag.
    Tag(TagName),
    /// A raw upstream commit (merge-window snapshots).
    Commit(Oid),
}

impl BaseReference {
    /// Revision string suitable for `git rev-parse`.
    pub fn as_revspec(&self) -> &str {
        match self {
            BaseReference::Tag(tag) => tag.as_str(),
            BaseReference::Commit(oid) => oid.as_str(),
        }
    }
}

impl std::fmt::Display for BaseReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_revspec())
    }
}

/// Resolve the upstream base for a set of versioning fields.
///
/// `gitrev_file` is the content of the packaging tree's [`GITREV_FILE`], if
/// one was found; it is only consulted when `gitrev` is nonzero.
///
/// # Errors
///
/// - [`ResolveError::Ambiguous`] for unreleased kernels with neither RC nor
///   gitrev, and for released kernels carrying a gitrev
/// - [`ResolveError::MissingGitRevision`] when the stored commit is needed
///   but absent
pub fn resolve(
    meta: &VersionMetadata,
    gitrev_file: Option<&str>,
) -> Result<BaseReference, ResolveError> {
    if !meta.has_git_revision() {
        return base_tag(meta).map(BaseReference::Tag);
    }

    if meta.released_kernel {
        return Err(ResolveError::Ambiguous {
            reason: format!(
                "released kernel with gitrev {} cannot be resolved to a commit",
                meta.git_revision
            ),
        });
    }

    let stored = gitrev_file
        .and_then(|content| content.lines().next())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| ResolveError::MissingGitRevision {
            gitrev: meta.git_revision.clone(),
        })?;

    Oid::new(stored)
        .map(BaseReference::Commit)
        .map_err(|_| ResolveError::InvalidGitRevision {
            value: stored.to_string(),
        })
}

/// Derive the upstream tag for metadata without a snapshot commit.
pub fn base_tag(meta: &VersionMetadata) -> Result<TagName, ResolveError> {
    let tag = if meta.released_kernel {
        if meta.stable_update != 0 {
            format!(
                "v{}.{}.{}",
                meta.major_version, meta.base_sublevel, meta.stable_update
            )
        } else {
            format!("v{}.{}", meta.major_version, meta.base_sublevel)
        }
    } else {
        if meta.rc_revision == 0 {
            return Err(ResolveError::Ambiguous {
                reason: "unreleased kernel with neither rcrev nor gitrev".into(),
            });
        }
        // RC tarballs already carry the RC content; otherwise the RC patch
        // applies to the previous release and names the next sublevel.
        let sublevel = if meta.tar_suffix.is_some() {
            meta.base_sublevel
        } else {
            meta.base_sublevel
                .checked_add(1)
                .ok_or(ResolveError::SublevelOverflow {
                    sublevel: meta.base_sublevel,
                })?
        };
        format!(
            "v{}.{}-rc{}",
            meta.major_version, sublevel, meta.rc_revision
        )
    };

    TagName::new(tag.clone()).map_err(|_| ResolveError::InvalidTag { tag })
}

/// Read the stored snapshot commit from a packaging tree.
///
/// Returns `None` when the file does not exist or cannot be read.
pub fn read_gitrev(pkg_dir: &Path) -> Option<String> {
    std::fs::read_to_string(pkg_dir.join(GITREV_FILE)).ok()
}
