//! kernel::branch
//!
//! Static mapping from a build's distribution suffix to the branches the
//! pipeline works on.
//!
//! The packaging tree is checked out on the mapped branch as-is. The
//! upstream tree uses the same name, except that the primary development
//! branch (`master`) is replaced by the integration alias (`rawhide`).
//!
//! # Example
//!
//! ```
//! use kexplode::core::types::NvrTag;
//! use kexplode::kernel::branch::{branch_for_build, BranchMapping};
//!
//! let nvr = NvrTag::parse("kernel-4.4.0-0.rc1.git0.1.fc24").unwrap();
//! match branch_for_build(&nvr).unwrap() {
//!     BranchMapping::Active { packaging, integration } => {
//!         assert_eq!(packaging.as_str(), "master");
//!         assert_eq!(integration.as_str(), "rawhide");
//!     }
//!     BranchMapping::Retired { .. } => unreachable!(),
//! }
//! ```

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::types::{BranchName, NvrTag};

/// Name of the primary development branch in the mapping table.
pub const PRIMARY_BRANCH: &str = "master";

/// Upstream branch that stands in for [`PRIMARY_BRANCH`].
pub const INTEGRATION_ALIAS: &str = "rawhide";

static DIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*(fc(\d+))").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Branch(&'static str),
    Retired,
}

/// Distribution suffix to branch. The newest distribution tracks the
/// primary branch.
const BRANCH_TABLE: &[(&str, Target)] = &[
    ("f21", Target::Retired),
    ("f22", Target::Branch("f22")),
    ("f23", Target::Branch("f23")),
    ("f24", Target::Branch(PRIMARY_BRANCH)),
];

/// Errors from branch selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchError {
    /// The NVR release does not carry an `fc<N>` distribution token.
    #[error("no distribution token in '{nvr}'")]
    NoDistribution {
        /// The offending NVR
        nvr: String,
    },

    /// The distribution suffix has no entry in the branch table.
    #[error("no branch is mapped for distribution '{suffix}'")]
    Unmapped {
        /// The unmapped suffix, e.g. `f19`
        suffix: String,
    },
}

/// Outcome of mapping a distribution suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMapping {
    /// Builds for this distribution are reconstructed.
    Active {
        /// Branch of the packaging tree
        packaging: BranchName,
        /// Branch of the upstream tree
        integration: BranchName,
    },
    /// The distribution is retired; builds are skipped.
    Retired {
        /// The retired suffix
        suffix: String,
    },
}

/// Look up a distribution suffix (`f23`) in the branch table.
///
/// Returns `None` for suffixes with no entry.
pub fn map_distribution_suffix(suffix: &str) -> Option<BranchMapping> {
    let (_, target) = BRANCH_TABLE.iter().find(|(s, _)| *s == suffix)?;
    Some(match target {
        Target::Retired => BranchMapping::Retired {
            suffix: suffix.to_string(),
        },
        Target::Branch(name) => {
            // Table entries are literals that always validate.
            let packaging = BranchName::new(*name).ok()?;
            let integration = integration_branch(&packaging);
            BranchMapping::Active {
                packaging,
                integration,
            }
        }
    })
}

/// The upstream branch for a packaging branch.
pub fn integration_branch(packaging: &BranchName) -> BranchName {
    if packaging.as_str() == PRIMARY_BRANCH {
        BranchName::new(INTEGRATION_ALIAS).unwrap_or_else(|_| packaging.clone())
    } else {
        packaging.clone()
    }
}

/// The `fc<N>` token of an NVR's release, e.g. `fc23`.
pub fn dist_tag(nvr: &NvrTag) -> Result<String, BranchError> {
    DIST_RE
        .captures(nvr.release())
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| BranchError::NoDistribution {
            nvr: nvr.to_string(),
        })
}

/// The distribution suffix of an NVR, e.g. `f23` for `...fc23`.
pub fn dist_suffix(nvr: &NvrTag) -> Result<String, BranchError> {
    let caps = DIST_RE
        .captures(nvr.release())
        .ok_or_else(|| BranchError::NoDistribution {
            nvr: nvr.to_string(),
        })?;
    Ok(format!("f{}", &caps[2]))
}

/// Select branches for a build.
///
/// # Errors
///
/// - [`BranchError::NoDistribution`] if the release has no `fc<N>` token
/// - [`BranchError::Unmapped`] if the suffix is not in the table
pub fn branch_for_build(nvr: &NvrTag) -> Result<BranchMapping, BranchError> {
    let suffix = dist_suffix(nvr)?;
    map_distribution_suffix(&suffix).ok_or(BranchError::Unmapped { suffix })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nvr(s: &str) -> NvrTag {
        NvrTag::parse(s).unwrap()
    }

    #[test]
    fn maps_release_branches_to_themselves() {
        assert_eq!(
            map_distribution_suffix("f23"),
            Some(BranchMapping::Active {
                packaging: BranchName::new("f23").unwrap(),
                integration: BranchName::new("f23").unwrap(),
            })
        );
    }

    #[test]
    fn newest_maps_to_primary_and_alias() {
        let Some(BranchMapping::Active {
            packaging,
            integration,
        }) = map_distribution_suffix("f24")
        else {
            panic!("f24 should be active");
        };
        assert_eq!(packaging.as_str(), PRIMARY_BRANCH);
        assert_eq!(integration.as_str(), INTEGRATION_ALIAS);
    }

    #[test]
    fn retired_distribution_is_a_skip() {
        assert_eq!(
            map_distribution_suffix("f21"),
            Some(BranchMapping::Retired {
                suffix: "f21".into()
            })
        );
        assert!(matches!(
            branch_for_build(&nvr("kernel-3.19.8-100.fc21")),
            Ok(BranchMapping::Retired { .. })
        ));
    }

    #[test]
    fn unknown_suffix_is_unmapped() {
        assert_eq!(map_distribution_suffix("f19"), None);
        assert_eq!(
            branch_for_build(&nvr("kernel-3.14.4-200.fc19")),
            Err(BranchError::Unmapped {
                suffix: "f19".into()
            })
        );
    }

    #[test]
    fn suffix_from_release() {
        assert_eq!(dist_suffix(&nvr("kernel-4.2.0-1.fc23")).unwrap(), "f23");
        assert_eq!(
            dist_suffix(&nvr("kernel-4.3.0-0.rc1.git2.1.fc24")).unwrap(),
            "f24"
        );
        assert_eq!(dist_tag(&nvr("kernel-4.2.0-1.fc23")).unwrap(), "fc23");
    }

    #[test]
    fn release_without_dist_token() {
        assert!(matches!(
            branch_for_build(&nvr("kernel-4.2.0-1.el7")),
            Err(BranchError::NoDistribution { .. })
        ));
    }

    #[test]
    fn integration_leaves_other_branches_alone() {
        let b = BranchName::new("f22").unwrap();
        assert_eq!(integration_branch(&b), b);
    }
}
