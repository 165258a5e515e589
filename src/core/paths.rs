//! core::paths
//!
//! Path derivation for the packaging tool's output and kexplode's own files.
//!
//! # Prepared tree layout
//!
//! The packaging tool unpacks a build into the packaging tree as:
//!
//! ```text
//! kernel-{major}.{base_sublevel}{tar_suffix}.{dist}/
//!     linux-{version}-{release}.{arch}/
//! ```
//!
//! `tar_suffix` appears only for builds made from an RC tarball. `dist` is
//! the `fc<N>` token of the release.
//!
//! # Example
//!
//! ```
//! use kexplode::core::paths::prepared_tree_dir;
//! use kexplode::core::types::NvrTag;
//! use kexplode::kernel::VersionMetadata;
//!
//! let meta = VersionMetadata::parse(
//!     "%global released_kernel 1\n\
//!      %define base_sublevel 2\n\
//!      %define stable_update 3\n\
//!      %define rcrev 0\n\
//!      %define gitrev 0\n\
//!      %define kversion 4.2\n",
//! ).unwrap();
//! let nvr = NvrTag::parse("kernel-4.2.3-300.fc23").unwrap();
//!
//! assert_eq!(
//!     prepared_tree_dir(&meta, &nvr, "x86_64").unwrap().to_str().unwrap(),
//!     "kernel-4.2.fc23/linux-4.2.3-300.fc23.x86_64",
//! );
//! ```

use std::path::{Component, Path, PathBuf};

use crate::core::types::NvrTag;
use crate::kernel::branch::{dist_tag, BranchError};
use crate::kernel::VersionMetadata;

/// Name of the lock file inside the upstream git directory.
pub const LOCK_FILE: &str = "kexplode.lock";

/// Prepared tree location, relative to the packaging tree.
///
/// # Errors
///
/// Returns [`BranchError::NoDistribution`] if the release has no `fc<N>`
/// token.
pub fn prepared_tree_dir(
    meta: &VersionMetadata,
    nvr: &NvrTag,
    arch: &str,
) -> Result<PathBuf, BranchError> {
    let dist = dist_tag(nvr)?;
    let main = format!(
        "kernel-{}.{}{}.{}",
        meta.major_version,
        meta.base_sublevel,
        meta.tar_suffix.as_deref().unwrap_or(""),
        dist
    );
    let linux = format!("{}.{}", nvr.to_string().replace("kernel-", "linux-"), arch);
    Ok(PathBuf::from(main).join(linux))
}

/// Lock file for a run against the upstream repository.
pub fn lock_path(git_dir: &Path) -> PathBuf {
    git_dir.join(LOCK_FILE)
}

/// Whether `path`, joined to a work tree, lands strictly inside it.
///
/// The path must be relative, must not climb with `..`, must not be the
/// tree itself, and must stay out of `.git`.
pub fn is_contained(path: &Path) -> bool {
    let mut parts = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    match parts.next() {
        Some(Component::Normal(first)) if first != ".git" => {
            parts.all(|c| matches!(c, Component::Normal(_)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(released: u8, sublevel: u32, rcrev: u32, kversion: &str) -> VersionMetadata {
        VersionMetadata::parse(&format!(
            "%global released_kernel {released}\n\
             %define base_sublevel {sublevel}\n\
             %define stable_update 0\n\
             %define rcrev {rcrev}\n\
             %define gitrev 0\n\
             %define kversion {kversion}\n"
        ))
        .unwrap()
    }

    #[test]
    fn released_build() {
        let nvr = NvrTag::parse("kernel-4.2.0-1.fc23").unwrap();
        let dir = prepared_tree_dir(&meta(1, 2, 0, "4.2"), &nvr, "x86_64").unwrap();
        assert_eq!(dir, PathBuf::from("kernel-4.2.fc23/linux-4.2.0-1.fc23.x86_64"));
    }

    #[test]
    fn rc_tarball_build_carries_suffix() {
        let nvr = NvrTag::parse("kernel-5.0.0-0.rc1.git0.1.fc30").unwrap();
        let dir = prepared_tree_dir(&meta(0, 0, 1, "5.0-rc1"), &nvr, "aarch64").unwrap();
        assert_eq!(
            dir,
            PathBuf::from("kernel-5.0-rc1.fc30/linux-5.0.0-0.rc1.git0.1.fc30.aarch64")
        );
    }

    #[test]
    fn missing_dist_token() {
        let nvr = NvrTag::parse("kernel-4.2.0-1.el7").unwrap();
        assert!(matches!(
            prepared_tree_dir(&meta(1, 2, 0, "4.2"), &nvr, "x86_64"),
            Err(BranchError::NoDistribution { .. })
        ));
    }

    #[test]
    fn lock_lives_in_git_dir() {
        assert_eq!(
            lock_path(Path::new("/srv/linux/.git")),
            PathBuf::from("/srv/linux/.git/kexplode.lock")
        );
    }

    #[test]
    fn contained_paths() {
        assert!(is_contained(Path::new("fedora/configs")));
        assert!(is_contained(Path::new("./configs")));
        for escaping in ["", ".", "./", "..", "../linux", "fedora/../..", "/etc/configs", ".git/configs"] {
            assert!(!is_contained(Path::new(escaping)), "{escaping:?} accepted");
        }
    }
}
