//! buildsys::traits
//!
//! Build lookup trait and the identity it returns.
//!
//! # Design
//!
//! `BuildLookup` is async because lookups are network I/O against the build
//! system hub. The pipeline only needs two facts about a build: the
//! packaging-tree commit it was built from and its name-version-release.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{NvrTag, Oid};

/// Errors from build lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The build does not exist.
    #[error("no such build: {0}")]
    NoSuchBuild(String),

    /// The build has no task, so its source commit is unknown.
    #[error("build {0} has no task")]
    NoTask(String),

    /// The task exists but its source carries no commit id.
    #[error("no commit id in build source '{0}'")]
    NoCommit(String),

    /// The hub returned a fault.
    #[error("hub fault {code}: {message}")]
    Fault { code: i64, message: String },

    /// The response could not be understood.
    #[error("malformed hub response: {0}")]
    Malformed(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(String),
}

/// How a build is named on the command line or in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRef {
    Id(u64),
    Nvr(String),
}

impl BuildRef {
    /// Numeric strings are build ids, everything else is an NVR.
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(id) => BuildRef::Id(id),
            Err(_) => BuildRef::Nvr(s.to_string()),
        }
    }
}

impl std::fmt::Display for BuildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildRef::Id(id) => write!(f, "{}", id),
            BuildRef::Nvr(nvr) => f.write_str(nvr),
        }
    }
}

/// What the pipeline needs to know about a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    /// Packaging-tree commit the build was made from
    pub dist_git_commit: Oid,
    /// The build's name-version-release
    pub nvr: NvrTag,
}

/// Resolves a build to its identity.
///
/// # Example
///
/// ```ignore
/// use kexplode::buildsys::{BuildLookup, BuildRef};
///
/// async fn show(lookup: &dyn BuildLookup) -> Result<(), LookupError> {
///     let build = lookup.lookup(&BuildRef::parse("kernel-4.2.3-300.fc23")).await?;
///     println!("{} from {}", build.nvr, build.dist_git_commit);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BuildLookup: Send + Sync {
    /// Short name of the backend, for logs.
    fn name(&self) -> &'static str;

    /// Look up a build by id or NVR.
    async fn lookup(&self, build: &BuildRef) -> Result<BuildIdentity, LookupError>;
}

/// Commit id carried by a build source.
///
/// Sources look like `git+https://host/rpms/kernel.git#<sha>`; task labels
/// render the same source as `.../kernel:<sha>)`.
pub fn source_commit(source: &str) -> Result<Oid, LookupError> {
    let fragment = match source.rsplit_once('#') {
        Some((_, fragment)) => fragment,
        None => source
            .rsplit_once(':')
            .map(|(_, rest)| rest)
            .ok_or_else(|| LookupError::NoCommit(source.to_string()))?,
    };
    let fragment = fragment.trim().trim_end_matches(')');
    Oid::new(fragment).map_err(|_| LookupError::NoCommit(source.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn build_ref_parse() {
        assert_eq!(BuildRef::parse("680001"), BuildRef::Id(680001));
        assert_eq!(
            BuildRef::parse("kernel-4.2.3-300.fc23"),
            BuildRef::Nvr("kernel-4.2.3-300.fc23".into())
        );
        assert_eq!(BuildRef::Id(7).to_string(), "7");
    }

    #[test]
    fn commit_from_url_fragment() {
        let source = format!("git+https://src.example.org/rpms/kernel.git#{}", SHA);
        assert_eq!(source_commit(&source).unwrap().as_str(), SHA);
    }

    #[test]
    fn commit_from_task_label() {
        let label = format!("build (f23-candidate, /kernel:{})", SHA);
        assert_eq!(source_commit(&label).unwrap().as_str(), SHA);
    }

    #[test]
    fn commit_missing() {
        assert!(matches!(
            source_commit("git+https://src.example.org/rpms/kernel.git#master"),
            Err(LookupError::NoCommit(_))
        ));
        assert!(matches!(
            source_commit("kernel.src.rpm"),
            Err(LookupError::NoCommit(_))
        ));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            LookupError::NoSuchBuild("42".into()).to_string(),
            "no such build: 42"
        );
        let err = LookupError::Fault {
            code: 1000,
            message: "boom".into(),
        };
        assert!(err.to_string().contains("1000"));
    }
}
