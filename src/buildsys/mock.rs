//! buildsys::mock
//!
//! In-memory build lookup for deterministic testing.
//!
//! # Example
//!
//! ```
//! use kexplode::buildsys::mock::MockLookup;
//! use kexplode::buildsys::{BuildLookup, BuildRef};
//!
//! # tokio_test::block_on(async {
//! let lookup = MockLookup::new();
//! lookup.add(680001, "kernel-4.2.3-300.fc23", "0123456789abcdef0123456789abcdef01234567");
//!
//! let build = lookup.lookup(&BuildRef::Id(680001)).await.unwrap();
//! assert_eq!(build.nvr.to_string(), "kernel-4.2.3-300.fc23");
//!
//! let same = lookup.lookup(&BuildRef::parse("kernel-4.2.3-300.fc23")).await.unwrap();
//! assert_eq!(same, build);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{BuildIdentity, BuildLookup, BuildRef, LookupError};
use crate::core::types::{NvrTag, Oid};

/// Mock build lookup.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockLookup {
    inner: Arc<Mutex<MockLookupInner>>,
}

#[derive(Debug, Default)]
struct MockLookupInner {
    by_id: HashMap<u64, BuildIdentity>,
    by_nvr: HashMap<String, BuildIdentity>,
    fail_with: Option<LookupError>,
    lookups: Vec<BuildRef>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a build under both its id and its NVR.
    ///
    /// # Panics
    ///
    /// Panics if `nvr` or `commit` are invalid; this is test setup.
    pub fn add(&self, id: u64, nvr: &str, commit: &str) {
        let identity = BuildIdentity {
            dist_git_commit: Oid::new(commit).expect("valid commit"),
            nvr: NvrTag::parse(nvr).expect("valid nvr"),
        };
        let mut inner = self.inner.lock().expect("mock lock");
        inner.by_nvr.insert(nvr.to_string(), identity.clone());
        inner.by_id.insert(id, identity);
    }

    /// Make every subsequent lookup fail with `error`.
    pub fn fail_with(&self, error: LookupError) {
        self.inner.lock().expect("mock lock").fail_with = Some(error);
    }

    /// Lookups performed so far, in order.
    pub fn lookups(&self) -> Vec<BuildRef> {
        self.inner.lock().expect("mock lock").lookups.clone()
    }
}

#[async_trait]
impl BuildLookup for MockLookup {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn lookup(&self, build: &BuildRef) -> Result<BuildIdentity, LookupError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| LookupError::Network("mock state poisoned".into()))?;
        inner.lookups.push(build.clone());

        if let Some(err) = &inner.fail_with {
            return Err(err.clone());
        }

        let found = match build {
            BuildRef::Id(id) => inner.by_id.get(id),
            BuildRef::Nvr(nvr) => inner.by_nvr.get(nvr),
        };
        found
            .cloned()
            .ok_or_else(|| LookupError::NoSuchBuild(build.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[tokio::test]
    async fn unknown_build() {
        let lookup = MockLookup::new();
        let err = lookup.lookup(&BuildRef::Id(1)).await.unwrap_err();
        assert_eq!(err, LookupError::NoSuchBuild("1".into()));
    }

    #[tokio::test]
    async fn records_lookups_and_fails_on_demand() {
        let lookup = MockLookup::new();
        lookup.add(1, "kernel-4.2.3-300.fc23", SHA);
        lookup.lookup(&BuildRef::Id(1)).await.unwrap();

        lookup.fail_with(LookupError::Network("down".into()));
        assert!(lookup.lookup(&BuildRef::Id(1)).await.is_err());
        assert_eq!(lookup.lookups(), vec![BuildRef::Id(1), BuildRef::Id(1)]);
    }
}
