//! Property-based tests for version metadata and base resolution.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated package descriptions.

use proptest::prelude::*;

use kexplode::core::types::NvrTag;
use kexplode::engine::extract::carried_range;
use kexplode::kernel::base::base_tag;
use kexplode::kernel::{resolve, BaseReference, ResolveError, VersionMetadata};

/// Fields of one generated package description.
#[derive(Debug, Clone)]
struct Fields {
    released: bool,
    major: u32,
    sublevel: u32,
    rcrev: u32,
    gitrev: u32,
    stable: u32,
    rc_tarball: bool,
}

fn fields() -> impl Strategy<Value = Fields> {
    (
        any::<bool>(),
        2u32..7,
        0u32..30,
        0u32..9,
        0u32..12,
        0u32..200,
        any::<bool>(),
    )
        .prop_map(
            |(released, major, sublevel, rcrev, gitrev, stable, rc_tarball)| Fields {
                released,
                major,
                sublevel,
                rcrev,
                gitrev,
                stable,
                rc_tarball,
            },
        )
}

/// Render fields as description text, interleaved with unrelated lines.
fn render(f: &Fields, keyword: &str) -> String {
    let kversion = if f.rc_tarball {
        format!("{}.{}-rc{}", f.major, f.sublevel, f.rcrev)
    } else {
        format!("{}.{}", f.major, f.sublevel)
    };
    format!(
        "Summary: The Linux kernel\n\
         %{kw} released_kernel {}\n\
         %{kw} base_sublevel {}\n\
         # comment line\n\
         %{kw} stable_update {}\n\
         %{kw} rcrev {}\n\
         %{kw} gitrev {}\n\
         %{kw} kversion {}\n\
         %{kw} buildid .local\n\
         Version: %{{rpmversion}}\n",
        u8::from(f.released),
        f.sublevel,
        f.stable,
        f.rcrev,
        f.gitrev,
        kversion,
        kw = keyword,
    )
}

proptest! {
    /// Every declared field is read back with its value.
    #[test]
    fn parse_reads_declared_fields(f in fields(), global in any::<bool>()) {
        let keyword = if global { "global" } else { "define" };
        let meta = VersionMetadata::parse(&render(&f, keyword)).unwrap();

        prop_assert_eq!(meta.released_kernel, f.released);
        prop_assert_eq!(meta.major_version, f.major.to_string());
        prop_assert_eq!(meta.base_sublevel, f.sublevel);
        prop_assert_eq!(meta.rc_revision, f.rcrev);
        prop_assert_eq!(meta.stable_update, f.stable);
        prop_assert_eq!(meta.git_revision, f.gitrev.to_string());
        prop_assert_eq!(meta.tar_suffix.is_some(), f.rc_tarball);
    }

    /// The base is a commit exactly when a snapshot is recorded and the
    /// kernel is unreleased.
    #[test]
    fn resolve_picks_tag_or_commit(f in fields()) {
        let meta = VersionMetadata::parse(&render(&f, "global")).unwrap();
        let stored = "0123456789abcdef0123456789abcdef01234567";

        match resolve(&meta, Some(stored)) {
            Ok(BaseReference::Commit(oid)) => {
                prop_assert!(f.gitrev != 0 && !f.released);
                prop_assert_eq!(oid.as_str(), stored);
            }
            Ok(BaseReference::Tag(tag)) => {
                prop_assert_eq!(f.gitrev, 0);
                let prefix = format!("v{}.", f.major);
                prop_assert!(tag.as_str().starts_with(&prefix));
            }
            Err(ResolveError::Ambiguous { .. }) => {
                prop_assert!(
                    (f.gitrev != 0 && f.released) || (f.gitrev == 0 && !f.released && f.rcrev == 0)
                );
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    /// Released tags name the stable update only when there is one.
    #[test]
    fn released_tags(major in 2u32..7, sublevel in 0u32..30, stable in 0u32..200) {
        let f = Fields {
            released: true,
            major,
            sublevel,
            rcrev: 0,
            gitrev: 0,
            stable,
            rc_tarball: false,
        };
        let meta = VersionMetadata::parse(&render(&f, "define")).unwrap();
        let tag = base_tag(&meta).unwrap();

        let expected = if stable == 0 {
            format!("v{major}.{sublevel}")
        } else {
            format!("v{major}.{sublevel}.{stable}")
        };
        prop_assert_eq!(tag.as_str(), expected);
    }

    /// RC tags point at the next sublevel unless built from an RC tarball.
    #[test]
    fn rc_tags(major in 2u32..7, sublevel in 0u32..30, rcrev in 1u32..9, rc_tarball in any::<bool>()) {
        let f = Fields {
            released: false,
            major,
            sublevel,
            rcrev,
            gitrev: 0,
            stable: 0,
            rc_tarball,
        };
        let meta = VersionMetadata::parse(&render(&f, "global")).unwrap();
        let tag = base_tag(&meta).unwrap();

        let expected_sublevel = if rc_tarball { sublevel } else { sublevel + 1 };
        prop_assert_eq!(tag.as_str(), format!("v{major}.{expected_sublevel}-rc{rcrev}"));
    }

    /// The carried range is the history minus one or two baseline commits.
    #[test]
    fn carried_range_drops_baselines(len in 2usize..40, stable in 0u32..5) {
        let revisions: Vec<usize> = (0..len).collect();
        let (base, carried) = carried_range(&revisions, stable).unwrap();

        let skipped = if stable == 0 { 1 } else { 2 };
        prop_assert_eq!(*base, skipped - 1);
        prop_assert_eq!(carried.len(), len - skipped);
        prop_assert_eq!(carried.last(), revisions.last());
    }

    /// An NVR survives display and parse, and names its tag.
    #[test]
    fn nvr_round_trips(
        version in "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,3}",
        build in 1u32..400,
        fc in 20u32..40,
    ) {
        let text = format!("kernel-{version}-{build}.fc{fc}");
        let nvr = NvrTag::parse(&text).unwrap();

        prop_assert_eq!(nvr.name(), "kernel");
        prop_assert_eq!(nvr.version(), version.as_str());
        prop_assert_eq!(nvr.to_string(), text.clone());
        let tag = nvr.tag_name();
        prop_assert_eq!(tag.as_str(), text.as_str());
    }
}
