//! engine::extract
//!
//! Extract the patch stack carried on top of upstream in a prepared
//! packaging tree.
//!
//! # Prepared tree layout
//!
//! The packaging tool lays the tree out as:
//!
//! ```text
//! r0  bulk upstream import
//! r1  stable update patch        (only when stable_update != 0)
//! r2.. one commit per carried patch
//! ```
//!
//! The baseline is `r0`, or `r1` when a stable update is carried, because
//! the stable patch is already part of the resolved upstream base. Every
//! commit after the baseline, oldest first, is a patch to re-apply.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::Oid;
use crate::git::{Git, GitError, Identity};
use crate::kernel::metadata::VersionMetadata;

/// Errors from patch extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The prepared tree has no commits.
    #[error("prepared tree has no history")]
    EmptyHistory,

    /// A stable update is declared but the tree has no commit carrying it.
    #[error("stable update declared but prepared tree has only {revisions} revision(s)")]
    MissingStableCommit {
        /// Length of the revision list
        revisions: usize,
    },

    /// A non-empty patch set was required and none exists.
    #[error("no carried patches after baseline {base}")]
    EmptyPatchSet {
        /// The baseline revision
        base: Oid,
    },

    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// Writing the patch file failed.
    #[error("failed to write patch file: {0}")]
    Io(#[from] std::io::Error),
}

/// One carried patch: the commit it came from, its authorship and message,
/// and the diff it introduces.
///
/// The diff is raw bytes: carried files may hold any encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub commit: Oid,
    pub author: Identity,
    pub message: String,
    pub diff: Vec<u8>,
}

impl PatchEntry {
    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Render as one message of a `git format-patch --stdout` series.
    pub fn to_mbox(&self, number: usize, total: usize) -> Vec<u8> {
        let body = self
            .message
            .split_once('\n')
            .map(|(_, rest)| rest.trim())
            .unwrap_or("");

        let mut head = format!(
            "From {} Mon Sep 17 00:00:00 2001\nFrom: {} <{}>\nDate: {}\nSubject: [PATCH {}/{}] {}\n\n",
            self.commit,
            self.author.name,
            self.author.email,
            self.author.when.to_rfc2822(),
            number,
            total,
            self.subject()
        );
        if !body.is_empty() {
            head.push_str(body);
            head.push('\n');
        }
        head.push_str("---\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.diff);
        if !self.diff.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.extend_from_slice(b"-- \nkexplode\n\n");
        out
    }
}

/// The ordered patches carried after a baseline revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    base: Oid,
    entries: Vec<PatchEntry>,
}

impl PatchSet {
    pub fn new(base: Oid, entries: Vec<PatchEntry>) -> Self {
        Self { base, entries }
    }

    /// The excluded baseline revision.
    pub fn base(&self) -> &Oid {
        &self.base
    }

    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The whole series as a single mbox.
    pub fn to_mbox(&self) -> Vec<u8> {
        let total = self.entries.len();
        self.entries
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| entry.to_mbox(i + 1, total))
            .collect()
    }

    /// Write the series to `path`.
    pub fn write_mbox(&self, path: &Path) -> Result<(), ExtractError> {
        std::fs::write(path, self.to_mbox())?;
        Ok(())
    }
}

/// Split an oldest-first revision list into the baseline and the revisions
/// after it.
///
/// # Example
///
/// ```
/// use kexplode::engine::extract::carried_range;
///
/// let revs = ["r1", "r2", "r3", "r4", "r5"];
/// let (base, carried) = carried_range(&revs, 0).unwrap();
/// assert_eq!((*base, carried.len()), ("r1", 4));
///
/// let (base, carried) = carried_range(&revs, 2).unwrap();
/// assert_eq!(*base, "r2");
/// assert_eq!(carried, &revs[2..]);
/// ```
pub fn carried_range<T>(revisions: &[T], stable_update: u32) -> Result<(&T, &[T]), ExtractError> {
    if revisions.is_empty() {
        return Err(ExtractError::EmptyHistory);
    }

    let baseline = if stable_update != 0 { 1 } else { 0 };
    let base = revisions
        .get(baseline)
        .ok_or(ExtractError::MissingStableCommit {
            revisions: revisions.len(),
        })?;

    Ok((base, &revisions[baseline + 1..]))
}

/// Reads the carried patch stack out of a prepared packaging tree.
#[derive(Debug, Clone, Default)]
pub struct PatchStackExtractor {
    require_non_empty: bool,
}

impl PatchStackExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`ExtractError::EmptyPatchSet`] instead of returning an
    /// empty set.
    pub fn require_non_empty(mut self, require: bool) -> Self {
        self.require_non_empty = require;
        self
    }

    /// Extract the patch set from `prepared` for the given metadata.
    ///
    /// Merge commits and commits without a diff are skipped, matching what
    /// `git format-patch` emits.
    pub fn extract(&self, prepared: &Git, meta: &VersionMetadata) -> Result<PatchSet, ExtractError> {
        self.extract_after(prepared, meta.stable_update)
    }

    /// Like [`extract`](Self::extract), given only the stable update level.
    pub fn extract_after(&self, prepared: &Git, stable_update: u32) -> Result<PatchSet, ExtractError> {
        let revisions = prepared.rev_list_reverse()?;
        let (base, carried) = carried_range(&revisions, stable_update)?;
        debug!(
            base = %base.short(12),
            revisions = revisions.len(),
            carried = carried.len(),
            "computed carried revision range"
        );

        let mut entries = Vec::with_capacity(carried.len());
        for oid in carried {
            let info = prepared.commit_info(oid)?;
            if info.parent_count > 1 {
                warn!(commit = %oid.short(12), "skipping merge commit in prepared tree");
                continue;
            }

            let diff = prepared.commit_diff(oid)?;
            if diff.iter().all(u8::is_ascii_whitespace) {
                warn!(commit = %oid.short(12), subject = %info.summary, "skipping empty commit");
                continue;
            }

            entries.push(PatchEntry {
                commit: info.oid,
                author: info.author,
                message: info.message,
                diff,
            });
        }

        if entries.is_empty() && self.require_non_empty {
            return Err(ExtractError::EmptyPatchSet { base: base.clone() });
        }

        Ok(PatchSet::new(base.clone(), entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(message: &str, diff: &str) -> PatchEntry {
        PatchEntry {
            commit: Oid::new("abc123def4567890abc123def4567890abc12345").unwrap(),
            author: Identity {
                name: "Kernel Dev".into(),
                email: "dev@example.com".into(),
                when: chrono::FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2015, 6, 1, 12, 0, 0)
                    .unwrap(),
            },
            message: message.into(),
            diff: diff.as_bytes().to_vec(),
        }
    }

    fn text(mbox: Vec<u8>) -> String {
        String::from_utf8(mbox).unwrap()
    }

    #[test]
    fn range_without_stable_update_starts_after_first() {
        let revs = [1, 2, 3, 4, 5];
        let (base, carried) = carried_range(&revs, 0).unwrap();
        assert_eq!(*base, 1);
        assert_eq!(carried, &[2, 3, 4, 5]);
    }

    #[test]
    fn range_with_stable_update_starts_after_second() {
        let revs = [1, 2, 3, 4, 5];
        let (base, carried) = carried_range(&revs, 2).unwrap();
        assert_eq!(*base, 2);
        assert_eq!(carried, &[3, 4, 5]);
    }

    #[test]
    fn range_can_be_empty() {
        let (_, carried) = carried_range(&[1], 0).unwrap();
        assert!(carried.is_empty());
        let (_, carried) = carried_range(&[1, 2], 1).unwrap();
        assert!(carried.is_empty());
    }

    #[test]
    fn range_errors() {
        let empty: [u8; 0] = [];
        assert!(matches!(
            carried_range(&empty, 0),
            Err(ExtractError::EmptyHistory)
        ));
        assert!(matches!(
            carried_range(&[1], 3),
            Err(ExtractError::MissingStableCommit { revisions: 1 })
        ));
    }

    #[test]
    fn mbox_has_headers_body_and_diff() {
        let e = entry(
            "Fix the frobnicator\n\nIt was broken.\n",
            "diff --git a/f b/f\n",
        );
        let mbox = text(e.to_mbox(2, 7));
        assert!(mbox.starts_with("From abc123def4567890abc123def4567890abc12345 "));
        assert!(mbox.contains("From: Kernel Dev <dev@example.com>\n"));
        assert!(mbox.contains("Subject: [PATCH 2/7] Fix the frobnicator\n"));
        assert!(mbox.contains("\n\nIt was broken.\n---\ndiff --git a/f b/f\n"));
    }

    #[test]
    fn subject_only_message() {
        let e = entry("One liner", "diff --git a/f b/f\n");
        assert_eq!(e.subject(), "One liner");
        assert!(text(e.to_mbox(1, 1)).contains("One liner\n\n---\n"));
    }

    #[test]
    fn series_mbox_numbers_patches() {
        let set = PatchSet::new(
            Oid::new("0123456789012345678901234567890123456789").unwrap(),
            vec![entry("a", "d1\n"), entry("b", "d2\n")],
        );
        let mbox = text(set.to_mbox());
        assert!(mbox.contains("[PATCH 1/2] a"));
        assert!(mbox.contains("[PATCH 2/2] b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn mbox_keeps_diff_bytes_verbatim() {
        let mut e = entry("Latin-1 comment", "");
        e.diff = b"+/* Fran\xe7ois */\n".to_vec();
        let mbox = e.to_mbox(1, 1);
        assert!(mbox
            .windows(e.diff.len())
            .any(|window| window == e.diff.as_slice()));
    }
}
