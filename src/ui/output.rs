//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout and respect the quiet flag. Progress is logged
//! through `tracing`; [`Verbosity::log_filter`] picks the default filter.

use std::fmt::Display;

use crate::engine::{PatchSet, PipelineOutcome, TagOutcome};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - results only, warnings and errors in the log
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn log_filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per patch: short commit and subject.
pub fn format_patch_set(patches: &PatchSet) -> String {
    let mut lines = vec![format!(
        "{} patch(es) after {}",
        patches.len(),
        patches.base().short(12)
    )];
    let entries: Vec<String> = patches
        .entries()
        .iter()
        .map(|p| format!("{} {}", p.commit.short(12), p.subject()))
        .collect();
    if !entries.is_empty() {
        lines.push(format_list(&entries, "  "));
    }
    lines.join("\n")
}

/// Summary of a pipeline run.
pub fn format_outcome(outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Reconstructed { tree, patch_file } => {
            let tag = match tree.tag_outcome {
                TagOutcome::Created => "created",
                TagOutcome::Unchanged => "unchanged",
            };
            format!(
                "{} on {}: {} patch(es) over {}, tip {} (tag {})\npatches: {}",
                tree.tag,
                tree.branch,
                tree.applied,
                tree.base.short(12),
                tree.tip.short(12),
                tag,
                patch_file.display()
            )
        }
        PipelineOutcome::Skipped { nvr, suffix } => {
            format!("{}: distribution {} is retired, skipped", nvr, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{NvrTag, Oid};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false).log_filter(), "info");
    }

    #[test]
    fn empty_patch_set() {
        let set = PatchSet::new(
            Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap(),
            Vec::new(),
        );
        assert_eq!(format_patch_set(&set), "0 patch(es) after 0123456789ab");
    }

    #[test]
    fn skipped_outcome() {
        let outcome = PipelineOutcome::Skipped {
            nvr: NvrTag::parse("kernel-3.19.0-1.fc21").unwrap(),
            suffix: "f21".into(),
        };
        assert_eq!(
            format_outcome(&outcome),
            "kernel-3.19.0-1.fc21: distribution f21 is retired, skipped"
        );
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }
}
