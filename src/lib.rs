//! kexplode - rebuild exploded kernel trees from packaging builds
//!
//! A distribution kernel is packaged as an upstream tarball plus a stack of
//! patches and a package description. kexplode turns each completed build
//! back into a plain git history on top of upstream: the upstream base,
//! one commit per carried patch, one commit of distribution config files,
//! and a tag named after the build.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`kernel`] - Version metadata, base reference resolution, branch mapping
//! - [`engine`] - Patch extraction, tree reconstruction, the per-build pipeline
//! - [`buildsys`] - Build lookup, build events, the event loop
//! - [`packaging`] - The packaging tool that prepares trees
//! - [`core`] - Domain types, configuration, paths, locking
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. The reconstructed branch is always reset to a resolved upstream base
//! 2. A failed patch never leaves a partially rewritten branch
//! 3. Reconstruction is idempotent; a tag is never moved
//! 4. Builds are processed one at a time

pub mod buildsys;
pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod kernel;
pub mod packaging;
pub mod ui;
