//! engine
//!
//! Turns a prepared packaging tree into a reconstructed upstream tree.
//!
//! # Modules
//!
//! - [`extract`] - Read the carried patch stack out of a prepared tree
//! - [`reconstruct`] - Replay a patch stack onto the upstream tree and tag it
//! - [`pipeline`] - Run one build through every stage
//!
//! # Invariants
//!
//! - The upstream branch is a derived artifact: it is reset, never merged
//! - A failed patch leaves the branch at the base, not half-applied
//! - Re-running the same build yields the same tree and an unchanged tag
//!
//! # Example
//!
//! ```ignore
//! use kexplode::engine::pipeline::{Pipeline, PipelineSettings};
//! use kexplode::packaging::Fedpkg;
//!
//! let pipeline = Pipeline::new(&packaging, &upstream, &Fedpkg::default(), PipelineSettings::default());
//! match pipeline.create_tree(&build)? {
//!     PipelineOutcome::Reconstructed { tree, .. } => println!("tagged {}", tree.tag),
//!     PipelineOutcome::Skipped { suffix, .. } => println!("{} is retired", suffix),
//! }
//! ```

pub mod extract;
pub mod pipeline;
pub mod reconstruct;

pub use extract::{ExtractError, PatchEntry, PatchSet, PatchStackExtractor};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, PipelineSettings};
pub use reconstruct::{
    AuxiliaryFiles, ReconstructError, ReconstructState, ReconstructedTree, TagOutcome,
    TreeReconstructor,
};
