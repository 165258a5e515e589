//! kernel
//!
//! Kernel package versioning: what the package description declares, which
//! upstream revision that names, and which branches a build belongs to.
//!
//! # Modules
//!
//! - [`metadata`] - Parse versioning fields from the package description
//! - [`base`] - Resolve versioning fields to an upstream tag or commit
//! - [`branch`] - Map a distribution suffix to packaging/upstream branches
//!
//! Everything here is pure; no repository is touched.

pub mod base;
pub mod branch;
pub mod metadata;

pub use base::{resolve, BaseReference, ResolveError};
pub use branch::{branch_for_build, BranchError, BranchMapping};
pub use metadata::{SpecError, VersionMetadata};
