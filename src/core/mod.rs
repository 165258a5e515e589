//! core
//!
//! Core domain types, configuration, and process coordination.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, TagName, Oid, NvrTag
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Prepared tree and lock file locations
//! - [`ops`] - Working-tree lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
