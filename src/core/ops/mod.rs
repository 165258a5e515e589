//! core::ops
//!
//! Process-level coordination.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive lock on the upstream working tree
//!
//! The pipeline itself takes no locks; the command layer acquires
//! [`WorkTreeLock`] before running it.

pub mod lock;

pub use lock::{LockError, WorkTreeLock};
