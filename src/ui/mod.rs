//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All command results go through this module so quiet mode is handled in
//! one place.

pub mod output;
