//! buildsys
//!
//! The build system side: finding out what a build was made from, and
//! reacting to builds as they complete.
//!
//! # Modules
//!
//! - `traits`: [`BuildLookup`] trait and [`BuildIdentity`]
//! - [`koji`]: Koji hub client over XML-RPC
//! - [`xmlrpc`]: Request encoding and response decoding
//! - [`mock`]: In-memory lookup for deterministic testing
//! - [`event`]: Build state change events and their filter
//! - [`dispatcher`]: Sequential event loop feeding the pipeline
//!
//! # Example
//!
//! ```ignore
//! use kexplode::buildsys::{BuildLookup, BuildRef, KojiHub};
//!
//! let hub = KojiHub::new("https://koji.example.org/kojihub");
//! let build = hub.lookup(&BuildRef::parse("680001")).await?;
//! println!("{} built from {}", build.nvr, build.dist_git_commit);
//! ```

pub mod dispatcher;
pub mod event;
pub mod koji;
pub mod mock;
mod traits;
pub mod xmlrpc;

pub use dispatcher::{DispatchError, DispatchStats, Dispatcher};
pub use event::{BuildTrigger, EventFilter, Selection};
pub use koji::KojiHub;
pub use traits::*;
