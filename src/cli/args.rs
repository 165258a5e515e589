//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <FILE>`: Read configuration from this file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--pkg-dir`, `--linux-dir`, `--hub`: Override configured locations

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::Overrides;

/// kexplode - rebuild exploded upstream-plus-patches kernel trees from packaging builds
#[derive(Parser, Debug)]
#[command(name = "kexplode")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Packaging repository checkout
    #[arg(long, global = true, value_name = "DIR")]
    pub pkg_dir: Option<PathBuf>,

    /// Upstream repository checkout
    #[arg(long, global = true, value_name = "DIR")]
    pub linux_dir: Option<PathBuf>,

    /// Build system hub URL
    #[arg(long, global = true, value_name = "URL")]
    pub hub: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Configuration values given as flags.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            pkg_git_dir: self.pkg_dir.clone(),
            linux_git_dir: self.linux_dir.clone(),
            koji_hub: self.hub.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconstruct the exploded tree for one build
    #[command(
        long_about = "Reconstruct the exploded tree for one build.\n\n\
            Looks the build up on the hub, checks the packaging tree out at the \
            build's commit, prepares it, and replays its patches onto the upstream \
            tree. The result is tagged with the build's name-version-release.",
        after_help = "\
EXAMPLES:
    kexplode build 680001
    kexplode build kernel-4.2.3-300.fc23"
    )]
    Build {
        /// Build id or name-version-release
        build: String,

        /// Do not update remotes before checking out
        #[arg(long)]
        no_fetch: bool,
    },

    /// Process build events from stdin, one JSON document per line
    #[command(after_help = "\
EXAMPLES:
    event-tail --topic buildsys.build.state.change | kexplode listen")]
    Listen {
        /// Do not update remotes before checking out
        #[arg(long)]
        no_fetch: bool,
    },

    /// Print the upstream base a package description resolves to
    Resolve {
        /// Package description file
        spec: PathBuf,

        /// File holding the stored upstream commit (default: `gitrev` next to SPEC)
        #[arg(long, value_name = "FILE")]
        gitrev: Option<PathBuf>,
    },

    /// List the patches carried in a prepared tree
    Extract {
        /// Prepared tree (a git repository created by the packaging tool)
        prepared_tree: PathBuf,

        /// Stable update level; nonzero means the second commit is the baseline
        #[arg(long, default_value_t = 0)]
        stable_update: u32,

        /// Also write the series as an mbox to this file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
