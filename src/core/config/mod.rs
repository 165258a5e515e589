//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags ([`Overrides`])
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `--config <FILE>` if given
//! 2. `$KEXPLODE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/kexplode/config.toml`
//! 4. `~/.kexplode/config.toml`
//!
//! A file named explicitly must exist; the others are skipped if absent.
//!
//! # Example
//!
//! ```no_run
//! use kexplode::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("package: {}", config.package());
//! println!("upstream: {:?}", config.linux_git_dir());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default event instance.
pub const DEFAULT_INSTANCE: &str = "primary";
/// Default package name.
pub const DEFAULT_PACKAGE: &str = "kernel";
/// Default destination of auxiliary files in the upstream tree.
pub const DEFAULT_AUXILIARY_DEST: &str = "fedora/configs";
/// Default packaging tool.
pub const DEFAULT_FEDPKG: &str = "fedpkg";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("{key} is not configured (set it in config.toml or pass {flag})")]
    Missing {
        key: &'static str,
        flag: &'static str,
    },
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pkg_git_dir: Option<PathBuf>,
    pub linux_git_dir: Option<PathBuf>,
    pub koji_hub: Option<String>,
}

/// Effective configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    file: FileConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or
    /// if `explicit` names a missing file. Missing default files are not
    /// an error (defaults are used).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(|key| std::env::var(key).ok(), dirs::home_dir()),
        };

        match path {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read one config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = Self::parse(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        Ok(Self {
            file,
            loaded_from: Some(path.to_path_buf()),
        })
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<FileConfig, ConfigError> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Find the first existing default config file.
    fn locate(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Option<PathBuf> {
        let candidates = [
            env("KEXPLODE_CONFIG").map(PathBuf::from),
            env("XDG_CONFIG_HOME").map(|xdg| PathBuf::from(xdg).join("kexplode/config.toml")),
            home.map(|h| h.join(".kexplode/config.toml")),
        ];
        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.pkg_git_dir.is_some() {
            self.file.pkg_git_dir = overrides.pkg_git_dir;
        }
        if overrides.linux_git_dir.is_some() {
            self.file.linux_git_dir = overrides.linux_git_dir;
        }
        if overrides.koji_hub.is_some() {
            self.file.koji_hub = overrides.koji_hub;
        }
        self
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Packaging repository checkout.
    pub fn pkg_git_dir(&self) -> Result<&Path, ConfigError> {
        self.file.pkg_git_dir.as_deref().ok_or(ConfigError::Missing {
            key: "pkg_git_dir",
            flag: "--pkg-dir",
        })
    }

    /// Upstream repository checkout.
    pub fn linux_git_dir(&self) -> Result<&Path, ConfigError> {
        self.file.linux_git_dir.as_deref().ok_or(ConfigError::Missing {
            key: "linux_git_dir",
            flag: "--linux-dir",
        })
    }

    /// Build system endpoint.
    pub fn koji_hub(&self) -> Result<&str, ConfigError> {
        self.file.koji_hub.as_deref().ok_or(ConfigError::Missing {
            key: "koji_hub",
            flag: "--hub",
        })
    }

    pub fn instance(&self) -> &str {
        self.file.instance.as_deref().unwrap_or(DEFAULT_INSTANCE)
    }

    pub fn package(&self) -> &str {
        self.file.package.as_deref().unwrap_or(DEFAULT_PACKAGE)
    }

    /// Architecture of the prepared tree; defaults to the host's.
    pub fn arch(&self) -> &str {
        self.file.arch.as_deref().unwrap_or(std::env::consts::ARCH)
    }

    /// Auxiliary file source, resolved against the packaging tree when
    /// relative. `None` when not configured.
    pub fn auxiliary_dir(&self) -> Option<PathBuf> {
        let dir = self.file.auxiliary_dir.as_ref()?;
        match (&self.file.pkg_git_dir, dir.is_relative()) {
            (Some(pkg), true) => Some(pkg.join(dir)),
            _ => Some(dir.clone()),
        }
    }

    pub fn auxiliary_dest(&self) -> &Path {
        self.file
            .auxiliary_dest
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_AUXILIARY_DEST))
    }

    pub fn fedpkg(&self) -> &str {
        self.file.fedpkg.as_deref().unwrap_or(DEFAULT_FEDPKG)
    }

    pub fn require_patches(&self) -> bool {
        self.file.require_patches.unwrap_or(false)
    }

    /// The file the configuration came from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
