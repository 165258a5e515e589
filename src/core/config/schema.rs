//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Validation
//!
//! Values are validated after parsing: paths must be non-empty, the hub
//! must be an http(s) URL, and the auxiliary destination must be relative.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Contents of `config.toml`.
///
/// # Example
///
/// ```toml
/// pkg_git_dir = "/srv/kernel"
/// linux_git_dir = "/srv/linux"
/// koji_hub = "https://koji.fedoraproject.org/kojihub"
/// instance = "primary"
/// package = "kernel"
/// arch = "x86_64"
/// auxiliary_dir = "configs"
/// auxiliary_dest = "fedora/configs"
/// fedpkg = "fedpkg"
/// require_patches = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Packaging (dist-git) repository checkout
    pub pkg_git_dir: Option<PathBuf>,

    /// Upstream kernel repository checkout
    pub linux_git_dir: Option<PathBuf>,

    /// Build system XML-RPC endpoint
    pub koji_hub: Option<String>,

    /// Build system instance whose events are processed
    pub instance: Option<String>,

    /// Package name whose builds are processed
    pub package: Option<String>,

    /// Architecture of the prepared tree
    pub arch: Option<String>,

    /// Distribution files to commit after the patches
    pub auxiliary_dir: Option<PathBuf>,

    /// Where the distribution files land in the upstream tree
    pub auxiliary_dest: Option<PathBuf>,

    /// Packaging tool binary
    pub fedpkg: Option<String>,

    /// Fail when a build carries no patches
    pub require_patches: Option<bool>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, path) in [
            ("pkg_git_dir", &self.pkg_git_dir),
            ("linux_git_dir", &self.linux_git_dir),
            ("auxiliary_dir", &self.auxiliary_dir),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{} must not be empty", key)));
            }
        }

        if let Some(hub) = &self.koji_hub {
            if !(hub.starts_with("http://") || hub.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "koji_hub '{}' must be an http(s) URL",
                    hub
                )));
            }
        }

        if let Some(dest) = &self.auxiliary_dest {
            if !crate::core::paths::is_contained(dest) {
                return Err(ConfigError::InvalidValue(format!(
                    "auxiliary_dest '{}' must be a relative path inside the upstream tree",
                    dest.display()
                )));
            }
        }

        for (key, value) in [
            ("instance", &self.instance),
            ("package", &self.package),
            ("arch", &self.arch),
            ("fedpkg", &self.fedpkg),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_file_parses() {
        let config: FileConfig = toml::from_str(
            r#"
            pkg_git_dir = "/srv/kernel"
            linux_git_dir = "/srv/linux"
            koji_hub = "https://koji.example.org/kojihub"
            instance = "primary"
            package = "kernel"
            arch = "x86_64"
            auxiliary_dir = "configs"
            auxiliary_dest = "fedora/configs"
            fedpkg = "/usr/bin/fedpkg"
            require_patches = true
            "#,
        )
        .unwrap();
        assert_eq!(config.linux_git_dir, Some(PathBuf::from("/srv/linux")));
        assert_eq!(config.require_patches, Some(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("trunk = \"main\"");
        assert!(result.is_err());
    }

    #[test]
    fn hub_must_be_url() {
        let config = FileConfig {
            koji_hub: Some("koji.example.org".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn auxiliary_dest_must_be_relative() {
        let config = FileConfig {
            auxiliary_dest: Some(PathBuf::from("/etc/configs")),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn auxiliary_dest_must_stay_inside_the_tree() {
        for dest in ["", ".", "..", "configs/../..", ".git/hooks"] {
            let config = FileConfig {
                auxiliary_dest: Some(PathBuf::from(dest)),
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("auxiliary_dest"), "{dest:?}: {err}");
        }
    }

    #[test]
    fn auxiliary_dest_dot_is_rejected_from_toml() {
        let config: FileConfig = toml::from_str("auxiliary_dest = \".\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_package_rejected() {
        let config = FileConfig {
            package: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
