//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`TagName`] - Validated Git tag name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`NvrTag`] - Name-version-release identifier of one build
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use kexplode::core::types::{BranchName, NvrTag, Oid, TagName};
//!
//! let branch = BranchName::new("rawhide").unwrap();
//! let tag = TagName::new("kernel-4.2.0-1.fc23").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let nvr = NvrTag::parse("kernel-4.2.0-1.fc23").unwrap();
//! assert_eq!(nvr.release(), "1.fc23");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid name-version-release: {0}")]
    InvalidNvr(String),
}

/// Check a short ref name (branch or tag) against Git's refname rules.
///
/// Returns a description of the first violated rule.
fn check_ref_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name == "@" {
        return Err("name cannot be '@' (reserved)".into());
    }
    if name.starts_with('-') {
        return Err("name cannot start with '-'".into());
    }
    if name.ends_with('/') {
        return Err("name cannot end with '/'".into());
    }

    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Err(format!("name cannot contain '{bad}'"));
        }
    }

    const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("name cannot contain control characters".into());
    }

    for component in name.split('/').filter(|c| !c.is_empty()) {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }

    Ok(())
}

/// A validated Git branch name.
///
/// # Example
///
/// ```
/// use kexplode::core::types::BranchName;
///
/// let name = BranchName::new("f23").unwrap();
/// assert_eq!(name.as_str(), "f23");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_name(&name).map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// Full ref for the local branch (`refs/heads/<name>`).
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// Full ref for the remote-tracking branch (`refs/remotes/<remote>/<name>`).
    pub fn remote_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{}/{}", remote, self.0)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git tag name.
///
/// Both upstream release tags (`v5.10.3`) and build tags
/// (`kernel-5.10.3-200.fc33`) are represented by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a new validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTagName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_name(&name).map_err(TypeError::InvalidTagName)?;
        Ok(Self(name))
    }

    /// Full ref for the tag (`refs/tags/<name>`).
    pub fn tag_ref(&self) -> String {
        format!("refs/tags/{}", self.0)
    }

    /// Get the tag name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> Self {
        name.0
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use kexplode::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// The OID is normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name-version-release identifier of one build.
///
/// The release component encodes the target distribution, e.g.
/// `kernel-4.2.0-1.fc23` has release `1.fc23`.
///
/// # Example
///
/// ```
/// use kexplode::core::types::NvrTag;
///
/// let nvr = NvrTag::new("kernel", "5.19.0", "0.rc1.20220606git.1.fc37").unwrap();
/// assert_eq!(nvr.to_string(), "kernel-5.19.0-0.rc1.20220606git.1.fc37");
/// assert_eq!(nvr.name(), "kernel");
///
/// let parsed = NvrTag::parse("kernel-5.19.0-0.rc1.20220606git.1.fc37").unwrap();
/// assert_eq!(parsed, nvr);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NvrTag {
    name: String,
    version: String,
    release: String,
}

impl NvrTag {
    /// Compose an NVR from its three fields.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidNvr` if any field is empty, or if version
    /// or release contain a `-`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let (name, version, release) = (name.into(), version.into(), release.into());
        if name.is_empty() || version.is_empty() || release.is_empty() {
            return Err(TypeError::InvalidNvr(format!(
                "empty field in '{name}-{version}-{release}'"
            )));
        }
        if version.contains('-') || release.contains('-') {
            return Err(TypeError::InvalidNvr(format!(
                "version and release cannot contain '-': '{name}-{version}-{release}'"
            )));
        }
        let nvr = Self {
            name,
            version,
            release,
        };
        // An NVR also names the resulting tag.
        check_ref_name(&nvr.to_string()).map_err(TypeError::InvalidNvr)?;
        Ok(nvr)
    }

    /// Parse a `name-version-release` string.
    ///
    /// The name may itself contain dashes; version and release are the last
    /// two dash-separated fields.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut parts = s.rsplitn(3, '-');
        let release = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        let name = parts
            .next()
            .ok_or_else(|| TypeError::InvalidNvr(format!("expected name-version-release: '{s}'")))?;
        Self::new(name, version, release)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// The NVR as a tag name for the reconstructed tree.
    pub fn tag_name(&self) -> TagName {
        TagName(self.to_string())
    }
}

impl std::fmt::Display for NvrTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.version, self.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("rawhide").is_ok());
            assert!(BranchName::new("f23").is_ok());
            assert!(BranchName::new("stable/linux-5.10.y").is_ok());
        }

        #[test]
        fn invalid_branch_names() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("-f23").is_err());
            assert!(BranchName::new("a..b").is_err());
            assert!(BranchName::new("a b").is_err());
            assert!(BranchName::new("x.lock").is_err());
            assert!(BranchName::new("@").is_err());
        }

        #[test]
        fn refs() {
            let b = BranchName::new("rawhide").unwrap();
            assert_eq!(b.local_ref(), "refs/heads/rawhide");
            assert_eq!(b.remote_ref("origin"), "refs/remotes/origin/rawhide");
        }

        #[test]
        fn serde_roundtrip() {
            let b = BranchName::new("f22").unwrap();
            let json = serde_json::to_string(&b).unwrap();
            assert_eq!(json, "\"f22\"");
            let back: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(back, b);
            assert!(serde_json::from_str::<BranchName>("\"a..b\"").is_err());
        }
    }

    mod tag_name {
        use super::*;

        #[test]
        fn release_tags_are_valid() {
            assert!(TagName::new("v5.10").is_ok());
            assert!(TagName::new("v5.20-rc1").is_ok());
            assert!(TagName::new("kernel-4.2.0-1.fc23").is_ok());
        }

        #[test]
        fn tag_ref() {
            let t = TagName::new("v5.10.3").unwrap();
            assert_eq!(t.tag_ref(), "refs/tags/v5.10.3");
        }

        #[test]
        fn invalid_rejected() {
            assert!(matches!(
                TagName::new("v5:10"),
                Err(TypeError::InvalidTagName(_))
            ));
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_sha1() {
            assert!(Oid::new("abc123def4567890abc123def4567890abc12345").is_ok());
        }

        #[test]
        fn normalizes_to_lowercase() {
            let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
            assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
        }

        #[test]
        fn invalid_length() {
            assert!(Oid::new("abc123").is_err());
        }

        #[test]
        fn non_hex_rejected() {
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }
    }

    mod nvr {
        use super::*;

        #[test]
        fn parse_splits_last_two_fields() {
            let nvr = NvrTag::parse("kernel-tools-5.10.3-200.fc33").unwrap();
            assert_eq!(nvr.name(), "kernel-tools");
            assert_eq!(nvr.version(), "5.10.3");
            assert_eq!(nvr.release(), "200.fc33");
        }

        #[test]
        fn parse_rejects_short_input() {
            assert!(NvrTag::parse("kernel-5.10").is_err());
            assert!(NvrTag::parse("kernel").is_err());
        }

        #[test]
        fn empty_fields_rejected() {
            assert!(NvrTag::new("kernel", "", "1.fc23").is_err());
        }

        #[test]
        fn tag_name_matches_display() {
            let nvr = NvrTag::new("kernel", "4.2.0", "1.fc23").unwrap();
            assert_eq!(nvr.tag_name().as_str(), "kernel-4.2.0-1.fc23");
        }
    }
}
