//! kernel::metadata
//!
//! Versioning fields declared by the kernel package description.
//!
//! # Grammar
//!
//! A line declares a field when it matches
//!
//! ```text
//! %global <identifier> <value starting with a digit>
//! %define <identifier> <value starting with a digit>
//! ```
//!
//! Recognized identifiers are `released_kernel`, `base_sublevel`, `rcrev`,
//! `gitrev`, `stable_update` and `kversion`. Anything else is ignored, and
//! a later declaration of the same identifier replaces an earlier one.
//!
//! # Example
//!
//! ```
//! use kexplode::kernel::metadata::VersionMetadata;
//!
//! let spec = "\
//! %global released_kernel 1
//! %define base_sublevel 10
//! %define stable_update 3
//! %define rcrev 0
//! %define gitrev 0
//! %global kversion 5.10
//! ";
//! let meta = VersionMetadata::parse(spec).unwrap();
//! assert!(meta.released_kernel);
//! assert_eq!(meta.major_version, "5");
//! assert_eq!(meta.stable_update, 3);
//! assert_eq!(meta.tar_suffix, None);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%(global|define)\s+(?P<var>\w+)\s+(?P<val>\d+.*)").expect("valid regex")
});

/// Identifiers the parser keeps; all must be present after a full scan.
const FIELDS: [&str; 6] = [
    "released_kernel",
    "base_sublevel",
    "rcrev",
    "gitrev",
    "stable_update",
    "kversion",
];

/// Errors from reading the package description.
#[derive(Debug, Error)]
pub enum SpecError {
    /// No line in the text is a `%global`/`%define` declaration.
    #[error("no %global/%define declarations found in package description")]
    Malformed,

    /// A required field was never declared.
    #[error("required field '{field}' is not declared")]
    MissingField {
        /// The missing identifier
        field: &'static str,
    },

    /// A field was declared with a value that cannot be interpreted.
    #[error("invalid value for '{field}': '{value}'")]
    InvalidValue {
        /// The identifier
        field: &'static str,
        /// The raw declared value
        value: String,
    },

    /// The description file could not be read.
    #[error("failed to read package description '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Kernel versioning fields of one package description.
///
/// `git_revision` is `"0"` when no upstream snapshot commit is recorded,
/// `rc_revision` and `stable_update` are `0` when absent in meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMetadata {
    pub released_kernel: bool,
    pub major_version: String,
    pub base_sublevel: u32,
    pub rc_revision: u32,
    pub git_revision: String,
    pub stable_update: u32,
    /// Set when the sources come from an upstream RC tarball, e.g. `-rc1`.
    pub tar_suffix: Option<String>,
}

impl VersionMetadata {
    /// Parse the versioning fields out of package description text.
    ///
    /// # Errors
    ///
    /// - [`SpecError::Malformed`] if no line is a declaration
    /// - [`SpecError::MissingField`] if a recognized field is never declared
    /// - [`SpecError::InvalidValue`] if a numeric field has no leading number
    pub fn parse(text: &str) -> Result<Self, SpecError> {
        let mut declared = 0usize;
        let mut values: HashMap<&'static str, String> = HashMap::new();

        for line in text.lines() {
            let Some(caps) = DECLARATION_RE.captures(line) else {
                continue;
            };
            declared += 1;

            let var = &caps["var"];
            if let Some(&field) = FIELDS.iter().find(|f| **f == var) {
                values.insert(field, caps["val"].trim_end().to_string());
            }
        }

        if declared == 0 {
            return Err(SpecError::Malformed);
        }

        let raw = |field: &'static str| declared_value(&values, field);

        let released_kernel = leading_number("released_kernel", raw("released_kernel")?)? != 0;
        let base_sublevel = leading_number("base_sublevel", raw("base_sublevel")?)?;
        let rc_revision = leading_number("rcrev", raw("rcrev")?)?;
        let stable_update = leading_number("stable_update", raw("stable_update")?)?;
        let git_revision = first_token(raw("gitrev")?).to_string();

        let kversion = first_token(raw("kversion")?);
        let major_version = kversion
            .split_once('.')
            .map_or(kversion, |(major, _)| major)
            .to_string();
        let tar_suffix = kversion
            .contains("-rc")
            .then(|| format!("-rc{rc_revision}"));

        Ok(Self {
            released_kernel,
            major_version,
            base_sublevel,
            rc_revision,
            git_revision,
            stable_update,
            tar_suffix,
        })
    }

    /// Read and parse a package description file.
    pub fn from_file(path: &Path) -> Result<Self, SpecError> {
        let text = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Whether an upstream snapshot commit is recorded (`gitrev != 0`).
    pub fn has_git_revision(&self) -> bool {
        self.git_revision != "0"
    }
}

fn declared_value<'a>(
    values: &'a HashMap<&'static str, String>,
    field: &'static str,
) -> Result<&'a str, SpecError> {
    values
        .get(field)
        .map(String::as_str)
        .ok_or(SpecError::MissingField { field })
}

/// First whitespace-separated token of a declared value.
fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or(value)
}

/// Parse the run of digits a declared value starts with.
fn leading_number(field: &'static str, value: &str) -> Result<u32, SpecError> {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().map_err(|_| SpecError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAWHIDE_RC: &str = "\
# Kernel package description
%global released_kernel 0
%define base_sublevel 19
%define stable_update 0
%define rcrev 1
%define gitrev 0
%global kversion 5.19
Name: kernel
";

    #[test]
    fn parses_rc_kernel() {
        let meta = VersionMetadata::parse(RAWHIDE_RC).unwrap();
        assert_eq!(
            meta,
            VersionMetadata {
                released_kernel: false,
                major_version: "5".into(),
                base_sublevel: 19,
                rc_revision: 1,
                git_revision: "0".into(),
                stable_update: 0,
                tar_suffix: None,
            }
        );
        assert!(!meta.has_git_revision());
    }

    #[test]
    fn later_declaration_wins() {
        let text = format!("{RAWHIDE_RC}%define base_sublevel 20\n");
        let meta = VersionMetadata::parse(&text).unwrap();
        assert_eq!(meta.base_sublevel, 20);
    }

    #[test]
    fn rc_tarball_sets_tar_suffix() {
        let text = RAWHIDE_RC.replace("kversion 5.19", "kversion 5.19-rc1");
        let meta = VersionMetadata::parse(&text).unwrap();
        assert_eq!(meta.tar_suffix.as_deref(), Some("-rc1"));
        assert_eq!(meta.major_version, "5");
    }

    #[test]
    fn tar_suffix_uses_final_rcrev_regardless_of_order() {
        let text = "\
%global kversion 6.0-rc3
%global released_kernel 0
%define base_sublevel 0
%define stable_update 0
%define gitrev 0
%define rcrev 2
%define rcrev 3
";
        let meta = VersionMetadata::parse(text).unwrap();
        assert_eq!(meta.tar_suffix.as_deref(), Some("-rc3"));
        assert_eq!(meta.rc_revision, 3);
    }

    #[test]
    fn unknown_identifiers_are_ignored() {
        let text = format!("%global signmodules 1\n%define buildid 42\n{RAWHIDE_RC}");
        assert!(VersionMetadata::parse(&text).is_ok());
    }

    #[test]
    fn values_must_start_with_a_digit() {
        // The macro-valued line is not a declaration, so the field is missing.
        let text = RAWHIDE_RC.replace("%define rcrev 1", "%define rcrev %{?rc}");
        assert!(matches!(
            VersionMetadata::parse(&text),
            Err(SpecError::MissingField { field: "rcrev" })
        ));
    }

    #[test]
    fn trailing_text_after_number_is_tolerated() {
        let text = RAWHIDE_RC.replace("%define base_sublevel 19", "%define base_sublevel 19 # bump");
        assert_eq!(VersionMetadata::parse(&text).unwrap().base_sublevel, 19);
    }

    #[test]
    fn gitrev_keeps_first_token() {
        let text = RAWHIDE_RC.replace("%define gitrev 0", "%define gitrev 4 # snapshot");
        let meta = VersionMetadata::parse(&text).unwrap();
        assert_eq!(meta.git_revision, "4");
        assert!(meta.has_git_revision());
    }

    #[test]
    fn no_declarations_is_malformed() {
        assert!(matches!(
            VersionMetadata::parse("Name: kernel\nVersion: 5.19\n"),
            Err(SpecError::Malformed)
        ));
        assert!(matches!(VersionMetadata::parse(""), Err(SpecError::Malformed)));
    }

    #[test]
    fn missing_field_is_reported() {
        let text = RAWHIDE_RC.replace("%global kversion 5.19\n", "");
        assert!(matches!(
            VersionMetadata::parse(&text),
            Err(SpecError::MissingField { field: "kversion" })
        ));
    }

    #[test]
    fn directive_must_start_the_line() {
        let text = RAWHIDE_RC.replace("%define rcrev 1", "  %define rcrev 1");
        assert!(matches!(
            VersionMetadata::parse(&text),
            Err(SpecError::MissingField { field: "rcrev" })
        ));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = VersionMetadata::from_file(Path::new("/nonexistent/kernel.spec")).unwrap_err();
        assert!(matches!(err, SpecError::Read { .. }));
    }
}
