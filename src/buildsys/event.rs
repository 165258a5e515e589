//! buildsys::event
//!
//! Build state change events and the filter that selects relevant ones.
//!
//! # Wire format
//!
//! One JSON document per line, either an envelope
//!
//! ```json
//! {"topic": "org.example.prod.buildsys.build.state.change", "msg": {...}}
//! ```
//!
//! or the bare message object. Enveloped events whose topic does not
//! contain [`STATE_CHANGE_TOPIC`] are ignored.
//!
//! # Relevance
//!
//! A message is relevant when `instance` matches the configured instance,
//! `new == 1` (the build completed) and `name` matches the package.

use serde::Deserialize;
use thiserror::Error;

use super::traits::{source_commit, BuildIdentity, BuildRef};
use crate::core::types::NvrTag;

/// Topic fragment of build state changes.
pub const STATE_CHANGE_TOPIC: &str = "buildsys.build.state.change";

/// Build state meaning "complete".
pub const STATE_COMPLETE: i64 = 1;

/// Errors from reading an event line.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of a build state change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildStateChange {
    #[serde(default)]
    pub build_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    pub instance: String,
    pub new: i64,
    /// Task request; the first element is the build source URL.
    #[serde(default)]
    pub request: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    topic: String,
    msg: serde_json::Value,
}

/// What to do about a relevant event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTrigger {
    /// The event carried enough to identify the build directly.
    Identified(BuildIdentity),
    /// The build must be looked up.
    Lookup(BuildRef),
}

/// Outcome of filtering one event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Not a build state change, or not one we care about.
    Ignored,
    /// Relevant but carries nothing that names the build.
    Unidentifiable(String),
    Relevant(BuildTrigger),
}

/// Selects build events for one instance and package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    instance: String,
    package: String,
}

impl EventFilter {
    pub fn new(instance: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            package: package.into(),
        }
    }

    /// Whether a decoded message is a completed build of our package.
    pub fn is_relevant(&self, msg: &BuildStateChange) -> bool {
        msg.instance == self.instance && msg.new == STATE_COMPLETE && msg.name == self.package
    }

    /// Filter one line of the event feed.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Json`] if the line is not JSON at all. JSON
    /// that is not a build state change is [`Selection::Ignored`].
    pub fn select(&self, line: &str) -> Result<Selection, EventError> {
        let raw: serde_json::Value = serde_json::from_str(line)?;

        let msg = match serde_json::from_value::<Envelope>(raw.clone()) {
            Ok(envelope) if envelope.topic.contains(STATE_CHANGE_TOPIC) => envelope.msg,
            Ok(_) => return Ok(Selection::Ignored),
            Err(_) => raw,
        };

        let Ok(msg) = serde_json::from_value::<BuildStateChange>(msg) else {
            return Ok(Selection::Ignored);
        };
        if !self.is_relevant(&msg) {
            return Ok(Selection::Ignored);
        }

        Ok(trigger(&msg))
    }
}

fn trigger(msg: &BuildStateChange) -> Selection {
    let identified = msg
        .request
        .first()
        .and_then(|source| source.as_str())
        .and_then(|source| source_commit(source).ok())
        .zip(msg.version.as_deref().zip(msg.release.as_deref()))
        .and_then(|(commit, (version, release))| {
            NvrTag::new(msg.name.as_str(), version, release)
                .ok()
                .map(|nvr| BuildIdentity {
                    dist_git_commit: commit,
                    nvr,
                })
        });

    match (identified, msg.build_id) {
        (Some(identity), _) => Selection::Relevant(BuildTrigger::Identified(identity)),
        (None, Some(id)) => Selection::Relevant(BuildTrigger::Lookup(BuildRef::Id(id))),
        (None, None) => Selection::Unidentifiable(format!(
            "{} event without build id or source",
            msg.name
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn filter() -> EventFilter {
        EventFilter::new("primary", "kernel")
    }

    fn msg(instance: &str, new: i64, name: &str) -> String {
        format!(
            r#"{{"build_id": 680001, "name": "{name}", "version": "4.2.3", "release": "300.fc23", "instance": "{instance}", "new": {new}, "old": 0}}"#
        )
    }

    #[test]
    fn bare_relevant_message_needs_lookup() {
        let selection = filter().select(&msg("primary", 1, "kernel")).unwrap();
        assert_eq!(
            selection,
            Selection::Relevant(BuildTrigger::Lookup(BuildRef::Id(680001)))
        );
    }

    #[test]
    fn enveloped_message_with_matching_topic() {
        let line = format!(
            r#"{{"topic": "org.example.prod.buildsys.build.state.change", "msg": {}}}"#,
            msg("primary", 1, "kernel")
        );
        assert!(matches!(
            filter().select(&line).unwrap(),
            Selection::Relevant(_)
        ));
    }

    #[test]
    fn other_topics_ignored() {
        let line = format!(
            r#"{{"topic": "org.example.prod.buildsys.tag", "msg": {}}}"#,
            msg("primary", 1, "kernel")
        );
        assert_eq!(filter().select(&line).unwrap(), Selection::Ignored);
    }

    #[test]
    fn irrelevant_messages_ignored() {
        for line in [
            msg("ppc", 1, "kernel"),
            msg("primary", 0, "kernel"),
            msg("primary", 3, "kernel"),
            msg("primary", 1, "glibc"),
            r#"{"hello": "world"}"#.to_string(),
        ] {
            assert_eq!(filter().select(&line).unwrap(), Selection::Ignored, "{}", line);
        }
    }

    #[test]
    fn request_source_identifies_build() {
        let line = format!(
            r#"{{"name": "kernel", "version": "4.2.3", "release": "300.fc23", "instance": "primary", "new": 1, "request": ["git+https://src.example.org/rpms/kernel.git#{SHA}", "f23-candidate", {{}}]}}"#
        );
        match filter().select(&line).unwrap() {
            Selection::Relevant(BuildTrigger::Identified(identity)) => {
                assert_eq!(identity.dist_git_commit.as_str(), SHA);
                assert_eq!(identity.nvr.to_string(), "kernel-4.2.3-300.fc23");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nothing_to_identify() {
        let line = r#"{"name": "kernel", "instance": "primary", "new": 1}"#;
        assert!(matches!(
            filter().select(line).unwrap(),
            Selection::Unidentifiable(_)
        ));
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(filter().select("not json").is_err());
    }
}
