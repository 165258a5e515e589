//! buildsys::dispatcher
//!
//! The event loop: read build events, pick the relevant ones, resolve them
//! to build identities and hand each to the pipeline.
//!
//! # Invariants
//!
//! - Events are handled strictly one at a time, in arrival order; the
//!   handler for one build returns before the next line is read
//! - A failing build is logged and the loop moves on
//! - Only end of input or a read error stops the loop

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

use super::event::{BuildTrigger, EventError, EventFilter, Selection};
use super::traits::{BuildIdentity, BuildLookup, LookupError};

/// Why a relevant-looking event could not be turned into a build.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event line is not valid JSON.
    #[error("unreadable event: {0}")]
    Event(#[from] EventError),

    /// The build lookup failed.
    #[error("build lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Lines read
    pub events: usize,
    /// Relevant builds handed to the handler
    pub dispatched: usize,
    /// Handler or lookup failures
    pub failed: usize,
}

/// Routes relevant build events to a handler.
pub struct Dispatcher<'a> {
    filter: EventFilter,
    lookup: &'a dyn BuildLookup,
}

impl<'a> Dispatcher<'a> {
    pub fn new(filter: EventFilter, lookup: &'a dyn BuildLookup) -> Self {
        Self { filter, lookup }
    }

    /// Turn one event line into a build identity, if it is relevant.
    pub async fn resolve(&self, line: &str) -> Result<Option<BuildIdentity>, DispatchError> {
        let selection = self.filter.select(line)?;
        match selection {
            Selection::Ignored => Ok(None),
            Selection::Unidentifiable(reason) => {
                warn!(reason = %reason, "skipping event");
                Ok(None)
            }
            Selection::Relevant(BuildTrigger::Identified(identity)) => Ok(Some(identity)),
            Selection::Relevant(BuildTrigger::Lookup(build)) => {
                debug!(build = %build, lookup = self.lookup.name(), "looking up build");
                Ok(Some(self.lookup.lookup(&build).await?))
            }
        }
    }

    /// Process events from `input` until it ends.
    pub async fn run<R, H, T, E>(&self, input: R, mut handler: H) -> std::io::Result<DispatchStats>
    where
        R: AsyncBufRead + Unpin,
        H: FnMut(&BuildIdentity) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let mut stats = DispatchStats::default();
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            stats.events += 1;

            let identity = match self.resolve(&line).await {
                Ok(Some(identity)) => identity,
                Ok(None) => continue,
                Err(err) => {
                    error!(error = %err, "failed to resolve event");
                    stats.failed += 1;
                    continue;
                }
            };

            info!(nvr = %identity.nvr, commit = %identity.dist_git_commit.short(12), "processing build");
            stats.dispatched += 1;
            if let Err(err) = handler(&identity) {
                error!(nvr = %identity.nvr, error = %err, "build failed");
                stats.failed += 1;
            }
        }

        info!(
            events = stats.events,
            dispatched = stats.dispatched,
            failed = stats.failed,
            "event feed ended"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildsys::mock::MockLookup;
    use crate::buildsys::BuildRef;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn event(build_id: u64, name: &str) -> String {
        format!(
            r#"{{"topic": "org.example.prod.buildsys.build.state.change", "msg": {{"build_id": {build_id}, "name": "{name}", "instance": "primary", "new": 1}}}}"#
        )
    }

    #[tokio::test]
    async fn dispatches_relevant_builds_in_order() {
        let lookup = MockLookup::new();
        lookup.add(1, "kernel-4.2.3-300.fc23", SHA);
        lookup.add(2, "kernel-4.3.0-1.fc24", SHA);

        let input = [event(1, "kernel"), event(9, "glibc"), event(2, "kernel")].join("\n");
        let dispatcher = Dispatcher::new(EventFilter::new("primary", "kernel"), &lookup);

        let mut seen = Vec::new();
        let stats = dispatcher
            .run(input.as_bytes(), |build| {
                seen.push(build.nvr.to_string());
                Ok::<_, String>(())
            })
            .await
            .unwrap();

        assert_eq!(seen, vec!["kernel-4.2.3-300.fc23", "kernel-4.3.0-1.fc24"]);
        assert_eq!(
            stats,
            DispatchStats {
                events: 3,
                dispatched: 2,
                failed: 0
            }
        );
        assert_eq!(lookup.lookups(), vec![BuildRef::Id(1), BuildRef::Id(2)]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_loop() {
        let lookup = MockLookup::new();
        lookup.add(2, "kernel-4.3.0-1.fc24", SHA);

        let input = [
            "garbage".to_string(),
            event(1, "kernel"),
            event(2, "kernel"),
            String::new(),
        ]
        .join("\n");
        let dispatcher = Dispatcher::new(EventFilter::new("primary", "kernel"), &lookup);

        let stats = dispatcher
            .run(input.as_bytes(), |_| Err::<(), _>("patch did not apply"))
            .await
            .unwrap();

        assert_eq!(stats.events, 3);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.failed, 3);
    }

    #[tokio::test]
    async fn resolve_keeps_error_kinds() {
        let lookup = MockLookup::new();
        let dispatcher = Dispatcher::new(EventFilter::new("primary", "kernel"), &lookup);

        let err = dispatcher.resolve("not json").await.unwrap_err();
        assert!(matches!(err, DispatchError::Event(_)));

        let err = dispatcher.resolve(&event(7, "kernel")).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Lookup(LookupError::NoSuchBuild(ref build)) if build == "7"
        ));

        lookup.fail_with(LookupError::Network("connection refused".into()));
        let err = dispatcher.resolve(&event(7, "kernel")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Lookup(LookupError::Network(_))));
        assert_eq!(err.to_string(), "build lookup failed: network error: connection refused");

        assert!(dispatcher.resolve(&event(7, "glibc")).await.unwrap().is_none());
    }
}
