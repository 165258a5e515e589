//! buildsys::koji
//!
//! Build lookup against a Koji hub over XML-RPC.
//!
//! # Lookup
//!
//! 1. `getBuild(<id or nvr>)` gives name, version, release and task id
//! 2. `getTaskInfo(<task id>, request=True)` gives the task request, whose
//!    first element is the source URL ending in `#<commit>`
//!
//! Numeric build references are sent as integers, others as strings.
//! Keyword arguments travel as a trailing struct flagged `__starstar`.
//!
//! No authentication is performed; the lookups are anonymous reads.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use super::traits::{source_commit, BuildIdentity, BuildLookup, BuildRef, LookupError};
use super::xmlrpc::{decode_response, encode_call, Value, XmlRpcError};
use crate::core::types::NvrTag;

/// User-Agent header value for hub requests.
const USER_AGENT_VALUE: &str = "kexplode";

/// Koji hub client.
#[derive(Debug, Clone)]
pub struct KojiHub {
    client: Client,
    url: String,
}

impl KojiHub {
    /// Create a client for the hub at `url` (e.g. `https://koji.example.org/kojihub`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and decode its return value.
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, LookupError> {
        debug!(hub = %self.url, method, "calling hub");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(encode_call(method, params))
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(LookupError::Network(format!(
                "{} returned HTTP {}",
                method,
                status.as_u16()
            )));
        }

        decode_response(&body).map_err(|e| match e {
            XmlRpcError::Fault { code, message } => LookupError::Fault { code, message },
            XmlRpcError::Invalid(message) => LookupError::Malformed(message),
        })
    }

    async fn task_source(&self, task_id: i64) -> Result<Option<String>, LookupError> {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("request".to_string(), Value::Bool(true));
        kwargs.insert("__starstar".to_string(), Value::Bool(true));

        let task = self
            .call("getTaskInfo", &[Value::Int(task_id), Value::Struct(kwargs)])
            .await?;

        Ok(task
            .get("request")
            .and_then(Value::as_array)
            .and_then(|request| request.first())
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

fn field<'a>(build: &'a Value, key: &str) -> Result<&'a str, LookupError> {
    build
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LookupError::Malformed(format!("build has no '{}'", key)))
}

#[async_trait]
impl BuildLookup for KojiHub {
    fn name(&self) -> &'static str {
        "koji"
    }

    async fn lookup(&self, build: &BuildRef) -> Result<BuildIdentity, LookupError> {
        let arg = match build {
            BuildRef::Id(id) => Value::Int(i64::try_from(*id).map_err(|_| {
                LookupError::NoSuchBuild(build.to_string())
            })?),
            BuildRef::Nvr(nvr) => Value::Str(nvr.clone()),
        };

        let info = self.call("getBuild", &[arg]).await?;
        if info.is_nil() {
            return Err(LookupError::NoSuchBuild(build.to_string()));
        }

        let nvr = NvrTag::new(
            field(&info, "name")?,
            field(&info, "version")?,
            field(&info, "release")?,
        )
        .map_err(|e| LookupError::Malformed(e.to_string()))?;
        debug!(build = %build, nvr = %nvr, "found build");

        let source = match info.get("task_id").and_then(Value::as_i64) {
            Some(task_id) => self.task_source(task_id).await?,
            None => None,
        };
        let source = source
            .or_else(|| info.get("source").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| LookupError::NoTask(nvr.to_string()))?;

        let dist_git_commit = source_commit(&source)?;
        debug!(nvr = %nvr, commit = %dist_git_commit, "resolved build source");

        Ok(BuildIdentity {
            dist_git_commit,
            nvr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_url() {
        let hub = KojiHub::new("https://koji.example.org/kojihub");
        assert_eq!(hub.url(), "https://koji.example.org/kojihub");
        assert_eq!(hub.name(), "koji");
    }

    #[test]
    fn field_requires_string() {
        let mut members = BTreeMap::new();
        members.insert("name".to_string(), Value::Str("kernel".into()));
        members.insert("version".to_string(), Value::Int(4));
        let build = Value::Struct(members);

        assert_eq!(field(&build, "name").unwrap(), "kernel");
        assert!(matches!(
            field(&build, "version"),
            Err(LookupError::Malformed(_))
        ));
        assert!(matches!(
            field(&build, "release"),
            Err(LookupError::Malformed(_))
        ));
    }
}
