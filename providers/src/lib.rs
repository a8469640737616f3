//! Script server client.
//!
//! The server exposes three read-only endpoints, all answering with a JSON
//! envelope `{"body": [...]}`:
//!
//! | Request | Path |
//! |---------|------|
//! | [`ScriptServer::fetch_group`] | `{root}/commands/{token}/{user}/{groupId}` |
//! | [`ScriptServer::fetch_containing`] | `{root}/branchcommand/{token}/{user}/{instructionId}` |
//! | [`ScriptServer::fetch_catalog`] | `{root}/commandgroups/{token}/{user}` |
//!
//! Records are returned untyped; decoding into a `Sequence` or a catalog is
//! the caller's job. An envelope without a `body` array is an empty result,
//! not an error. There is no retry and no caching: one failed request is
//! reported once.

use std::time::Duration;

use cyrano_types::{GroupId, InstructionId, SessionContext};
use serde_json::Value;
use thiserror::Error;
use url::Url;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 4;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid server root {root:?}: {reason}")]
    Url { root: String, reason: String },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response from {endpoint} is not JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("cyrano/", env!("CARGO_PKG_VERSION")))
        .default_headers(default_headers)
}

pub fn http_client_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of an error response for diagnostics.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Pull the record list out of a response envelope.
#[must_use]
pub fn envelope_body(envelope: Value) -> Vec<Value> {
    match envelope {
        Value::Object(mut map) => match map.remove("body") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Handle on the script server for one session.
///
/// Cloning is cheap: clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ScriptServer {
    client: reqwest::Client,
    root: Url,
    session: SessionContext,
}

impl ScriptServer {
    /// Build a client for `root` (for example
    /// `http://host/REST/index.php`). Requests time out after `timeout`.
    pub fn new(root: &str, timeout: Duration, session: SessionContext) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::Url {
            root: root.to_string(),
            reason,
        };
        let parsed = Url::parse(root).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        let client = http_client_with_timeout(timeout).map_err(|source| FetchError::Transport {
            endpoint: root.to_string(),
            source,
        })?;
        Ok(Self {
            client,
            root: parsed,
            session,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Url {
        &self.root
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Records of group `group`: the group record followed by its instructions.
    pub async fn fetch_group(&self, group: GroupId) -> Result<Vec<Value>, FetchError> {
        let id = group.value().to_string();
        self.get_records("commands", Some(&id)).await
    }

    /// Records of whichever group the server resolves `instruction` to.
    pub async fn fetch_containing(
        &self,
        instruction: InstructionId,
    ) -> Result<Vec<Value>, FetchError> {
        let id = instruction.value().to_string();
        self.get_records("branchcommand", Some(&id)).await
    }

    /// One group record per available script.
    pub async fn fetch_catalog(&self) -> Result<Vec<Value>, FetchError> {
        self.get_records("commandgroups", None).await
    }

    /// Build the URL for `resource`, appending session segments and `id`.
    pub fn endpoint(&self, resource: &str, id: Option<&str>) -> Result<Url, FetchError> {
        let mut url = self.root.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| FetchError::Url {
                root: self.root.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?;
            segments.pop_if_empty().push(resource);
            segments.extend(self.session.path_segments());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn get_records(&self, resource: &str, id: Option<&str>) -> Result<Vec<Value>, FetchError> {
        let url = self.endpoint(resource, id)?;
        // The URL embeds the access token; log the resource only.
        let endpoint = match id {
            Some(id) => format!("{resource}/{id}"),
            None => resource.to_string(),
        };
        tracing::debug!(%endpoint, "Fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(FetchError::Status {
                endpoint,
                status,
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.clone(),
                source: source.without_url(),
            })?;
        let envelope: Value =
            serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
                endpoint: endpoint.clone(),
                source,
            })?;

        let records = envelope_body(envelope);
        tracing::debug!(%endpoint, records = records.len(), "Fetched");
        Ok(records)
    }
}
