//! HTTP client for the VID/PID board identification service.
//!
//! The service answers `GET <base>/<vid>/<pid>` with a JSON object
//! `{"name": ..., "fqbn": ...}`, or 404 when the device is unknown.

use super::RemoteLookup;
use crate::{
    board::BoardCandidate,
    error::{Error, Result},
    tracing::prelude::*,
};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Default identification endpoint.
pub const DEFAULT_LOOKUP_URL: &str = "https://builder.arduino.cc/v3/boards/byVidPid";

// A USB ID as written in port properties, e.g. "0x2341".
const VID_PID_PATTERN: &str = r"^0[xX][0-9a-fA-F]{4}$";

/// Looks up boards by VID/PID over HTTP.
///
/// Built once at startup; the HTTP client, base URL and validation pattern
/// are immutable afterwards. Each lookup is a single request with no retry
/// and no caching.
#[derive(Debug, Clone)]
pub struct VidPidClient {
    client: Client,
    base_url: String,
    valid_id: Regex,
}

impl VidPidClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    fn with_client(client: Client, base_url: impl Into<String>) -> Result<Self> {
        let valid_id = Regex::new(VID_PID_PATTERN)
            .map_err(|e| Error::Config(format!("invalid VID/PID pattern: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            valid_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn validate(&self, field: &'static str, value: &str) -> Result<()> {
        if self.valid_id.is_match(value) {
            Ok(())
        } else {
            Err(Error::InvalidArgument {
                field,
                value: value.to_string(),
            })
        }
    }
}

#[async_trait]
impl RemoteLookup for VidPidClient {
    async fn by_vid_pid(&self, vid: &str, pid: &str) -> Result<Vec<BoardCandidate>> {
        // Reject bad IDs before touching the network.
        self.validate("vid", vid)?;
        self.validate("pid", pid)?;

        let url = format!("{}/{}/{}", self.base_url, vid, pid);
        debug!(url = %url, "Querying identification service");

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Upstream(status.to_string()));
        }

        let body = response.text().await?;
        let candidate = parse_identity(&body)?;
        trace!(fqbn = %candidate.fqbn, "Identification service matched board");

        Ok(vec![candidate])
    }
}

/// Parse a `{"name": ..., "fqbn": ...}` payload.
fn parse_identity(body: &str) -> Result<BoardCandidate> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("error processing response: {e}")))?;

    let name = value.get("name").and_then(Value::as_str);
    let fqbn = value.get("fqbn").and_then(Value::as_str);

    match (name, fqbn) {
        (Some(name), Some(fqbn)) => Ok(BoardCandidate::new(name, fqbn)),
        _ => Err(Error::MalformedResponse(
            "expected string fields 'name' and 'fqbn'".to_string(),
        )),
    }
}
