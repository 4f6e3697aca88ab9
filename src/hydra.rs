//! HTTP client for the Hydra CI query API.
//!
//! Wraps `reqwest::blocking::Client` with a normalized base URL. Only two
//! endpoints are used: the evaluation list of one jobset and the metadata of a
//! single build. Hydra serves JSON when asked with `Accept: application/json`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

use crate::output;

/// User-Agent header sent with Hydra requests.
const USER_AGENT: &str = concat!("assemble-installer/", env!("CARGO_PKG_VERSION"));

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One evaluation of a jobset.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Evaluation {
    pub id: u64,
    /// Flake reference the evaluation was built from; contains the revision.
    /// Empty for non-flake jobsets.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub flake: String,
    /// Build IDs in the order Hydra lists them.
    #[serde(default)]
    pub builds: Vec<u64>,
    /// Creation time in Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Response from `GET /jobset/<project>/<jobset>/evals`.
#[derive(Debug, Deserialize)]
struct EvalsResponse {
    evals: Vec<Evaluation>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BuildOutput {
    pub path: String,
}

/// Build metadata from `GET /build/<id>`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Build {
    pub id: u64,
    /// Platform the build ran for, e.g. `x86_64-linux`.
    pub system: String,
    /// `1` once the build has completed.
    #[serde(default)]
    pub finished: i64,
    #[serde(default)]
    pub buildoutputs: HashMap<String, BuildOutput>,
}

impl Build {
    pub fn is_finished(&self) -> bool {
        self.finished == 1
    }

    /// Store path of the `out` output.
    pub fn out_path(&self) -> Result<&str> {
        self.buildoutputs
            .get("out")
            .map(|o| o.path.as_str())
            .ok_or_else(|| anyhow::anyhow!("build {} has no 'out' output", self.id))
    }
}

// ---------------------------------------------------------------------------
// CiSource
// ---------------------------------------------------------------------------

/// Source of evaluations and build metadata.
pub trait CiSource {
    /// All evaluations of the configured jobset, newest first.
    fn evaluations(&self) -> Result<Vec<Evaluation>>;

    fn build(&self, id: u64) -> Result<Build>;

    /// Web page listing the unfinished builds of an evaluation.
    fn unfinished_url(&self, eval_id: u64) -> String;
}

// ---------------------------------------------------------------------------
// HydraClient
// ---------------------------------------------------------------------------

pub struct HydraClient {
    client: reqwest::blocking::Client,
    base_url: String,
    jobset: String,
}

impl HydraClient {
    /// Create a client for `<project>/<jobset>` on the Hydra at `base_url`.
    ///
    /// `base_url` is trimmed and stripped of trailing slashes.
    pub fn new(base_url: &str, jobset: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            jobset: jobset.trim_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.url(path);
        output::detail(&format!("GET {url}"));
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .with_context(|| format!("failed to connect to Hydra at {url}"))?;

        let body = map_http_error(resp)?;
        serde_json::from_str(&body).with_context(|| format!("failed to parse {what} response"))
    }
}

impl CiSource for HydraClient {
    fn evaluations(&self) -> Result<Vec<Evaluation>> {
        let path = format!("/jobset/{}/evals", self.jobset);
        let resp: EvalsResponse = self.get_json(&path, "evaluation list")?;
        Ok(resp.evals)
    }

    fn build(&self, id: u64) -> Result<Build> {
        self.get_json(&format!("/build/{id}"), "build")
    }

    fn unfinished_url(&self, eval_id: u64) -> String {
        self.url(&format!("/eval/{eval_id}#tabs-unfinished"))
    }
}

// ---------------------------------------------------------------------------
// HTTP error mapping
// ---------------------------------------------------------------------------

/// Return the response body, or map a non-success status to a readable error.
fn map_http_error(resp: reqwest::blocking::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if status.is_success() {
        return Ok(body);
    }

    match status.as_u16() {
        404 => anyhow::bail!("Not found: {}", extract_error_message(&body)),
        500..=599 => anyhow::bail!("Server error: {}", extract_error_message(&body)),
        _ => anyhow::bail!(
            "Unexpected response (HTTP {status}): {}",
            extract_error_message(&body)
        ),
    }
}

/// Try to extract a `message` or `error` field from a JSON error body.
/// Falls back to the raw body, truncated.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(msg) = value.get("message").or(value.get("error"))
        && let Some(s) = msg.as_str()
    {
        return s.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no details provided".to_string();
    }

    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
