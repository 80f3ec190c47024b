//! HTTP review-service client
//!
//! Talks JSON to the review server's REST API. Response shapes are decoded
//! into the crate's own types at this boundary so nothing above it knows
//! about the wire format.

use crate::error::{Error, Result};
use crate::review::ReviewService;
use crate::types::{BuildStatus, RevisionRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct RevisionListResponse {
    revisions: Vec<RevisionRecord>,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Deserialize)]
struct BuildListResponse {
    builds: Vec<BuildStatus>,
}

/// Client for the review server's HTTP API
#[derive(Debug)]
pub struct HttpReviewService {
    client: Client,
    base: Url,
    token: String,
}

impl HttpReviewService {
    /// Create a client for the API rooted at `api`.
    pub fn new(api: &str, token: &str) -> Result<Self> {
        let mut base = Url::parse(api)
            .map_err(|e| Error::Config(format!("invalid review API uri '{api}': {e}")))?;
        // A base without a trailing slash would swallow its last segment
        // when joined against.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let client = Client::builder()
            .user_agent(concat!("tarmac/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Review(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Review(format!("invalid endpoint '{path}': {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "review api request");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Review(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Review(format!(
                "{url} returned {status}: {}",
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Review(format!("failed to decode response from {url}: {e}")))
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let url = self.endpoint(path)?;
        debug!(%url, "review api mutation");

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Review(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Review(format!(
                "{url} returned {status}: {}",
                body.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewService for HttpReviewService {
    async fn resolve_revision_for_ref(&self, ref_name: &str) -> Result<Vec<RevisionRecord>> {
        let path = format!(
            "revisions?ref={}&state=open",
            urlencode(ref_name)
        );
        let list: RevisionListResponse = self.get_json(&path).await?;
        Ok(list.revisions)
    }

    async fn revision_by_id(&self, id: &str) -> Result<RevisionRecord> {
        self.get_json(&format!("revisions/{}", urlencode(id))).await
    }

    async fn build_commit_message(&self, revision_id: &str) -> Result<String> {
        let msg: MessageResponse = self
            .get_json(&format!("revisions/{}/message", urlencode(revision_id)))
            .await?;
        if msg.message.trim().is_empty() {
            return Err(Error::Review(format!(
                "review service returned an empty commit message for {revision_id}"
            )));
        }
        Ok(msg.message)
    }

    async fn query_build_status(&self, diff_id: &str) -> Result<Vec<BuildStatus>> {
        let list: BuildListResponse = self
            .get_json(&format!("diffs/{}/builds", urlencode(diff_id)))
            .await?;
        Ok(list.builds)
    }

    async fn query_open_dependencies(&self, revision_id: &str) -> Result<Vec<RevisionRecord>> {
        let list: RevisionListResponse = self
            .get_json(&format!(
                "revisions/{}/dependencies?state=open",
                urlencode(revision_id)
            ))
            .await?;
        Ok(list.revisions)
    }

    async fn finalize_revision(&self, revision_id: &str) -> Result<()> {
        self.post_empty(&format!("revisions/{}/land", urlencode(revision_id)))
            .await
    }
}

/// Percent-encode a path/query component. Revision ids and ref names are
/// short ASCII identifiers in practice; this covers the rest.
fn urlencode(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
