//! Recognition adapter for the CamFind image API.
//!
//! CamFind works asynchronously: `POST /image_requests` returns a token, and
//! `GET /image_responses/{token}` reports the job status until it is `completed`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use binsight_core::{
    model::{ImageSubmission, JobStatus, JobToken, Recognition},
    ports::{PortError, RecognitionPort},
};

/// Public CamFind endpoint.
pub const DEFAULT_BASE_URL: &str = "https://camfind.p.mashape.com";

const API_KEY_HEADER: &str = "X-Mashape-Key";

/// Statuses after which a job will never complete.
const TERMINAL_FAILURES: &[&str] = &["skipped", "error", "failed", "timeout"];

/// Response from /image_requests
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Recognition port backed by CamFind.
pub struct CamFindPort {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl CamFindPort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new<K: Into<String>>(client: Client, base_url: Url, api_key: K) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PortError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PortError::InvalidInput(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
    }
}

#[async_trait]
impl RecognitionPort for CamFindPort {
    async fn submit(&self, submission: &ImageSubmission) -> Result<JobToken, PortError> {
        let req = self
            .authorized(self.client.post(self.endpoint(&["image_requests"])?))
            .form(&[
                ("image_request[locale]", submission.locale.as_str()),
                ("image_request[remote_image_url]", submission.image_url.as_str()),
            ]);

        let resp = fetch_json::<SubmitResponse>(req).await?;

        let token = resp
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| PortError::Upstream("image request returned no token".into()))?;

        debug!(%token, "image request accepted");
        Ok(JobToken(token))
    }

    async fn status(&self, token: &JobToken) -> Result<JobStatus, PortError> {
        let url = self.endpoint(&["image_responses", &token.0])?;
        let req = self.authorized(self.client.get(url));

        let body = fetch_json::<Value>(req).await?;
        parse_status(body)
    }
}

/// Map a CamFind status body to a [`JobStatus`].
fn parse_status(body: Value) -> Result<JobStatus, PortError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| PortError::Upstream("image response has no status".into()))?
        .to_lowercase();

    if status == "completed" {
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PortError::Upstream("completed image response has no name".into()))?
            .to_owned();

        return Ok(JobStatus::Completed(Recognition { name, body }));
    }

    if TERMINAL_FAILURES.contains(&status.as_str()) {
        let reason = body
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Ok(JobStatus::Failed { status, reason });
    }

    // "not completed" and anything unrecognised
    Ok(JobStatus::Pending)
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}
