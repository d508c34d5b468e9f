//! HTTP client for the remote identification service

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::humanize::ByteSize;
use crate::observability::Metrics;
use crate::upload::{ImageBlob, UploadState};

/// Error building the client itself (as opposed to a failed request)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP client construction failed: {0}")]
    Build(String),
}

/// Successful service payload.
///
/// Only four fields are guaranteed by the wire contract; everything else is
/// loosely typed. The confidence fields stay as raw JSON values here — the
/// number-vs-numeric-string ambiguity is resolved in one place, by
/// [`crate::normalize::normalize`]. Unknown top-level fields are kept in
/// `extra` in arrival order (`serde_json` preserve_order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    /// Nested mapping of manufacturer-specific attributes; any JSON value is
    /// accepted and non-objects are ignored during normalization.
    #[serde(default)]
    pub additional_details: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept any JSON value where a string is expected; non-strings become
/// `None` instead of failing the whole decode, so the normalizer treats the
/// field as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Structured error contract shared by every failure path.
///
/// Validation failures arrive in this shape from the service; transport
/// failures, timeouts, and unparseable error bodies are synthesized into it
/// so the presentation layer has a single error contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("identification failed: {}", .detail.first().map(|d| d.msg.as_str()).unwrap_or("Unknown error"))]
pub struct ApiError {
    pub detail: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ApiError {
    fn single(msg: impl Into<String>, kind: &str) -> Self {
        Self {
            detail: vec![ErrorDetail {
                loc: Vec::new(),
                msg: msg.into(),
                kind: kind.to_string(),
            }],
        }
    }

    /// Fallback for error bodies that are not JSON or not the detail shape
    pub fn unknown() -> Self {
        Self::single("Unknown error", "unknown")
    }

    /// No response received at all
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::single(reason, "transport")
    }

    pub fn timeout(after: Duration) -> Self {
        Self::single(format!("Request timed out after {}s", after.as_secs()), "timeout")
    }

    pub fn primary_message(&self) -> &str {
        self.detail
            .first()
            .map(|d| d.msg.as_str())
            .unwrap_or("Unknown error")
    }
}

/// Parse a non-2xx body as the structured detail shape, falling back to the
/// synthesized unknown error when the body is not JSON or not that shape.
pub fn parse_error_body(body: &[u8]) -> ApiError {
    serde_json::from_slice(body).unwrap_or_else(|_| ApiError::unknown())
}

/// Request lifecycle for the current selection.
///
/// `submit` re-enters `Pending` from either terminal state, overwriting the
/// previous result. There is no cancelled state; callers are expected not to
/// overlap submissions for the same selection — if they do, the last arrival
/// wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Success(RawResponse),
    Failed(ApiError),
}

impl RequestState {
    /// Enter `Pending`, discarding any previous result
    pub fn begin(&mut self) {
        *self = RequestState::Pending;
    }

    /// Record the outcome of the in-flight request
    pub fn finish(&mut self, result: Result<RawResponse, ApiError>) {
        *self = match result {
            Ok(raw) => RequestState::Success(raw),
            Err(err) => RequestState::Failed(err),
        };
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the identification service; `/identify` is appended
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: "AssetLens/0.1.0".to_string(),
        }
    }
}

/// Anything that can answer an identification request.
///
/// The HTTP client implements this; tests inject mocks. Constructed
/// explicitly and passed where needed — there is no shared global instance.
#[async_trait]
pub trait IdentifyService: Send + Sync {
    async fn submit(&self, blob: &ImageBlob) -> Result<RawResponse, ApiError>;
}

/// HTTP implementation of [`IdentifyService`]
pub struct IdentifyClient {
    client: Client,
    identify_url: Url,
    request_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl IdentifyClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let identify_url = build_identify_url(&config.endpoint)?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            identify_url,
            request_timeout: config.request_timeout,
            metrics: Arc::new(Metrics::new()),
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Submit one image for identification.
    ///
    /// Sends a multipart POST with a single part named `file`; the
    /// content-type/boundary header is derived from the form by reqwest and
    /// never set manually. Every failure resolves to [`ApiError`].
    pub async fn submit(&self, blob: &ImageBlob) -> Result<RawResponse, ApiError> {
        let submission_id = Uuid::new_v4();
        self.metrics.request_submitted();

        debug!(
            %submission_id,
            file = %blob.file_name,
            size = %ByteSize(blob.len() as u64),
            mime = %blob.mime,
            "Submitting identification request"
        );

        let part = Part::bytes(blob.bytes.to_vec())
            .file_name(blob.file_name.clone())
            .mime_str(blob.mime.as_ref())
            .map_err(|e| ApiError::transport(format!("Invalid part MIME type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.identify_url.clone())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let err = if e.is_timeout() {
                    ApiError::timeout(self.request_timeout)
                } else {
                    ApiError::transport(format!("Network error: {e}"))
                };
                self.record_failure(submission_id, &err);
                err
            })?;

        let status = response.status();
        if status.is_success() {
            let raw: RawResponse = response.json().await.map_err(|e| {
                let err = ApiError::single(
                    format!("Invalid JSON in success response: {e}"),
                    "decode",
                );
                self.record_failure(submission_id, &err);
                err
            })?;
            self.metrics.request_succeeded();
            debug!(
                %submission_id,
                request_id = raw.request_id.as_deref().unwrap_or(""),
                "Identification succeeded"
            );
            Ok(raw)
        } else {
            let body = response.bytes().await.unwrap_or_default();
            let err = parse_error_body(&body);
            self.record_status_failure(submission_id, status, &err);
            Err(err)
        }
    }

    fn record_failure(&self, submission_id: Uuid, err: &ApiError) {
        self.metrics.request_failed();
        warn!(%submission_id, error = err.primary_message(), "Identification request failed");
    }

    fn record_status_failure(&self, submission_id: Uuid, status: StatusCode, err: &ApiError) {
        self.metrics.request_failed();
        warn!(
            %submission_id,
            status = %status,
            error = err.primary_message(),
            "Identification request rejected"
        );
    }
}

#[async_trait]
impl IdentifyService for IdentifyClient {
    async fn submit(&self, blob: &ImageBlob) -> Result<RawResponse, ApiError> {
        IdentifyClient::submit(self, blob).await
    }
}

fn build_identify_url(endpoint: &str) -> Result<Url, ClientError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint is empty".to_string(),
        });
    }

    let joined = format!("{}/identify", endpoint.trim_end_matches('/'));
    let url = Url::parse(&joined).map_err(|e| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Drive one submission for the currently selected file.
///
/// Transitions the selection's [`RequestState`] to `Pending`, awaits the
/// service, and records the terminal state. A no-op when nothing is
/// selected.
pub async fn run_identification<S>(state: &mut UploadState, service: &S)
where
    S: IdentifyService + ?Sized,
{
    let Some(selection) = state.selection() else {
        return;
    };
    let blob = selection.blob.clone();

    state.request_mut().begin();
    let result = service.submit(&blob).await;
    state.request_mut().finish(result);
}
