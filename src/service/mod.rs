//! HTTP client for the CourtIQ analysis service.
//!
//! This module provides a typed client for:
//! - video submission (multipart upload with byte-level progress)
//! - job status polling
//! - stored-result listing, retrieval, deletion, and aggregate stats
//!
//! # Logging
//!
//! Only HTTP method, path, and status codes are logged; payloads and full
//! job identifiers never are.

pub mod history;
pub mod upload;

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::config::{ClientConfig, CLIENT_USER_AGENT};
use crate::error::AnalysisError;
use crate::result::RawResult;

pub use upload::ProgressFn;

// ─────────────────────────────────────────────────────────────────────────────
// JobHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier for one server-side analysis job, returned by the
/// submission endpoint. One handle maps to at most one active poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    /// The raw task identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobHandle {
    fn from(task_id: String) -> Self {
        Self(task_id)
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JobStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle states the service reports for a job.
///
/// Once `Succeeded` or `Failed` is observed no further transition occurs
/// for that handle. An unrecognized wire value deserializes to `Unknown`
/// and is treated as still in progress, so a new server-side state never
/// breaks polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Started,
    Processing,
    #[serde(rename = "SUCCESS")]
    Succeeded,
    #[serde(rename = "FAILURE")]
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// True for states after which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// Wire shape of `GET /status/{task_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Current job state.
    pub status: JobStatus,
    /// Analysis payload, present once the job succeeded.
    #[serde(default)]
    pub result: Option<RawResult>,
    /// Failure reason, present once the job failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// Service error response format: `{"error": "..."}` with a non-2xx status.
#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// AnalysisService
// ─────────────────────────────────────────────────────────────────────────────

/// Typed HTTP client for the analysis service.
#[derive(Clone)]
pub struct AnalysisService {
    /// The underlying HTTP client.
    http: reqwest::Client,
    /// Base URL of the service.
    base_url: Url,
}

impl AnalysisService {
    /// Creates a client for the service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Internal` if the HTTP client fails to
    /// initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, AnalysisError> {
        let http = build_http_client(config)?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Queries the current status of an analysis job.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::Unreachable` - no response came back
    /// - `AnalysisError::Rejected` / `AnalysisError::ServerFailure` - the
    ///   service answered with a non-success status
    /// - `AnalysisError::ServerFailure` - the response body did not parse
    pub async fn job_status(&self, handle: &JobHandle) -> Result<StatusResponse, AnalysisError> {
        let url = self.endpoint(&format!("/status/{}", handle.as_str()))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        info!(
            "[STATUS] GET /status/{} -> {}",
            redact_id(handle.as_str()),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        response.json::<StatusResponse>().await.map_err(|e| {
            AnalysisError::ServerFailure(format!("Failed to parse status response: {}", e))
        })
    }

    /// Builds an absolute endpoint URL from a service-relative path.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, AnalysisError> {
        self.base_url
            .join(path)
            .map_err(|e| AnalysisError::Internal(format!("Invalid endpoint path {}: {}", path, e)))
    }
}

/// Builds the configured HTTP client.
fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, AnalysisError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()
        .map_err(|e| AnalysisError::Internal(format!("Failed to build HTTP client: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a transport-level send failure: the request never produced a
/// response, so the server is unreachable from the client's perspective.
pub(crate) fn map_send_error(err: reqwest::Error) -> AnalysisError {
    AnalysisError::Unreachable {
        detail: err.to_string(),
    }
}

/// Parses a non-success response into the error taxonomy: a 4xx carrying
/// the service's `{"error": ...}` reason is a rejection; anything else is
/// a server failure.
pub(crate) async fn parse_error_response(
    response: reqwest::Response,
    status: reqwest::StatusCode,
) -> AnalysisError {
    let client_error = status.is_client_error();

    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<ServiceError>(&body)
        .ok()
        .map(|e| e.error);

    match (client_error, reason) {
        (true, Some(reason)) => AnalysisError::Rejected { reason },
        (true, None) => AnalysisError::Rejected {
            reason: format!("Request rejected (HTTP {})", status.as_u16()),
        },
        (false, Some(reason)) => AnalysisError::ServerFailure(reason),
        (false, None) => AnalysisError::ServerFailure("Server error. Please try again.".to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Redacts a job ID for logging (shows first 8 chars).
pub(crate) fn redact_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Helper to create a test client pointing at a mock server.
    pub(crate) fn test_service(mock_uri: &str) -> AnalysisService {
        let config = ClientConfig::new(Url::parse(mock_uri).unwrap());
        AnalysisService::new(&config).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // JobStatus Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn job_status_deserialization() {
        let test_cases = [
            (r#""PENDING""#, JobStatus::Pending),
            (r#""STARTED""#, JobStatus::Started),
            (r#""PROCESSING""#, JobStatus::Processing),
            (r#""SUCCESS""#, JobStatus::Succeeded),
            (r#""FAILURE""#, JobStatus::Failed),
            (r#""SOME_NEW_STATE""#, JobStatus::Unknown),
        ];

        for (json, expected) in test_cases {
            let result: JobStatus = serde_json::from_str(json).unwrap();
            assert_eq!(result, expected, "Failed for input: {}", json);
        }
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status Endpoint Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn job_status_parses_in_progress_response() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "task_id": "abc",
                "status": "PROCESSING"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let reply = service.job_status(&JobHandle::from("abc".to_string())).await.unwrap();

        assert_eq!(reply.status, JobStatus::Processing);
        assert!(reply.result.is_none());
        assert!(reply.error.is_none());
    }

    #[tokio::test]
    async fn job_status_parses_success_with_result() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "task_id": "abc",
                "status": "SUCCESS",
                "result": {
                    "total_frames": 100,
                    "frames_with_pose": 75
                }
            })))
            .mount(&mock_server)
            .await;

        let reply = service.job_status(&JobHandle::from("abc".to_string())).await.unwrap();

        assert_eq!(reply.status, JobStatus::Succeeded);
        let raw = reply.result.unwrap();
        assert_eq!(raw.total_frames, 100);
        assert_eq!(raw.frames_with_pose, 75);
    }

    #[tokio::test]
    async fn job_status_parses_failure_with_error() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "task_id": "abc",
                "status": "FAILURE",
                "error": "decode error"
            })))
            .mount(&mock_server)
            .await;

        let reply = service.job_status(&JobHandle::from("abc".to_string())).await.unwrap();

        assert_eq!(reply.status, JobStatus::Failed);
        assert_eq!(reply.error.as_deref(), Some("decode error"));
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_network_error() {
        // Port 1 is reserved and nothing listens on it.
        let service = test_service("http://127.0.0.1:1");

        let err = service
            .job_status(&JobHandle::from("abc".to_string()))
            .await
            .expect_err("should fail");

        assert_eq!(err.class(), ErrorClass::NetworkUnreachable);
    }

    #[tokio::test]
    async fn malformed_status_body_is_a_server_failure() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let err = service
            .job_status(&JobHandle::from("abc".to_string()))
            .await
            .expect_err("should fail");

        assert_eq!(err.class(), ErrorClass::ServerFailure);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Error Parsing Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn structured_4xx_becomes_rejected_with_reason() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "Invalid file type. Allowed formats: mp4, mov, avi"
            })))
            .mount(&mock_server)
            .await;

        let err = service
            .job_status(&JobHandle::from("abc".to_string()))
            .await
            .expect_err("should fail");

        match err {
            AnalysisError::Rejected { reason } => {
                assert!(reason.contains("Invalid file type"));
            }
            e => panic!("Expected Rejected, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn bare_500_becomes_generic_server_failure() {
        let mock_server = MockServer::start().await;
        let service = test_service(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/status/abc"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = service
            .job_status(&JobHandle::from("abc".to_string()))
            .await
            .expect_err("should fail");

        match err {
            AnalysisError::ServerFailure(msg) => {
                assert_eq!(msg, "Server error. Please try again.");
            }
            e => panic!("Expected ServerFailure, got: {:?}", e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helper Function Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn redact_id_long() {
        assert_eq!(redact_id("4f2a9c81-task-id"), "4f2a9c81...");
    }

    #[test]
    fn redact_id_short() {
        assert_eq!(redact_id("short"), "short");
    }
}
