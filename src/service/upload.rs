//! Multipart video submission with byte-level upload progress.
//!
//! The file is streamed from disk rather than loaded into memory; a
//! counting adapter over the read stream reports cumulative fractions to
//! the caller as bytes go out.

use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::error::AnalysisError;
use crate::media::MediaFile;
use crate::service::{map_send_error, parse_error_response, redact_id, AnalysisService, JobHandle};

/// Callback observing monotonically non-decreasing upload fractions in
/// `[0, 1]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Wire shape of a successful `POST /analyze` response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    task_id: Option<String>,
}

impl AnalysisService {
    /// Uploads a video for analysis and returns its job handle.
    ///
    /// The file is sent as the `video` field of a multipart body,
    /// streamed from disk. `progress` observes the fraction of bytes
    /// transferred.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::FileUnreadable` - the file could not be opened
    /// - `AnalysisError::Unreachable` - the request never produced a
    ///   response
    /// - `AnalysisError::Rejected` - 4xx with the service's reason
    /// - `AnalysisError::ServerFailure` - other non-success responses, or
    ///   a 2xx response missing the job identifier (malformed contract)
    pub async fn submit_video(
        &self,
        file: &MediaFile,
        progress: ProgressFn,
    ) -> Result<JobHandle, AnalysisError> {
        let url = self.endpoint("/analyze")?;
        let total_bytes = file.size_bytes();

        let source = tokio::fs::File::open(file.path()).await.map_err(|e| {
            AnalysisError::FileUnreadable {
                detail: e.to_string(),
            }
        })?;

        // Count bytes as reqwest pulls them through the stream so the
        // caller sees cumulative, non-decreasing fractions.
        let mut sent: u64 = 0;
        let counted = ReaderStream::new(source).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                if total_bytes > 0 {
                    progress((sent as f64 / total_bytes as f64).min(1.0));
                }
            }
            chunk
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(counted), total_bytes)
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| AnalysisError::Internal(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().part("video", part);

        info!("[ANALYZE] POST /analyze ({} bytes)", total_bytes);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        info!("[ANALYZE] POST /analyze -> {}", status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let body: SubmitResponse = response.json().await.map_err(|e| {
            AnalysisError::ServerFailure(format!("Failed to parse submission response: {}", e))
        })?;

        match body.task_id {
            Some(task_id) if !task_id.is_empty() => {
                info!("[ANALYZE] job accepted as {}", redact_id(&task_id));
                Ok(JobHandle::from(task_id))
            }
            _ => Err(AnalysisError::ServerFailure(
                "No task ID received from server".to_string(),
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
