//! Stored-result listing and maintenance.
//!
//! Thin typed client for the endpoints the surrounding history view
//! consumes: listing prior analyses, fetching one by ID, aggregate
//! statistics, and deletion. No view logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AnalysisError;
use crate::result::RawResult;
use crate::service::{map_send_error, parse_error_response, redact_id, AnalysisService};

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted analysis result as returned by the listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    /// Storage identifier of the document.
    #[serde(rename = "_id")]
    pub id: String,
    /// Original upload file name, when recorded.
    #[serde(default)]
    pub filename: Option<String>,
    /// Raw timestamp string as the service serialized it.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// The analysis payload itself.
    #[serde(flatten)]
    pub result: RawResult,
}

impl StoredResult {
    /// Parses the stored timestamp, accepting RFC 3339 or RFC 2822
    /// (the service has emitted both formats).
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One page of stored results from `GET /results`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultPage {
    /// Number of results in this page.
    pub count: u64,
    #[serde(default)]
    pub results: Vec<StoredResult>,
}

/// Summary statistics over all stored analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default)]
    pub total_frames_analyzed: u64,
    #[serde(default)]
    pub avg_pose_detection_rate: f64,
    #[serde(default)]
    pub avg_duration: f64,
}

/// Envelope around the stats payload.
#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    stats: AggregateStats,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Methods
// ─────────────────────────────────────────────────────────────────────────────

impl AnalysisService {
    /// Lists recent stored results, newest first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of results to return
    /// * `search` - Optional filename search term
    pub async fn list_results(
        &self,
        limit: Option<u32>,
        search: Option<&str>,
    ) -> Result<ResultPage, AnalysisError> {
        let mut url = self.endpoint("/results")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            url.query_pairs_mut().append_pair("search", search);
        }

        let response = self.http.get(url).send().await.map_err(map_send_error)?;

        let status = response.status();
        info!("[RESULTS] GET /results -> {}", status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        response.json::<ResultPage>().await.map_err(|e| {
            AnalysisError::ServerFailure(format!("Failed to parse results listing: {}", e))
        })
    }

    /// Fetches one stored result by its identifier.
    pub async fn get_result(&self, id: &str) -> Result<StoredResult, AnalysisError> {
        let url = self.endpoint(&format!("/results/{}", id))?;

        let response = self.http.get(url).send().await.map_err(map_send_error)?;

        let status = response.status();
        info!(
            "[RESULTS] GET /results/{} -> {}",
            redact_id(id),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        response.json::<StoredResult>().await.map_err(|e| {
            AnalysisError::ServerFailure(format!("Failed to parse stored result: {}", e))
        })
    }

    /// Fetches summary statistics over all stored analyses.
    pub async fn aggregate_stats(&self) -> Result<AggregateStats, AnalysisError> {
        let url = self.endpoint("/api/stats")?;

        let response = self.http.get(url).send().await.map_err(map_send_error)?;

        let status = response.status();
        info!("[STATS] GET /api/stats -> {}", status.as_u16());

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        let envelope: StatsEnvelope = response.json().await.map_err(|e| {
            AnalysisError::ServerFailure(format!("Failed to parse stats response: {}", e))
        })?;

        Ok(envelope.stats)
    }

    /// Deletes a stored result.
    pub async fn delete_result(&self, id: &str) -> Result<(), AnalysisError> {
        let url = self.endpoint(&format!("/api/results/{}/delete", id))?;

        let response = self.http.delete(url).send().await.map_err(map_send_error)?;

        let status = response.status();
        info!(
            "[RESULTS] DELETE /api/results/{}/delete -> {}",
            redact_id(id),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(parse_error_response(response, status).await);
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
