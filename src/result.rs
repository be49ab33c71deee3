//! Analysis result payloads and their display-ready projection.
//!
//! The service may omit precomputed percentage fields; `project` fills
//! every ratio in exactly once so display code never branches on
//! presence/absence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Conventional file name for an exported result document.
pub const EXPORT_FILE_NAME: &str = "court-iq-results.json";

// ─────────────────────────────────────────────────────────────────────────────
// RawResult
// ─────────────────────────────────────────────────────────────────────────────

/// Analysis payload exactly as the service reports it. Received once per
/// job; never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    /// Total frames examined in the video.
    pub total_frames: u64,
    /// Frames in which a player pose was detected.
    pub frames_with_pose: u64,
    /// Video duration in seconds, when the service could determine it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Precomputed overall pose-detection rate, when the service sends it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jumping_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jumping_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shooting_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shooting_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dribbling_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dribbling_percentage: Option<f64>,
    /// Server-relative references to saved sample frames.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_frames: Vec<String>,
    /// Identifier of the stored result, when the service persisted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// ProjectedResult
// ─────────────────────────────────────────────────────────────────────────────

/// Display-ready statistics with every ratio field guaranteed present.
///
/// Each percentage is either the service-supplied value verbatim or
/// derived from the corresponding counts; a zero denominator yields 0,
/// never NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedResult {
    pub total_frames: u64,
    pub frames_with_pose: u64,
    /// Video duration in seconds, if known.
    pub duration: Option<f64>,
    /// Frame rate, only when both total frames and a non-zero duration
    /// are known; never a computed infinity.
    pub fps: Option<f64>,
    pub pose_percentage: f64,
    pub jumping_frames: u64,
    pub jumping_percentage: f64,
    pub shooting_frames: u64,
    pub shooting_percentage: f64,
    pub dribbling_frames: u64,
    pub dribbling_percentage: f64,
    /// Sample-frame references, passed through unchanged; resolution is
    /// the caller's concern.
    pub sample_frames: Vec<String>,
    pub result_id: Option<String>,
}

impl ProjectedResult {
    /// Serializes to the pretty-printed JSON document offered for
    /// download as `court-iq-results.json`.
    pub fn to_export_json(&self) -> Result<String, AnalysisError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AnalysisError::Internal(format!("Failed to serialize result: {}", e)))
    }

    /// Writes the export document to `path` atomically: the JSON is
    /// written to a `.part` sibling and renamed into place on success.
    pub async fn export_to(&self, path: &Path) -> Result<(), AnalysisError> {
        let json = self.to_export_json()?;
        let temp_path = path.with_extension("part");

        tokio::fs::write(&temp_path, json.as_bytes())
            .await
            .map_err(|e| AnalysisError::Internal(format!("Failed to write export file: {}", e)))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| AnalysisError::Internal(format!("Failed to persist export file: {}", e)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Projection
// ─────────────────────────────────────────────────────────────────────────────

/// Normalizes a raw payload into a complete, display-ready result.
///
/// Pure and total: well-formed input never fails. Service-supplied
/// percentages are preferred verbatim; missing ones are derived as
/// `round(count / denominator * 100)` with the overall rate over
/// `total_frames` and per-action rates over `frames_with_pose`.
pub fn project(raw: &RawResult) -> ProjectedResult {
    let jumping_frames = raw.jumping_frames.unwrap_or(0);
    let shooting_frames = raw.shooting_frames.unwrap_or(0);
    let dribbling_frames = raw.dribbling_frames.unwrap_or(0);

    let fps = match raw.duration {
        Some(duration) if duration > 0.0 => Some(raw.total_frames as f64 / duration),
        _ => None,
    };

    ProjectedResult {
        total_frames: raw.total_frames,
        frames_with_pose: raw.frames_with_pose,
        duration: raw.duration,
        fps,
        pose_percentage: raw
            .pose_percentage
            .unwrap_or_else(|| ratio(raw.frames_with_pose, raw.total_frames)),
        jumping_frames,
        jumping_percentage: raw
            .jumping_percentage
            .unwrap_or_else(|| ratio(jumping_frames, raw.frames_with_pose)),
        shooting_frames,
        shooting_percentage: raw
            .shooting_percentage
            .unwrap_or_else(|| ratio(shooting_frames, raw.frames_with_pose)),
        dribbling_frames,
        dribbling_percentage: raw
            .dribbling_percentage
            .unwrap_or_else(|| ratio(dribbling_frames, raw.frames_with_pose)),
        sample_frames: raw.sample_frames.clone(),
        result_id: raw.result_id.clone(),
    }
}

/// Percentage of `count` over `denominator`, rounded to a whole percent;
/// 0 when the denominator is 0.
fn ratio(count: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (count as f64 / denominator as f64 * 100.0).round()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_raw() -> RawResult {
        RawResult {
            total_frames: 100,
            frames_with_pose: 75,
            jumping_frames: Some(20),
            shooting_frames: Some(15),
            dribbling_frames: Some(30),
            ..RawResult::default()
        }
    }

    #[test]
    fn derives_missing_percentages_with_consistent_rounding() {
        let projected = project(&sparse_raw());

        assert_eq!(projected.pose_percentage, 75.0);
        // 20 / 75 = 26.67 rounds to 27
        assert_eq!(projected.jumping_percentage, 27.0);
        assert_eq!(projected.shooting_percentage, 20.0);
        assert_eq!(projected.dribbling_percentage, 40.0);
    }

    #[test]
    fn prefers_service_supplied_percentages_verbatim() {
        let raw = RawResult {
            pose_percentage: Some(74.3),
            jumping_percentage: Some(26.67),
            shooting_percentage: Some(20.0),
            dribbling_percentage: Some(40.0),
            ..sparse_raw()
        };

        let projected = project(&raw);

        assert_eq!(projected.pose_percentage, 74.3);
        assert_eq!(projected.jumping_percentage, 26.67);
    }

    #[test]
    fn projection_is_idempotent_on_fully_populated_input() {
        let raw = RawResult {
            total_frames: 100,
            frames_with_pose: 75,
            duration: Some(4.0),
            pose_percentage: Some(75.0),
            jumping_frames: Some(20),
            jumping_percentage: Some(27.0),
            shooting_frames: Some(15),
            shooting_percentage: Some(20.0),
            dribbling_frames: Some(30),
            dribbling_percentage: Some(40.0),
            sample_frames: vec!["/static/frame_1.jpg".into()],
            result_id: Some("abc123".into()),
        };

        let first = project(&raw);
        let roundtrip = RawResult {
            pose_percentage: Some(first.pose_percentage),
            jumping_percentage: Some(first.jumping_percentage),
            shooting_percentage: Some(first.shooting_percentage),
            dribbling_percentage: Some(first.dribbling_percentage),
            ..raw.clone()
        };

        assert_eq!(project(&roundtrip), first);
    }

    #[test]
    fn zero_denominators_yield_zero_not_nan() {
        let raw = RawResult {
            total_frames: 0,
            frames_with_pose: 0,
            jumping_frames: Some(0),
            ..RawResult::default()
        };

        let projected = project(&raw);

        assert_eq!(projected.pose_percentage, 0.0);
        assert_eq!(projected.jumping_percentage, 0.0);
        assert_eq!(projected.shooting_percentage, 0.0);
        assert_eq!(projected.dribbling_percentage, 0.0);
    }

    #[test]
    fn fps_requires_a_nonzero_duration() {
        let with_duration = RawResult {
            duration: Some(4.0),
            ..sparse_raw()
        };
        assert_eq!(project(&with_duration).fps, Some(25.0));

        let zero_duration = RawResult {
            duration: Some(0.0),
            ..sparse_raw()
        };
        assert_eq!(project(&zero_duration).fps, None);

        assert_eq!(project(&sparse_raw()).fps, None);
    }

    #[test]
    fn sample_frames_pass_through_unchanged() {
        let raw = RawResult {
            sample_frames: vec![
                "/static/processed_images/a/frame_60.jpg".into(),
                "/static/processed_images/a/frame_120.jpg".into(),
            ],
            ..sparse_raw()
        };

        let projected = project(&raw);

        assert_eq!(projected.sample_frames, raw.sample_frames);
    }

    #[test]
    fn raw_result_deserializes_from_sparse_wire_payload() {
        let json = r#"{
            "total_frames": 100,
            "frames_with_pose": 75,
            "jumping_frames": 20,
            "shooting_frames": 15,
            "dribbling_frames": 30
        }"#;

        let raw: RawResult = serde_json::from_str(json).unwrap();

        assert_eq!(raw.total_frames, 100);
        assert_eq!(raw.frames_with_pose, 75);
        assert!(raw.pose_percentage.is_none());
        assert!(raw.sample_frames.is_empty());
        assert!(raw.duration.is_none());
    }

    #[tokio::test]
    async fn export_writes_atomically_under_the_conventional_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        let temp_path = path.with_extension("part");

        let projected = project(&sparse_raw());
        projected.export_to(&path).await.unwrap();

        assert!(path.exists());
        assert!(!temp_path.exists());

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["pose_percentage"], 75.0);
        assert_eq!(parsed["jumping_percentage"], 27.0);
    }
}
