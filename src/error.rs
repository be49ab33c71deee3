use serde::Serialize;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ErrorClass
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse classification of a failure, surfaced alongside every message.
///
/// Callers are expected to branch on the class (e.g. to decide whether a
/// retry could help) and display the message without guessing at the
/// lower-level cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Never reached the network: no file, unsupported type, oversized
    /// file, or a local setup problem.
    ClientSetup,
    /// The request was sent but no response ever came back.
    NetworkUnreachable,
    /// The server answered with a 4xx rejection carrying a reason.
    ServerRejected,
    /// 5xx, a malformed success payload, or an explicit FAILURE job status.
    ServerFailure,
}

// ─────────────────────────────────────────────────────────────────────────────
// AnalysisError
// ─────────────────────────────────────────────────────────────────────────────

/// Application-wide error type.
///
/// `Display` carries the single human-readable message shown to users;
/// diagnostic detail that should stay out of the UI lives in named fields
/// and reaches logs only.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    // ── File selection ────────────────────────────────────────────────────────
    #[error("Please select a video file")]
    NoFileSelected,

    #[error("Invalid file type. Please select an MP4, MOV, or AVI file.")]
    UnsupportedMediaType { mime_type: String },

    #[error("File too large. Maximum size is {max_mb}MB")]
    FileTooLarge { size_bytes: u64, max_mb: u64 },

    #[error("Could not read the selected file")]
    FileUnreadable { detail: String },

    // ── Network ───────────────────────────────────────────────────────────────
    #[error("No response from server. Please check your connection.")]
    Unreachable { detail: String },

    // ── Service ───────────────────────────────────────────────────────────────
    #[error("{reason}")]
    Rejected { reason: String },

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("{0}")]
    ServerFailure(String),

    // ── Lifecycle ─────────────────────────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Maps the variant into the four-way classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            AnalysisError::NoFileSelected
            | AnalysisError::UnsupportedMediaType { .. }
            | AnalysisError::FileTooLarge { .. }
            | AnalysisError::FileUnreadable { .. }
            | AnalysisError::Cancelled
            | AnalysisError::Internal(_) => ErrorClass::ClientSetup,

            AnalysisError::Unreachable { .. } => ErrorClass::NetworkUnreachable,

            AnalysisError::Rejected { .. } => ErrorClass::ServerRejected,

            AnalysisError::ProcessingFailed(_) | AnalysisError::ServerFailure(_) => {
                ErrorClass::ServerFailure
            }
        }
    }

    /// Converts the error into the (classification, message) pair a caller
    /// publishes to its UI.
    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            class: self.class(),
            message: self.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorInfo
// ─────────────────────────────────────────────────────────────────────────────

/// User-facing presentation of a failure: one classification, one message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub class: ErrorClass,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
