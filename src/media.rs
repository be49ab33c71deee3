//! Local media file selection and pre-upload validation.
//!
//! Validation is a client-side UX gate, not a security boundary: it trusts
//! the declared MIME type and never inspects file contents. The size cap
//! mirrors the service's request limit so oversized files fail before any
//! bytes are sent.

use std::path::{Path, PathBuf};

use crate::error::AnalysisError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// MIME types accepted for upload: the container types used by common
/// mobile/desktop capture (MP4, QuickTime, AVI).
pub const ALLOWED_MIME_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/x-msvideo"];

/// Largest accepted upload (50 MB), matching the service's request cap.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// MediaFile
// ─────────────────────────────────────────────────────────────────────────────

/// A locally selected video file. Immutable once selected; a re-selection
/// replaces the whole value.
#[derive(Debug, Clone)]
pub struct MediaFile {
    path: PathBuf,
    name: String,
    mime_type: String,
    size_bytes: u64,
}

impl MediaFile {
    /// Creates a media file from an explicit path, declared MIME type, and
    /// size. The display name is derived from the path's final component.
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Builds a media file from a path, inferring the MIME type from the
    /// extension and reading the size from filesystem metadata.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::FileUnreadable` if the file's metadata
    /// cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AnalysisError::FileUnreadable {
                detail: e.to_string(),
            })?;

        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| mime_for_extension(&ext.to_ascii_lowercase()))
            .unwrap_or("application/octet-stream");

        Ok(Self::new(path, mime_type, metadata.len()))
    }

    /// The file's location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's display name (final path component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The file size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Checks the file against the accepted media types and the upload
    /// size cap. Pure: no I/O, no content sniffing.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::UnsupportedMediaType` for a MIME type outside the
    ///   allow-list
    /// - `AnalysisError::FileTooLarge` for a file above `MAX_UPLOAD_BYTES`
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(AnalysisError::UnsupportedMediaType {
                mime_type: self.mime_type.clone(),
            });
        }

        if self.size_bytes > MAX_UPLOAD_BYTES {
            return Err(AnalysisError::FileTooLarge {
                size_bytes: self.size_bytes,
                max_mb: MAX_UPLOAD_BYTES / (1024 * 1024),
            });
        }

        Ok(())
    }
}

/// Maps a lowercase file extension to its declared MIME type.
fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
