//! Asynchronous job-lifecycle client for the CourtIQ video analysis
//! service.
//!
//! The crate covers the whole flow from file selection to displayed
//! statistics:
//!
//! - **Validation**: a selected file is checked against the accepted
//!   video container types (and the service's size cap) before any bytes
//!   move.
//! - **Upload**: the file goes out as a streamed multipart body with
//!   byte-level progress reporting.
//! - **Polling**: the returned job is polled on a fixed interval until it
//!   reaches a terminal state, with strict discard-on-cancel semantics.
//! - **Projection**: the raw result payload is normalized into a
//!   display-ready statistics object with every ratio field present.
//! - **Orchestration**: [`session::JobSession`] ties the phases together
//!   behind a single observable state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use courtiq_client::{ClientConfig, JobSession, MediaFile, SessionState};
//! use url::Url;
//!
//! # async fn example() -> Result<(), courtiq_client::AnalysisError> {
//! let config = ClientConfig::new(Url::parse("http://localhost:5001").unwrap());
//! let session = JobSession::connect(config)?;
//! let mut states = session.subscribe();
//!
//! let file = MediaFile::from_path("practice.mp4").await?;
//! file.validate()?;
//! session.select_file(file).await;
//! session.submit().await?;
//!
//! while states.changed().await.is_ok() {
//!     match &*states.borrow() {
//!         SessionState::Complete(result) => {
//!             println!("pose detected in {}% of frames", result.pose_percentage);
//!             break;
//!         }
//!         SessionState::Failed(info) => {
//!             eprintln!("{}", info.message);
//!             break;
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod poller;
pub mod progress;
pub mod result;
pub mod service;
pub mod session;

pub use config::ClientConfig;
pub use error::{AnalysisError, ErrorClass, ErrorInfo};
pub use media::MediaFile;
pub use progress::ProgressEstimator;
pub use result::{project, ProjectedResult, RawResult, EXPORT_FILE_NAME};
pub use service::{AnalysisService, JobHandle, JobStatus};
pub use session::{CompletionListener, JobSession, SessionState};
