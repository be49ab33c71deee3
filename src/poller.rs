//! Fixed-interval job status polling with strict cancellation.
//!
//! One timer, one in-flight request at a time: a tick is not consumed
//! while the previous status request is still outstanding, so responses
//! can never race each other. Exactly one terminal event is delivered per
//! handle, and nothing is delivered after cancellation: a response
//! already in flight when `cancel` is called is discarded, not delivered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::result::RawResult;
use crate::service::{redact_id, AnalysisService, JobHandle, JobStatus, StatusResponse};

// ─────────────────────────────────────────────────────────────────────────────
// StatusProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Status-query seam so orchestration and tests can substitute fakes.
pub trait StatusProvider: Send + Sync + 'static {
    /// Queries the current status of a job.
    fn job_status<'a>(
        &'a self,
        handle: &'a JobHandle,
    ) -> Pin<Box<dyn Future<Output = Result<StatusResponse, AnalysisError>> + Send + 'a>>;
}

impl StatusProvider for AnalysisService {
    fn job_status<'a>(
        &'a self,
        handle: &'a JobHandle,
    ) -> Pin<Box<dyn Future<Output = Result<StatusResponse, AnalysisError>> + Send + 'a>> {
        Box::pin(AnalysisService::job_status(self, handle))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PollEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Events delivered while a poll loop runs.
#[derive(Debug)]
pub enum PollEvent {
    /// The job is still in flight with the given status.
    Update(JobStatus),
    /// The job finished. Always the last event for a handle.
    Terminal(Result<RawResult, AnalysisError>),
}

// ─────────────────────────────────────────────────────────────────────────────
// JobPoller
// ─────────────────────────────────────────────────────────────────────────────

/// Polls a job's status on a fixed period until a terminal state.
pub struct JobPoller<P> {
    provider: Arc<P>,
    period: Duration,
}

impl<P: StatusProvider> JobPoller<P> {
    /// Creates a poller querying `provider` every `period`.
    pub fn new(provider: Arc<P>, period: Duration) -> Self {
        Self { provider, period }
    }

    /// Starts polling `handle`. The returned handle owns the timer:
    /// dropping it or calling `cancel` stops polling.
    pub fn start(&self, handle: JobHandle) -> ActivePoll {
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let provider = self.provider.clone();
        let period = self.period;
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            run_poll_loop(provider, handle, period, token, events_tx).await;
        });

        ActivePoll {
            cancel,
            events: events_rx,
            task,
        }
    }
}

async fn run_poll_loop<P: StatusProvider>(
    provider: Arc<P>,
    handle: JobHandle,
    period: Duration,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<PollEvent>,
) {
    let mut ticker = tokio::time::interval(period);
    // A slow response delays the next tick instead of causing a burst of
    // catch-up requests.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; consume it so the first
    // status request happens one full period after the job was accepted.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        // One request at a time: the next tick is not consumed until this
        // response has been handled.
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = provider.job_status(&handle) => outcome,
        };
        if cancel.is_cancelled() {
            // Cancelled while the response was being produced; discard it.
            return;
        }

        match outcome {
            Ok(reply) => match reply.status {
                JobStatus::Succeeded => {
                    info!("[POLL] job {} succeeded", redact_id(handle.as_str()));
                    let event = match reply.result {
                        Some(raw) => PollEvent::Terminal(Ok(raw)),
                        None => PollEvent::Terminal(Err(AnalysisError::ServerFailure(
                            "Success reported without a result payload".to_string(),
                        ))),
                    };
                    let _ = events.send(event);
                    return;
                }
                JobStatus::Failed => {
                    let message = reply
                        .error
                        .unwrap_or_else(|| "Unknown error".to_string());
                    info!("[POLL] job {} failed", redact_id(handle.as_str()));
                    let _ = events.send(PollEvent::Terminal(Err(
                        AnalysisError::ProcessingFailed(message),
                    )));
                    return;
                }
                status => {
                    let _ = events.send(PollEvent::Update(status));
                }
            },
            Err(err) => {
                // A single failed poll terminates the job from the
                // client's perspective; the remote job may still run.
                warn!(
                    "[POLL] status check for {} failed: {}",
                    redact_id(handle.as_str()),
                    err
                );
                let _ = events.send(PollEvent::Terminal(Err(err)));
                return;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ActivePoll
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to a running poll loop. The timer lives exactly as long as this
/// handle: dropping it cancels polling.
pub struct ActivePoll {
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<PollEvent>,
    task: JoinHandle<()>,
}

impl ActivePoll {
    /// Receives the next event. Returns `None` once the loop has finished
    /// or after `cancel`; an event queued before cancellation is
    /// discarded, never delivered.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Stops the timer. No event is delivered after this returns, even if
    /// a status request is already in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ActivePoll {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
