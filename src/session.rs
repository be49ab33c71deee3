//! Analysis session orchestration.
//!
//! `JobSession` owns the full lifecycle of one submission (validate,
//! upload, poll, project, publish-or-fail) and exposes exactly one
//! observable `SessionState` through a watch channel. Cancellation and
//! teardown are strict: once a run is cancelled, no further state
//! transition is observable, even for responses already in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{AnalysisError, ErrorInfo};
use crate::media::MediaFile;
use crate::poller::{JobPoller, PollEvent, StatusProvider};
use crate::progress::ProgressEstimator;
use crate::result::{project, ProjectedResult};
use crate::service::{AnalysisService, JobHandle, JobStatus, ProgressFn};

// ─────────────────────────────────────────────────────────────────────────────
// AnalysisApi
// ─────────────────────────────────────────────────────────────────────────────

/// Seam over the remote service used by the orchestrator, allowing test
/// fakes.
pub trait AnalysisApi: StatusProvider {
    /// Uploads a video and returns its job handle.
    fn submit_video<'a>(
        &'a self,
        file: &'a MediaFile,
        progress: ProgressFn,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle, AnalysisError>> + Send + 'a>>;
}

impl AnalysisApi for AnalysisService {
    fn submit_video<'a>(
        &'a self,
        file: &'a MediaFile,
        progress: ProgressFn,
    ) -> Pin<Box<dyn Future<Output = Result<JobHandle, AnalysisError>> + Send + 'a>> {
        Box::pin(AnalysisService::submit_video(self, file, progress))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionState
// ─────────────────────────────────────────────────────────────────────────────

/// Externally observable orchestrator state. Exactly one is current at
/// any time; only the orchestrator transitions it.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// No submission in flight.
    Idle,
    /// The selected file is being checked.
    Validating,
    /// The upload is in flight; `progress` is the overall estimate.
    Uploading { progress: u8 },
    /// The job is being polled; `status` is the last reported state.
    Polling { status: JobStatus, progress: u8 },
    /// The job finished and its result has been projected.
    Complete(ProjectedResult),
    /// The submission failed; terminal for this run.
    Failed(ErrorInfo),
}

impl SessionState {
    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete(_) | SessionState::Failed(_))
    }

    /// True while a submission is actively being worked on.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionState::Validating
                | SessionState::Uploading { .. }
                | SessionState::Polling { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CompletionListener
// ─────────────────────────────────────────────────────────────────────────────

/// Collaborator notified shortly after a submission completes, e.g. to
/// switch the surrounding UI to a history view. Best-effort: the
/// notification is never retried and never blocks the session.
pub trait CompletionListener: Send + Sync + 'static {
    fn on_complete(&self);
}

// ─────────────────────────────────────────────────────────────────────────────
// JobSession
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrator for the upload-and-analyze lifecycle.
///
/// One session drives at most one run at a time; submitting while a prior
/// run is in flight cancels it first. Dropping the session releases any
/// running timer.
pub struct JobSession<A: AnalysisApi> {
    api: Arc<A>,
    config: ClientConfig,
    state: Arc<watch::Sender<SessionState>>,
    file: Mutex<Option<MediaFile>>,
    active: Mutex<Option<ActiveRun>>,
    completion: Option<Arc<dyn CompletionListener>>,
}

/// An in-flight run: the cancel token and driver task it owns.
struct ActiveRun {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl JobSession<AnalysisService> {
    /// Creates a session backed by a real service client.
    pub fn connect(config: ClientConfig) -> Result<Self, AnalysisError> {
        let api = Arc::new(AnalysisService::new(&config)?);
        Ok(Self::new(api, config))
    }
}

impl<A: AnalysisApi> JobSession<A> {
    /// Creates a session over the given service seam.
    pub fn new(api: Arc<A>, config: ClientConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            api,
            config,
            state: Arc::new(state),
            file: Mutex::new(None),
            active: Mutex::new(None),
            completion: None,
        }
    }

    /// Registers a listener notified after the completion display delay.
    pub fn with_completion_listener(mut self, listener: Arc<dyn CompletionListener>) -> Self {
        self.completion = Some(listener);
        self
    }

    /// Subscribes to state changes. The receiver always reflects the
    /// latest state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The current state.
    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Selects (or replaces) the file for the next submission. Any
    /// in-flight run is cancelled and any terminal state from a previous
    /// run is cleared back to `Idle`.
    pub async fn select_file(&self, file: MediaFile) {
        self.teardown_active().await;
        *lock_slot(&self.file) = Some(file);
        self.state.send_replace(SessionState::Idle);
    }

    /// Submits the selected file for analysis.
    ///
    /// Cancels any in-flight predecessor first, then validates and
    /// launches the run. Returns once the run is launched; progress and
    /// the outcome are observed through `subscribe`.
    ///
    /// # Errors
    ///
    /// Returns (and publishes) `ClientSetup` failures for a missing file
    /// or one that fails validation; nothing reaches the network in
    /// either case.
    pub async fn submit(&self) -> Result<(), AnalysisError> {
        self.teardown_active().await;

        let Some(file) = lock_slot(&self.file).clone() else {
            let err = AnalysisError::NoFileSelected;
            self.state.send_replace(SessionState::Failed(err.info()));
            return Err(err);
        };

        self.state.send_replace(SessionState::Validating);
        if let Err(err) = file.validate() {
            warn!("[SESSION] rejected {}: {}", file.name(), err);
            self.state.send_replace(SessionState::Failed(err.info()));
            return Err(err);
        }

        let cancel = CancellationToken::new();
        let context = RunContext {
            api: self.api.clone(),
            state: self.state.clone(),
            poll_interval: self.config.poll_interval,
            completion_delay: self.config.completion_delay,
            completion: self.completion.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(context.run(file));
        *lock_slot(&self.active) = Some(ActiveRun { cancel, task });

        Ok(())
    }

    /// Cancels any in-flight run. The last published state is frozen; no
    /// transition is observable after this returns.
    pub async fn cancel(&self) {
        self.teardown_active().await;
    }

    /// Stops the active run, if any, and waits for its driver to exit.
    async fn teardown_active(&self) {
        let run = lock_slot(&self.active).take();
        if let Some(ActiveRun { cancel, task }) = run {
            cancel.cancel();
            task.abort();
            let _ = task.await;
        }
    }
}

impl<A: AnalysisApi> Drop for JobSession<A> {
    fn drop(&mut self) {
        if let Some(run) = lock_slot(&self.active).take() {
            run.cancel.cancel();
            run.task.abort();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunContext
// ─────────────────────────────────────────────────────────────────────────────

/// Everything one run needs, detached from the session so the driver task
/// holds no reference back to it.
struct RunContext<A: AnalysisApi> {
    api: Arc<A>,
    state: Arc<watch::Sender<SessionState>>,
    poll_interval: Duration,
    completion_delay: Duration,
    completion: Option<Arc<dyn CompletionListener>>,
    cancel: CancellationToken,
}

impl<A: AnalysisApi> RunContext<A> {
    /// Drives one submission to its terminal state.
    async fn run(self, file: MediaFile) {
        let estimator = Arc::new(Mutex::new(ProgressEstimator::new()));

        self.publish(SessionState::Uploading { progress: 0 });

        let progress: ProgressFn = {
            let estimator = estimator.clone();
            let state = self.state.clone();
            let token = self.cancel.clone();
            Arc::new(move |fraction| {
                if token.is_cancelled() {
                    return;
                }
                let percent = lock_slot(&estimator).on_upload(fraction);
                state.send_replace(SessionState::Uploading { progress: percent });
            })
        };

        info!(
            "[SESSION] uploading {} ({} bytes)",
            file.name(),
            file.size_bytes()
        );

        let submitted = tokio::select! {
            _ = self.cancel.cancelled() => return,
            submitted = self.api.submit_video(&file, progress) => submitted,
        };
        if self.cancel.is_cancelled() {
            return;
        }

        let handle = match submitted {
            Ok(handle) => handle,
            Err(err) => {
                warn!("[SESSION] upload failed: {}", err);
                self.publish(SessionState::Failed(err.info()));
                return;
            }
        };

        // The service reports the job as processing right after accepting
        // the upload; the first real status arrives with the first poll.
        let percent = lock_slot(&estimator).percent();
        self.publish(SessionState::Polling {
            status: JobStatus::Processing,
            progress: percent,
        });

        let poller = JobPoller::new(self.api.clone(), self.poll_interval);
        let mut active = poller.start(handle);

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    active.cancel();
                    return;
                }
                event = active.next_event() => event,
            };
            let Some(event) = event else { return };

            match event {
                PollEvent::Update(status) => {
                    let percent = lock_slot(&estimator).on_poll_tick();
                    self.publish(SessionState::Polling {
                        status,
                        progress: percent,
                    });
                }
                PollEvent::Terminal(Ok(raw)) => {
                    lock_slot(&estimator).complete();
                    let projected = project(&raw);
                    info!(
                        "[SESSION] analysis complete ({} frames)",
                        projected.total_frames
                    );
                    self.publish(SessionState::Complete(projected));
                    self.notify_completion();
                    return;
                }
                PollEvent::Terminal(Err(err)) => {
                    self.publish(SessionState::Failed(err.info()));
                    return;
                }
            }
        }
    }

    /// Publishes a state unless the run has been torn down.
    fn publish(&self, state: SessionState) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_replace(state);
    }

    /// Notifies the completion listener after the display delay.
    /// Best-effort: suppressed by teardown, never retried.
    fn notify_completion(&self) {
        let Some(listener) = self.completion.clone() else {
            return;
        };
        let delay = self.completion_delay;
        let token = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => listener.on_complete(),
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Locks a mutex, recovering the inner value if a panic poisoned it.
fn lock_slot<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
