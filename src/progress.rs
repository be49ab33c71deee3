//! Synthetic two-phase progress estimation.
//!
//! The service reports byte-level progress only while the upload is in
//! flight; processing exposes no fractional completion at all. The
//! estimate therefore maps upload bytes into the lower half of the bar and
//! ramps by a fixed increment per poll tick afterwards, capped below 100
//! until a terminal status arrives.

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Upload progress occupies the lower half of the bar, leaving headroom
/// for the processing ramp.
const UPLOAD_PHASE_CEILING: u8 = 50;

/// The processing ramp never passes this value on its own.
const POLL_PHASE_CEILING: u8 = 90;

/// Increment applied on each poll tick.
const POLL_TICK_INCREMENT: u8 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// ProgressEstimator
// ─────────────────────────────────────────────────────────────────────────────

/// Monotone, bounded progress estimate for one submission.
///
/// Invariant: the reported percentage never decreases for the lifetime of
/// one job and never exceeds 100.
#[derive(Debug, Clone, Default)]
pub struct ProgressEstimator {
    percent: u8,
}

impl ProgressEstimator {
    /// Creates an estimator at 0%.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current estimate in `[0, 100]`.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Records upload progress as a fraction of bytes sent in `[0, 1]`.
    /// Returns the updated estimate.
    pub fn on_upload(&mut self, fraction: f64) -> u8 {
        let scaled = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        self.percent = self.percent.max(scaled.min(UPLOAD_PHASE_CEILING));
        self.percent
    }

    /// Records one poll tick during the processing phase. Returns the
    /// updated estimate.
    pub fn on_poll_tick(&mut self) -> u8 {
        let ramped = self
            .percent
            .saturating_add(POLL_TICK_INCREMENT)
            .min(POLL_PHASE_CEILING);
        self.percent = self.percent.max(ramped);
        self.percent
    }

    /// Forces the estimate to 100 once a terminal success is observed.
    pub fn complete(&mut self) -> u8 {
        self.percent = 100;
        self.percent
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
