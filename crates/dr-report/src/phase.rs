//! Weighted multi-phase progress tracking.
//!
//! A report run moves through five fixed phases. Each phase owns a share of
//! the overall progress bar; the displayed percentage is always recomputed
//! from the full weighted formula so it never moves backwards while phases
//! advance in order.

use crate::error::Result;
use crate::host::{ModalKind, ProgressHost};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Maximum number of durations retained per phase.
pub const HISTORY_CAPACITY: usize = 10;

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKey {
    Initialization,
    DataGathering,
    InfoRetrieval,
    PdfGeneration,
    Success,
}

impl PhaseKey {
    /// Every phase in execution order.
    pub const ALL: [PhaseKey; 5] = [
        PhaseKey::Initialization,
        PhaseKey::DataGathering,
        PhaseKey::InfoRetrieval,
        PhaseKey::PdfGeneration,
        PhaseKey::Success,
    ];

    /// Share of overall progress in percentage points. Sums to 100.
    pub const fn weight_points(self) -> u32 {
        match self {
            PhaseKey::Initialization => 5,
            PhaseKey::DataGathering => 65,
            PhaseKey::InfoRetrieval => 20,
            PhaseKey::PdfGeneration => 5,
            PhaseKey::Success => 5,
        }
    }

    /// Share of overall progress as a fraction of 1.0.
    pub fn weight(self) -> f64 {
        f64::from(self.weight_points()) / 100.0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKey::Initialization => "initialization",
            PhaseKey::DataGathering => "data_gathering",
            PhaseKey::InfoRetrieval => "info_retrieval",
            PhaseKey::PdfGeneration => "pdf_generation",
            PhaseKey::Success => "success",
        }
    }

    /// Loading message shown while the phase runs.
    pub fn message(self) -> &'static str {
        match self {
            PhaseKey::Initialization => "Preparing report...",
            PhaseKey::DataGathering => "Capturing visualizations...",
            PhaseKey::InfoRetrieval => "Retrieving report details...",
            PhaseKey::PdfGeneration => "Generating PDF...",
            PhaseKey::Success => "Report ready",
        }
    }

    /// Generic message for failures that carry no user-facing text.
    pub fn failure_message(self) -> &'static str {
        match self {
            PhaseKey::Initialization => "Failed to prepare the report.",
            PhaseKey::DataGathering => "Failed to capture dashboard visualizations.",
            PhaseKey::InfoRetrieval => "Failed to retrieve report details.",
            PhaseKey::PdfGeneration => "Failed to generate the PDF document.",
            PhaseKey::Success => "Failed to finish the report.",
        }
    }
}

impl std::fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall percentage for `phase_progress` (clamped to [0, 1]) of `phase`.
pub fn calculate_progress(phase: PhaseKey, phase_progress: f64) -> u8 {
    let fraction = if phase_progress.is_nan() {
        0.0
    } else {
        phase_progress.clamp(0.0, 1.0)
    };
    let accumulated: u32 = PhaseKey::ALL
        .iter()
        .take_while(|key| **key != phase)
        .map(|key| key.weight_points())
        .sum();
    let percent = f64::from(accumulated) + f64::from(phase.weight_points()) * fraction;
    percent.round() as u8
}

/// Fixed-capacity FIFO of recent phase durations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationHistory {
    samples: VecDeque<Duration>,
}

impl DurationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a duration, evicting the oldest once full.
    pub fn push(&mut self, duration: Duration) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }
}

/// The phase currently in flight.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTracking {
    pub phase: PhaseKey,
    pub started_at: Instant,
}

impl PhaseTracking {
    fn start(phase: PhaseKey) -> Self {
        Self {
            phase,
            started_at: Instant::now(),
        }
    }
}

/// Runs phases, reports weighted progress and keeps duration history.
pub struct PhaseOrchestrator {
    host: Option<Arc<dyn ProgressHost>>,
    histories: Mutex<HashMap<PhaseKey, DurationHistory>>,
    current: Mutex<Option<PhaseTracking>>,
    last_percent: AtomicU8,
}

impl Default for PhaseOrchestrator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PhaseOrchestrator {
    /// Create an orchestrator. Without a host, progress updates are dropped.
    pub fn new(host: Option<Arc<dyn ProgressHost>>) -> Self {
        Self {
            host,
            histories: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            last_percent: AtomicU8::new(0),
        }
    }

    /// Run `operation` as `phase`.
    ///
    /// Emits 0% on entry and 100% on success. The elapsed time is recorded
    /// whether or not the operation fails; failures are returned unchanged.
    pub async fn execute_phase<T, F, Fut>(&self, phase: PhaseKey, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let tracking = PhaseTracking::start(phase);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(tracking);

        match self.estimate(phase) {
            Some(estimate) => info!(
                phase = %phase,
                estimate_ms = estimate.as_millis() as u64,
                "Phase started"
            ),
            None => info!(phase = %phase, "Phase started"),
        }
        self.report(phase, 0.0);

        let result = operation().await;

        let elapsed = tracking.started_at.elapsed();
        self.record(phase, elapsed);

        match &result {
            Ok(_) => {
                self.report(phase, 1.0);
                info!(
                    phase = %phase,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Phase complete"
                );
            }
            Err(err) => warn!(
                phase = %phase,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "Phase failed"
            ),
        }
        result
    }

    /// Report progress within `phase` using the phase's loading message.
    pub fn report(&self, phase: PhaseKey, phase_progress: f64) -> u8 {
        self.report_with_message(phase, phase_progress, phase.message())
    }

    /// Report progress within `phase` with a custom message.
    pub fn report_with_message(&self, phase: PhaseKey, phase_progress: f64, message: &str) -> u8 {
        let percent = calculate_progress(phase, phase_progress);
        self.last_percent.store(percent, Ordering::Relaxed);
        debug!(phase = %phase, percent, "Progress update");
        if let Some(host) = &self.host {
            host.show_modal(message, ModalKind::Loading, percent);
        }
        percent
    }

    /// Show a terminal (error or success) modal.
    pub fn notify(&self, kind: ModalKind, message: &str, percent: u8) {
        if let Some(host) = &self.host {
            host.show_modal(message, kind, percent);
        }
    }

    /// Hide the modal, if a host is attached.
    pub fn dismiss(&self) {
        if let Some(host) = &self.host {
            host.hide_modal();
        }
    }

    /// Most recently reported overall percentage.
    pub fn last_percent(&self) -> u8 {
        self.last_percent.load(Ordering::Relaxed)
    }

    /// The phase started most recently, if any.
    pub fn current(&self) -> Option<PhaseTracking> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retained durations for `phase`, oldest first.
    pub fn history(&self, phase: PhaseKey) -> DurationHistory {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&phase)
            .cloned()
            .unwrap_or_default()
    }

    /// Mean of the retained durations for `phase`.
    pub fn estimate(&self, phase: PhaseKey) -> Option<Duration> {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&phase)
            .and_then(DurationHistory::mean)
    }

    fn record(&self, phase: PhaseKey, elapsed: Duration) {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(phase)
            .or_default()
            .push(elapsed);
    }
}
