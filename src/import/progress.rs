//! Import stages and progress reporting.

use std::fmt;

/// Where an import currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImportStage {
    Idle,
    AcquiringRoot,
    LocatingManifest,
    ParsingManifest,
    MaterializingEntities,
    Complete,
    Failed,
}

impl ImportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStage::Idle => "idle",
            ImportStage::AcquiringRoot => "acquiring root",
            ImportStage::LocatingManifest => "locating manifest",
            ImportStage::ParsingManifest => "parsing manifest",
            ImportStage::MaterializingEntities => "materializing entities",
            ImportStage::Complete => "complete",
            ImportStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStage::Complete | ImportStage::Failed)
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressUpdate {
    pub stage: ImportStage,
    /// Overall completion in `[0, 1]`.
    pub fraction: f64,
}

/// Progress band boundaries.
pub(crate) const ACQUIRED: f64 = 0.20;
pub(crate) const LOCATED: f64 = 0.30;
pub(crate) const PARSED: f64 = 0.50;
pub(crate) const MATERIALIZED: f64 = 0.90;

/// Fraction reached after materializing `done` of `total` jobs.
pub(crate) fn materialization_fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return MATERIALIZED;
    }
    PARSED + (MATERIALIZED - PARSED) * (done as f64 / total as f64)
}

/// Forwards stage changes to an observer while keeping the fraction
/// monotonic for the lifetime of a run.
pub(crate) struct ProgressTracker<F: FnMut(ProgressUpdate)> {
    observer: F,
    fraction: f64,
}

impl<F: FnMut(ProgressUpdate)> ProgressTracker<F> {
    pub(crate) fn new(observer: F) -> Self {
        Self {
            observer,
            fraction: 0.0,
        }
    }

    pub(crate) fn report(&mut self, stage: ImportStage, fraction: f64) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            self.fraction
        };
        self.fraction = self.fraction.max(fraction);
        (self.observer)(ProgressUpdate {
            stage,
            fraction: self.fraction,
        });
    }

    /// Reports `Failed` at the fraction reached so far, then resets to
    /// `Idle` at zero.
    pub(crate) fn fail(&mut self) {
        (self.observer)(ProgressUpdate {
            stage: ImportStage::Failed,
            fraction: self.fraction,
        });
        self.fraction = 0.0;
        (self.observer)(ProgressUpdate {
            stage: ImportStage::Idle,
            fraction: 0.0,
        });
    }
}
