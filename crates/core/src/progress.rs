//! Batch phase machine and progress math.
//!
//! A migration unit advances through a fixed phase sequence, processing a
//! bounded slice of its record list per controller invocation. The
//! [`BatchProgress`] value is ephemeral per run: every decision that
//! matters across restarts is derived from durable state (the mapping
//! store), so this struct only has to be honest, not persistent.

use serde::Serialize;

/// One phase of a migration unit.
///
/// Flat content: `Init → Rewriting → Done`.
/// Hierarchical content: `Init → Create → LinkHierarchy → Translate → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Rewriting,
    Create,
    LinkHierarchy,
    Translate,
    Done,
}

impl Phase {
    /// The sub-range of the unit interval this phase occupies, purely for
    /// external progress reporting. Hierarchical units split into
    /// 0–40% create, 40–70% link, 70–100% translate.
    pub fn fraction_range(self) -> (f64, f64) {
        match self {
            Phase::Init => (0.0, 0.0),
            Phase::Rewriting => (0.0, 1.0),
            Phase::Create => (0.0, 0.4),
            Phase::LinkHierarchy => (0.4, 0.7),
            Phase::Translate => (0.7, 1.0),
            Phase::Done => (1.0, 1.0),
        }
    }

    /// The phase that follows when the current record sweep completes.
    pub fn next(self, hierarchical: bool) -> Phase {
        match (self, hierarchical) {
            (Phase::Init, false) => Phase::Rewriting,
            (Phase::Init, true) => Phase::Create,
            (Phase::Rewriting, _) => Phase::Done,
            (Phase::Create, _) => Phase::LinkHierarchy,
            (Phase::LinkHierarchy, _) => Phase::Translate,
            (Phase::Translate, _) => Phase::Done,
            (Phase::Done, _) => Phase::Done,
        }
    }
}

/// Outcome counters exposed on the progress surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Ephemeral per-run progress for one migration unit.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub phase: Phase,
    /// Offset into the current phase's record list.
    pub cursor: usize,
    /// Length of the current phase's record list.
    pub total: usize,
    pub counters: Counters,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            phase: Phase::Init,
            cursor: 0,
            total: 0,
            counters: Counters::default(),
        }
    }

    /// Enter `phase` with a record list of length `total`, keeping counters.
    pub fn enter_phase(&mut self, phase: Phase, total: usize) {
        self.phase = phase;
        self.cursor = 0;
        self.total = total;
    }

    /// The index range of the next slice, at most `slice_size` long.
    pub fn next_slice(&self, slice_size: usize) -> std::ops::Range<usize> {
        let end = self.total.min(self.cursor + slice_size.max(1));
        self.cursor..end
    }

    /// Advance the cursor past a processed slice.
    pub fn advance(&mut self, processed: usize) {
        self.cursor = self.total.min(self.cursor + processed);
    }

    /// Whether the current phase's sweep is complete.
    pub fn phase_complete(&self) -> bool {
        self.cursor >= self.total
    }

    /// Completion within the current phase, in `[0, 1]`.
    pub fn phase_fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.cursor as f64 / self.total as f64
        }
    }

    /// Completion of the whole unit, mapping the phase fraction into the
    /// phase's sub-range of the unit interval.
    pub fn finished_fraction(&self) -> f64 {
        let (start, end) = self.phase.fraction_range();
        start + (end - start) * self.phase_fraction()
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}
