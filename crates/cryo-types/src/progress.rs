// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Progress & Cancellation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cooperative checkpoints between a running solve and whoever owns it.
//!
//! Solvers call [`SolveMonitor::checkpoint`] once per Newton iteration or
//! accepted timestep, never inside a linear solve. Progress updates are
//! advisory: a monitor may drop them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Periodic structured update emitted during a solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Estimated fraction complete in [0, 1].
    pub fraction_complete: f64,
    /// Current iteration or timestep (1-based).
    pub current_step: usize,
    /// Residual (steady) or max ΔT / elapsed metric (transient).
    pub residual_or_metric: f64,
}

/// What the solver should do after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    Cancel,
}

/// Receives progress and decides whether the solve continues.
pub trait SolveMonitor {
    fn checkpoint(&mut self, update: ProgressUpdate) -> Checkpoint;
}

/// Monitor that ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl SolveMonitor for NoopMonitor {
    fn checkpoint(&mut self, _update: ProgressUpdate) -> Checkpoint {
        Checkpoint::Continue
    }
}

/// Shared cancellation flag, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Monitor that only observes a [`CancelToken`].
#[derive(Debug, Clone)]
pub struct CancelMonitor {
    token: CancelToken,
}

impl CancelMonitor {
    pub fn new(token: CancelToken) -> Self {
        Self { token }
    }
}

impl SolveMonitor for CancelMonitor {
    fn checkpoint(&mut self, _update: ProgressUpdate) -> Checkpoint {
        if self.token.is_cancelled() {
            Checkpoint::Cancel
        } else {
            Checkpoint::Continue
        }
    }
}
