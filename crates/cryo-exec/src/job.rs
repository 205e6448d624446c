// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Remote Jobs
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cancellable long-running solves with a bounded progress channel.
//!
//! The solver side never blocks on progress: updates go through
//! `try_send` and are dropped when the channel is full. Cancellation is
//! observed at the next iteration or timestep checkpoint.

use cryo_types::config::SimulationRequest;
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::{CancelToken, Checkpoint, ProgressUpdate, SolveMonitor};
use cryo_types::state::SimulationResult;
use log::{debug, info, warn};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use crate::analysis::run_analysis;
use crate::router::RouterConfig;

/// Terminal state of a remote job.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(SimulationResult),
    Failed(CryoError),
    Cancelled { step: usize },
    /// The worker died without reporting a result.
    Crashed(String),
}

impl JobOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Crashed(_) => "crashed",
        }
    }

    fn from_result(result: CryoResult<SimulationResult>) -> Self {
        match result {
            Ok(result) => Self::Completed(result),
            Err(CryoError::Cancelled { step }) => Self::Cancelled { step },
            Err(e) => Self::Failed(e),
        }
    }
}

/// Forwards checkpoints to a bounded channel and observes a cancel token.
#[derive(Debug)]
pub struct ChannelMonitor {
    token: CancelToken,
    sender: SyncSender<ProgressUpdate>,
    every: usize,
    seen: usize,
    dropped: usize,
}

impl ChannelMonitor {
    pub fn new(token: CancelToken, sender: SyncSender<ProgressUpdate>, every: usize) -> Self {
        Self {
            token,
            sender,
            every: every.max(1),
            seen: 0,
            dropped: 0,
        }
    }

    /// Updates discarded because the consumer fell behind.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl SolveMonitor for ChannelMonitor {
    fn checkpoint(&mut self, update: ProgressUpdate) -> Checkpoint {
        self.seen += 1;
        if self.seen % self.every == 0 {
            match self.sender.try_send(update) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.dropped += 1,
                // Nobody listens any more; keep solving.
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        if self.token.is_cancelled() {
            Checkpoint::Cancel
        } else {
            Checkpoint::Continue
        }
    }
}

/// Handle to a solve running elsewhere.
#[derive(Debug)]
pub struct RemoteJob {
    cancel: CancelToken,
    progress: Receiver<ProgressUpdate>,
    worker: JoinHandle<CryoResult<SimulationResult>>,
}

impl RemoteJob {
    /// Request cancellation; takes effect at the next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Advisory progress stream. Silence is not failure.
    pub fn progress(&self) -> &Receiver<ProgressUpdate> {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker reaches a terminal state.
    pub fn wait(self) -> JobOutcome {
        match self.worker.join() {
            Ok(result) => {
                let outcome = JobOutcome::from_result(result);
                info!("Remote job {}", outcome.name());
                outcome
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                warn!("Remote job crashed: {message}");
                JobOutcome::Crashed(message)
            }
        }
    }
}

/// Hands a request to whatever runs remote work.
pub trait RemoteDispatcher {
    fn dispatch(&self, request: SimulationRequest, config: &RouterConfig) -> CryoResult<RemoteJob>;
}

/// Runs each remote request on a dedicated native thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDispatcher;

impl RemoteDispatcher for ThreadDispatcher {
    fn dispatch(&self, request: SimulationRequest, config: &RouterConfig) -> CryoResult<RemoteJob> {
        config.validate()?;
        let cancel = CancelToken::new();
        let (sender, progress) = sync_channel(config.progress_capacity);
        let mut monitor = ChannelMonitor::new(cancel.clone(), sender, config.progress_every);
        let name = format!("cryosim-{}", request.analysis.name());
        debug!("Dispatching '{}' to worker {name}", request.system.name);

        let worker = thread::Builder::new().name(name).spawn(move || {
            let result = run_analysis(&request, &mut monitor);
            if monitor.dropped() > 0 {
                debug!("{} progress updates dropped", monitor.dropped());
            }
            result
        })?;
        Ok(RemoteJob {
            cancel,
            progress,
            worker,
        })
    }
}
