// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Executor
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Route a request and start it on the chosen path.

use cryo_types::config::SimulationRequest;
use cryo_types::error::CryoResult;
use cryo_types::progress::NoopMonitor;
use cryo_types::state::SimulationResult;
use log::info;

use crate::analysis::{run_with_ceiling, validate_request};
use crate::job::{RemoteDispatcher, RemoteJob, ThreadDispatcher};
use crate::router::{problem_size, route, ExecutionTarget, RouterConfig};

/// A request that has either finished locally or is running remotely.
#[derive(Debug)]
pub enum Execution {
    Local(CryoResult<SimulationResult>),
    Remote(RemoteJob),
}

impl Execution {
    pub fn target(&self) -> ExecutionTarget {
        match self {
            Self::Local(_) => ExecutionTarget::Local,
            Self::Remote(_) => ExecutionTarget::Remote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Executor<D: RemoteDispatcher = ThreadDispatcher> {
    config: RouterConfig,
    dispatcher: D,
}

impl Executor<ThreadDispatcher> {
    pub fn new(config: RouterConfig) -> Self {
        Self::with_dispatcher(config, ThreadDispatcher)
    }
}

impl<D: RemoteDispatcher> Executor<D> {
    pub fn with_dispatcher(config: RouterConfig, dispatcher: D) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run small problems inline, hand large ones to the dispatcher.
    ///
    /// Malformed requests fail here, before routing. Local runs report no
    /// progress and are capped at `local_wall_time_s`.
    pub fn submit(&self, request: SimulationRequest) -> CryoResult<Execution> {
        self.config.validate()?;
        validate_request(&request)?;
        let size = problem_size(&request);
        let target = route(&request, &self.config);
        info!(
            "Routing {} analysis of '{}' (size {size}, threshold {}) to {target}",
            request.analysis.name(),
            request.system.name,
            self.config.threshold_for(&request.analysis)
        );
        match target {
            ExecutionTarget::Local => Ok(Execution::Local(run_with_ceiling(
                &request,
                Some(self.config.local_wall_time_s),
                &mut NoopMonitor,
            ))),
            ExecutionTarget::Remote => self
                .dispatcher
                .dispatch(request, &self.config)
                .map(Execution::Remote),
        }
    }
}
