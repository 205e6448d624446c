// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Execution Router
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deterministic local/remote routing by problem size.
//!
//! The decision depends only on the request, never on machine load, so
//! the same input always takes the same path.

use cryo_magnet::coil::segment_count;
use cryo_magnet::margin::peak_search_points;
use cryo_thermal::mesh::refined_element_count;
use cryo_types::config::{AnalysisSpec, SimulationRequest};
use cryo_types::constants::MIN_BIOT_SAVART_SEGMENTS;
use cryo_types::error::{CryoError, CryoResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTarget {
    /// Inline in the calling thread under a wall-time ceiling.
    Local,
    /// Queued on a cancellable worker with progress reporting.
    Remote,
}

impl ExecutionTarget {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Thermal problems with this many elements or more run remotely.
    #[serde(default = "default_local_threshold")]
    pub local_threshold: usize,
    /// Field and margin analyses with this many segment evaluations or
    /// more run remotely.
    #[serde(default = "default_local_field_evaluations")]
    pub local_field_evaluations: usize,
    /// Wall-time ceiling applied to local runs [s].
    #[serde(default = "default_local_wall_time")]
    pub local_wall_time_s: f64,
    /// Bounded progress channel capacity for remote runs.
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
    /// Emit every n-th checkpoint as a progress update.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_local_threshold() -> usize {
    2_000
}
fn default_local_field_evaluations() -> usize {
    50_000_000
}
fn default_local_wall_time() -> f64 {
    5.0
}
fn default_progress_capacity() -> usize {
    64
}
fn default_progress_every() -> usize {
    1
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            local_threshold: default_local_threshold(),
            local_field_evaluations: default_local_field_evaluations(),
            local_wall_time_s: default_local_wall_time(),
            progress_capacity: default_progress_capacity(),
            progress_every: default_progress_every(),
        }
    }
}

impl RouterConfig {
    /// Route every thermal problem of at least `threshold` elements remotely.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            local_threshold: threshold,
            ..Default::default()
        }
    }

    /// Size at which `analysis` leaves the local path, in the units of
    /// [`problem_size`].
    pub fn threshold_for(&self, analysis: &AnalysisSpec) -> usize {
        if analysis.is_thermal() {
            self.local_threshold
        } else {
            self.local_field_evaluations
        }
    }

    pub fn validate(&self) -> CryoResult<()> {
        if !self.local_wall_time_s.is_finite() || self.local_wall_time_s <= 0.0 {
            return Err(CryoError::Validation(format!(
                "local_wall_time_s must be finite and > 0, got {}",
                self.local_wall_time_s
            )));
        }
        if self.progress_capacity == 0 {
            return Err(CryoError::Validation(
                "progress_capacity must be >= 1".to_string(),
            ));
        }
        if self.progress_every == 0 {
            return Err(CryoError::Validation(
                "progress_every must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Work estimate of a request.
///
/// Thermal analyses count elements after refinement. Field maps count
/// segment evaluations (`segments × grid points`), margin analyses
/// segment evaluations over every coil's peak search. Saturates instead
/// of overflowing.
pub fn problem_size(request: &SimulationRequest) -> usize {
    let system = &request.system;
    let segments = |min_segments: usize| -> usize {
        system
            .coils
            .iter()
            .map(|c| segment_count(c, min_segments.max(MIN_BIOT_SAVART_SEGMENTS)))
            .fold(0, usize::saturating_add)
    };
    match &request.analysis {
        AnalysisSpec::SteadyState | AnalysisSpec::Transient(_) => system
            .geometry
            .as_ref()
            .map(|g| refined_element_count(g, system.solver.mesh_refinement))
            .unwrap_or(0),
        AnalysisSpec::FieldMap(grid) => segments(grid.min_segments).saturating_mul(grid.point_count()),
        AnalysisSpec::Margin(options) => {
            let points = system
                .coils
                .iter()
                .map(|c| peak_search_points(c, options))
                .fold(0, usize::saturating_add);
            segments(options.min_segments).saturating_mul(points)
        }
    }
}

pub fn route(request: &SimulationRequest, config: &RouterConfig) -> ExecutionTarget {
    if problem_size(request) < config.threshold_for(&request.analysis) {
        ExecutionTarget::Local
    } else {
        ExecutionTarget::Remote
    }
}
