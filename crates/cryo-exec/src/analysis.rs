// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Analysis Dispatch
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Validate, build and solve one analysis.

use cryo_magnet::coil::validate_coil;
use cryo_magnet::{field_map, margin_analysis};
use cryo_thermal::{solve_steady, solve_transient, MaterialCatalog, ThermalProblem};
use cryo_types::config::{AnalysisSpec, MarginOptions, SimulationRequest, SystemDescription};
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::SolveMonitor;
use cryo_types::state::SimulationResult;
use log::info;

/// Run `request` to completion in the calling thread.
pub fn run_analysis(
    request: &SimulationRequest,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<SimulationResult> {
    run_with_ceiling(request, None, monitor)
}

/// As [`run_analysis`], tightening every analysis' wall-time ceiling to
/// `ceiling_s`.
pub(crate) fn run_with_ceiling(
    request: &SimulationRequest,
    ceiling_s: Option<f64>,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<SimulationResult> {
    let system = &request.system;
    info!("Running {} analysis of '{}'", request.analysis.name(), system.name);

    match &request.analysis {
        AnalysisSpec::SteadyState | AnalysisSpec::Transient(_) => {
            let mut problem = ThermalProblem::from_description(system)?;
            if let Some(limit) = ceiling_s {
                problem.limit_wall_time(limit);
            }
            match &request.analysis {
                AnalysisSpec::Transient(options) => {
                    solve_transient(&problem, options, None, monitor).map(SimulationResult::Transient)
                }
                _ => solve_steady(&problem, None, monitor).map(SimulationResult::SteadyState),
            }
        }
        AnalysisSpec::FieldMap(grid) => {
            require_coils(system)?;
            let mut grid = grid.clone();
            if let Some(limit) = ceiling_s {
                grid.limit_wall_time(limit);
            }
            field_map(&system.coils, &grid, monitor).map(SimulationResult::FieldMap)
        }
        AnalysisSpec::Margin(options) => {
            require_coils(system)?;
            let mut options = options.clone();
            if let Some(limit) = ceiling_s {
                options.limit_wall_time(limit);
            }
            run_margin(system, &options, monitor)
        }
    }
}

/// Checks that need no meshing or discretization: analysis options, the
/// presence of geometry or coils, and every coil's parameters.
pub fn validate_request(request: &SimulationRequest) -> CryoResult<()> {
    let system = &request.system;
    match &request.analysis {
        AnalysisSpec::SteadyState | AnalysisSpec::Transient(_) => {
            system.solver.validate()?;
            if let AnalysisSpec::Transient(options) = &request.analysis {
                options.validate()?;
            }
            if system.geometry.is_none() {
                return Err(CryoError::Validation(format!(
                    "system '{}' has no geometry; thermal analyses need a layout or mesh",
                    system.name
                )));
            }
            Ok(())
        }
        AnalysisSpec::FieldMap(grid) => {
            grid.validate()?;
            require_coils(system)?;
            system.coils.iter().try_for_each(validate_coil)
        }
        AnalysisSpec::Margin(options) => {
            options.validate()?;
            require_coils(system)?;
            system.coils.iter().try_for_each(validate_coil)
        }
    }
}

fn require_coils(system: &SystemDescription) -> CryoResult<()> {
    if system.coils.is_empty() {
        return Err(CryoError::Validation(format!(
            "system '{}' has no coils; magnet analyses need at least one",
            system.name
        )));
    }
    Ok(())
}

/// One margin report per coil, each against the field of all coils.
fn run_margin(
    system: &SystemDescription,
    options: &MarginOptions,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<SimulationResult> {
    let catalog = if system.materials.is_empty() {
        None
    } else {
        Some(MaterialCatalog::from_specs(&system.materials)?)
    };
    margin_analysis(&system.coils, options, catalog.as_ref(), monitor).map(SimulationResult::Margin)
}
