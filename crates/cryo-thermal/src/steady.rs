// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Steady-State Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Nonlinear steady-state solve.
//!
//! Each iteration re-assembles K(T) and Q(T), solves `K·ΔT = −(K·T − Q)`
//! and applies `T += α·ΔT`. Convergence is declared when the full step
//! satisfies `‖ΔT‖∞ < convergence_tolerance`. An unconverged solve
//! returns [`CryoError::Convergence`] and no temperature field.
//!
//! Iterates are clamped to each node's material range, so a linearised
//! overshoot (typically radiation from a cold start) never reaches a
//! property lookup outside its table.

use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::{Checkpoint, ProgressUpdate, SolveMonitor};
use cryo_types::state::{SolveMetadata, TemperatureField, ThermalState};
use log::{debug, info, warn};
use ndarray::Array1;
use std::time::Instant;

use crate::assembler::{assemble, boundary_heat_flows, residual};
use crate::linear::solve_linear;
use crate::problem::ThermalProblem;
use crate::validate::validate_anchoring;

/// Solve for the steady temperature field.
///
/// `initial` overrides the uniform `initial_temperature` guess; fixed
/// nodes are always reset to their imposed values.
pub fn solve_steady(
    problem: &ThermalProblem,
    initial: Option<&Array1<f64>>,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<TemperatureField> {
    validate_anchoring(problem.mesh(), problem.boundaries())?;
    let options = problem.options();
    let start = Instant::now();
    let mut state = ThermalState::from_temperatures(problem.initial_temperatures(initial)?);

    info!(
        "Steady solve: {} nodes, {} elements, {} boundary conditions, tol={:.1e} K, alpha={}",
        problem.node_count(),
        problem.mesh().element_count(),
        problem.boundaries().len(),
        options.convergence_tolerance,
        options.relaxation
    );

    let mut step_norm = f64::INFINITY;
    for iter in 1..=options.max_iterations {
        let system = assemble(problem, &state.temperatures)?;
        let current = state.temperatures.to_vec();
        let rhs: Vec<f64> = residual(&system, &current).into_iter().map(|r| -r).collect();

        let mut delta = vec![0.0; rhs.len()];
        let linear_iters = solve_linear(&system.conductance, &rhs, &mut delta, &options.linear)?;
        step_norm = delta.iter().fold(0.0_f64, |m, d| m.max(d.abs()));

        let mut next: Array1<f64> = current
            .iter()
            .zip(&delta)
            .map(|(t, d)| t + options.relaxation * d)
            .collect();
        let clamped = problem.clamp_to_valid(&mut next);
        if clamped > 0 {
            debug!("Iter {iter}: {clamped} nodes clamped to their material range");
        }
        problem.apply_fixed(&mut next);
        state.advance(next);

        debug!(
            "Iter {iter}: |dT|max={step_norm:.3e} K, linear iterations={linear_iters}, \
             T in [{:.3}, {:.3}] K",
            state.temperatures.iter().copied().fold(f64::INFINITY, f64::min),
            state.temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        );

        if step_norm < options.convergence_tolerance {
            let final_system = assemble(problem, &state.temperatures)?;
            let heat_flows = boundary_heat_flows(problem, &final_system, &state.temperatures);
            let wall_time_s = start.elapsed().as_secs_f64();
            info!("Steady solve converged in {iter} iterations ({wall_time_s:.3} s)");
            return Ok(TemperatureField {
                temperatures: state.temperatures,
                heat_flows,
                metadata: SolveMetadata {
                    iterations: iter,
                    wall_time_s,
                    converged: true,
                    final_residual: step_norm,
                },
            });
        }

        if !step_norm.is_finite() {
            return Err(CryoError::Convergence {
                iterations: iter,
                residual: step_norm,
            });
        }

        if let Some(limit) = options.max_wall_time_s {
            if start.elapsed().as_secs_f64() > limit {
                warn!("Steady solve hit the {limit} s wall-time ceiling at iteration {iter}");
                return Err(CryoError::Convergence {
                    iterations: iter,
                    residual: step_norm,
                });
            }
        }

        let update = ProgressUpdate {
            fraction_complete: iter as f64 / options.max_iterations as f64,
            current_step: iter,
            residual_or_metric: step_norm,
        };
        if monitor.checkpoint(update) == Checkpoint::Cancel {
            info!("Steady solve cancelled at iteration {iter}");
            return Err(CryoError::Cancelled { step: iter });
        }
    }

    Err(CryoError::Convergence {
        iterations: options.max_iterations,
        residual: step_norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::tests::constant_spec;
    use crate::material::MaterialCatalog;
    use cryo_types::config::{MaterialCategory, MaterialSpec, SolverOptions};
    use cryo_types::constants::STEFAN_BOLTZMANN;
    use cryo_types::progress::NoopMonitor;
    use cryo_types::state::{BoundaryCondition, Element, Mesh, Node};

    fn chain(materials: &[&str], length: f64, area: f64) -> Mesh {
        Mesh {
            nodes: (0..=materials.len())
                .map(|i| Node {
                    index: i,
                    position: [i as f64 * length, 0.0, 0.0],
                })
                .collect(),
            elements: materials
                .iter()
                .enumerate()
                .map(|(i, m)| Element {
                    nodes: [i, i + 1],
                    material: m.to_string(),
                    area,
                    length,
                })
                .collect(),
        }
    }

    fn catalog() -> MaterialCatalog {
        MaterialCatalog::from_specs(&[
            constant_spec("Cu", 400.0, 385.0, 8960.0),
            constant_spec("G10", 0.5, 900.0, 1900.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_linear_conduction_profile() {
        let mesh = chain(&["Cu"; 4], 0.05, 1e-4);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 300.0 },
            BoundaryCondition::FixedTemperature { node: 4, value: 4.2 },
        ];
        let problem = ThermalProblem::new(mesh, catalog(), bcs, SolverOptions::default()).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        for i in 0..=4 {
            let expected = 300.0 - (300.0 - 4.2) * i as f64 / 4.0;
            let got = field.temperatures[i];
            assert!((got - expected).abs() < 1e-6, "T[{i}] = {got}, expected {expected}");
        }
        let q = 400.0 * 1e-4 * (300.0 - 4.2) / 0.2;
        assert!((field.heat_flows[0].heat_flow_w - q).abs() / q < 1e-6);
        assert!(field.net_heat_flow().abs() < 1e-6 * q);
        assert!(field.metadata.converged);
    }

    #[test]
    fn test_interface_flux_matches_series_conductance() {
        let mesh = chain(&["Cu", "G10"], 0.1, 1e-4);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 80.0 },
            BoundaryCondition::FixedTemperature { node: 2, value: 4.2 },
        ];
        let problem = ThermalProblem::new(mesh, catalog(), bcs, SolverOptions::default()).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let (g_cu, g_g10) = (400.0 * 1e-4 / 0.1, 0.5 * 1e-4 / 0.1);
        let q = (80.0 - 4.2) / (1.0 / g_cu + 1.0 / g_g10);
        let got = field.heat_flows[0].heat_flow_w;
        assert!((got - q).abs() / q < 1e-6, "Q = {got}, expected {q}");
    }

    #[test]
    fn test_heat_source_raises_tip_temperature() {
        let mesh = chain(&["Cu"; 2], 0.1, 1e-4);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 4.2 },
            BoundaryCondition::HeatSource { node: 2, power: 0.5 },
        ];
        let problem = ThermalProblem::new(mesh, catalog(), bcs, SolverOptions::default()).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let dt = 0.5 / (400.0 * 1e-4 / 0.2);
        assert!((field.temperatures[2] - (4.2 + dt)).abs() < 1e-6);
        assert!((field.heat_flows[0].heat_flow_w + 0.5).abs() < 1e-9);
        assert!((field.heat_flows[1].heat_flow_w - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_radiation_equilibrium() {
        // Thin copper link to a 4.2 K sink, radiating to a 300 K shield.
        let mesh = chain(&["Cu"], 0.1, 1e-5);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 4.2 },
            BoundaryCondition::Radiation {
                node: 1,
                area: 0.01,
                emissivity: 0.1,
                ambient: 300.0,
            },
        ];
        let mut options = SolverOptions::default();
        options.relaxation = 0.5;
        options.initial_temperature = 20.0;
        let problem = ThermalProblem::new(mesh, catalog(), bcs, options).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let t = field.temperatures[1];
        let g = 400.0 * 1e-5 / 0.1;
        let radiated = STEFAN_BOLTZMANN * 0.1 * 0.01 * (300.0_f64.powi(4) - t.powi(4));
        assert!((g * (t - 4.2) - radiated).abs() < 1e-6, "node balance violated at T={t}");
        assert!(field.net_heat_flow().abs() < 1e-6);
    }

    #[test]
    fn test_cold_start_radiation_overshoot_is_bounded() {
        // The first linearised step from 10 K lands near 8e4 K.
        let mesh = chain(&["G10"], 0.1, 1e-4);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 4.2 },
            BoundaryCondition::Radiation {
                node: 1,
                area: 0.1,
                emissivity: 0.9,
                ambient: 300.0,
            },
        ];
        let mut options = SolverOptions::default();
        options.initial_temperature = 10.0;
        let problem = ThermalProblem::new(mesh, catalog(), bcs, options).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let t = field.temperatures[1];
        assert!(t > 298.0 && t < 300.0, "T = {t}");
        let g = 0.5 * 1e-4 / 0.1;
        let radiated = STEFAN_BOLTZMANN * 0.9 * 0.1 * (300.0_f64.powi(4) - t.powi(4));
        assert!((g * (t - 4.2) - radiated).abs() < 1e-6, "node balance violated at T={t}");
    }

    #[test]
    fn test_exact_radiation_between_fixed_temperatures() {
        // Black body at 80 K radiating to a 300 K enclosure.
        let mesh = chain(&["Cu"], 0.1, 1e-4);
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 80.0 },
            BoundaryCondition::FixedTemperature { node: 1, value: 80.0 },
            BoundaryCondition::Radiation {
                node: 1,
                area: 0.25,
                emissivity: 1.0,
                ambient: 300.0,
            },
        ];
        let problem = ThermalProblem::new(mesh, catalog(), bcs, SolverOptions::default()).unwrap();
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let expected = STEFAN_BOLTZMANN * 0.25 * (300.0_f64.powi(4) - 80.0_f64.powi(4));
        let got = field.heat_flows[2].heat_flow_w;
        assert!(
            (got - expected).abs() / expected < 1e-9,
            "Q = {got}, expected {expected}"
        );
        assert!(field.net_heat_flow().abs() < 1e-9 * expected);
    }

    #[test]
    fn test_idempotent_resolve() {
        let spec = MaterialSpec {
            id: "Cu".to_string(),
            category: MaterialCategory::Metal,
            density: 8960.0,
            conductivity: vec![[4.0, 300.0], [20.0, 1000.0], [77.0, 550.0], [300.0, 400.0]],
            specific_heat: vec![[4.0, 0.1], [300.0, 385.0]],
        };
        let catalog = MaterialCatalog::from_specs(&[spec]).unwrap();
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 300.0 },
            BoundaryCondition::FixedTemperature { node: 6, value: 4.2 },
        ];
        let mut options = SolverOptions::default();
        options.convergence_tolerance = 1e-8;
        let problem =
            ThermalProblem::new(chain(&["Cu"; 6], 0.05, 1e-4), catalog, bcs, options).unwrap();

        let first = solve_steady(&problem, None, &mut NoopMonitor).unwrap();
        assert!(first.metadata.iterations > 1);
        let again = solve_steady(&problem, Some(&first.temperatures), &mut NoopMonitor).unwrap();
        assert!(again.metadata.iterations <= 2, "took {}", again.metadata.iterations);
    }

    #[test]
    fn test_unanchored_cluster_rejected() {
        let mesh = chain(&["Cu"; 2], 0.1, 1e-4);
        let bcs = vec![BoundaryCondition::HeatSource { node: 1, power: 1.0 }];
        let problem = ThermalProblem::new(mesh, catalog(), bcs, SolverOptions::default()).unwrap();
        let err = solve_steady(&problem, None, &mut NoopMonitor).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_exhausted_iterations_report_convergence_error() {
        let spec = MaterialSpec {
            id: "Cu".to_string(),
            category: MaterialCategory::Metal,
            density: 8960.0,
            conductivity: vec![[4.0, 300.0], [20.0, 1000.0], [77.0, 550.0], [300.0, 400.0]],
            specific_heat: vec![[4.0, 0.1], [300.0, 385.0]],
        };
        let catalog = MaterialCatalog::from_specs(&[spec]).unwrap();
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 300.0 },
            BoundaryCondition::FixedTemperature { node: 4, value: 4.2 },
        ];
        let mut options = SolverOptions::default();
        options.max_iterations = 1;
        let problem =
            ThermalProblem::new(chain(&["Cu"; 4], 0.05, 1e-4), catalog, bcs, options).unwrap();
        match solve_steady(&problem, None, &mut NoopMonitor) {
            Err(CryoError::Convergence { iterations, .. }) => assert_eq!(iterations, 1),
            other => panic!("expected Convergence error, got {other:?}"),
        }
    }

    struct CancelAfter(usize);

    impl SolveMonitor for CancelAfter {
        fn checkpoint(&mut self, update: ProgressUpdate) -> Checkpoint {
            if update.current_step >= self.0 {
                Checkpoint::Cancel
            } else {
                Checkpoint::Continue
            }
        }
    }

    #[test]
    fn test_cancellation_is_terminal() {
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: 300.0 },
            BoundaryCondition::Radiation {
                node: 3,
                area: 0.1,
                emissivity: 0.9,
                ambient: 4.2,
            },
        ];
        let mut options = SolverOptions::default();
        options.relaxation = 0.3;
        let problem =
            ThermalProblem::new(chain(&["G10"; 3], 0.1, 1e-4), catalog(), bcs, options).unwrap();
        match solve_steady(&problem, None, &mut CancelAfter(2)) {
            Err(CryoError::Cancelled { step }) => assert_eq!(step, 2),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }
}
