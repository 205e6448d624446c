// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Transient Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Implicit (backward Euler) time integration with an adaptive step.
//!
//! Each step assembles K, Q and C at the current field, then solves
//!
//! ```text
//! (K + C/Δt)·T(n+1) = C/Δt·T(n) + Q
//! ```
//!
//! k(T) and Cp(T) are lagged one step. The controller scales Δt by
//! `sqrt(tol / max|ΔT|)` clamped to [0.5, 2] and rejects steps whose
//! change exceeds `REJECT_FACTOR · tol`.

use cryo_types::config::{StopCriterion, TransientOptions};
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::{Checkpoint, ProgressUpdate, SolveMonitor};
use cryo_types::state::{SolveMetadata, ThermalState, TransientResult};
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use std::time::Instant;

use crate::assembler::assemble;
use crate::linear::solve_linear;
use crate::problem::ThermalProblem;

/// Steps changing more than this multiple of the tolerance are retried.
const REJECT_FACTOR: f64 = 4.0;

/// Bounds on the per-step Δt scale factor.
const MIN_STEP_GROWTH: f64 = 0.5;
const MAX_STEP_GROWTH: f64 = 2.0;

/// Relative slack when comparing elapsed time against `max_time`.
const TIME_EPS: f64 = 1e-12;

pub fn solve_transient(
    problem: &ThermalProblem,
    options: &TransientOptions,
    initial: Option<&Array1<f64>>,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<TransientResult> {
    options.validate()?;
    let solver = problem.options();
    let adaptive = solver.adaptive_timestep;
    let start = Instant::now();

    let mut state = ThermalState::from_temperatures(problem.initial_temperatures(initial)?);
    let n = state.node_count();

    // Dirichlet nodes never move, so they are excluded from step control
    // and stop criteria unless nothing else is left.
    let free: Vec<usize> = problem.free_nodes().collect();
    let watched: Vec<usize> = if free.is_empty() {
        (0..n).collect()
    } else {
        free
    };

    let min_dt = options.min_timestep;
    let max_dt = options.max_timestep.unwrap_or(options.max_time);
    let mut dt = options.initial_timestep.min(max_dt);

    info!(
        "Transient solve: {} nodes, t_max={} s, dt0={} s, adaptive={}, target={:?}",
        n, options.max_time, dt, adaptive, options.target_temperature
    );

    let mut times = vec![0.0];
    let mut snapshots = vec![state.temperatures.clone()];
    let mut time = 0.0;
    let mut steps = 0usize;
    let mut rejected = 0usize;
    let mut observed = 0.0;
    let mut reached_target = target_met(&state.temperatures, &watched, options);

    while !reached_target && time < options.max_time * (1.0 - TIME_EPS) {
        if steps >= options.max_steps {
            warn!(
                "Transient solve exhausted {} steps at t={time:.3e} s",
                options.max_steps
            );
            return Err(CryoError::Convergence {
                iterations: steps,
                residual: observed,
            });
        }

        let step_dt = dt.min(options.max_time - time);
        let next = backward_euler_step(problem, &state.temperatures, step_dt)?;
        let change = max_change(&next, &state.temperatures, &watched);

        if adaptive && change > REJECT_FACTOR * options.timestep_tolerance {
            rejected += 1;
            dt = 0.5 * step_dt;
            warn!(
                "Rejected step at t={time:.3e} s: |dT|max={change:.3e} K, retrying with dt={dt:.3e} s"
            );
            if dt < min_dt {
                return Err(CryoError::Convergence {
                    iterations: steps,
                    residual: change,
                });
            }
            continue;
        }

        time += step_dt;
        steps += 1;
        observed = change;
        state.advance(next);
        times.push(time);
        snapshots.push(state.temperatures.clone());
        reached_target = target_met(&state.temperatures, &watched, options);

        debug!("Step {steps}: t={time:.4e} s, dt={step_dt:.3e} s, |dT|max={change:.3e} K");

        if adaptive {
            let factor = if change > 0.0 {
                (options.timestep_tolerance / change).sqrt()
            } else {
                MAX_STEP_GROWTH
            };
            dt = (step_dt * factor.clamp(MIN_STEP_GROWTH, MAX_STEP_GROWTH)).clamp(min_dt, max_dt);
        }

        if let Some(limit) = solver.max_wall_time_s {
            if start.elapsed().as_secs_f64() > limit {
                warn!("Transient solve hit the {limit} s wall-time ceiling at t={time:.3e} s");
                return Err(CryoError::Convergence {
                    iterations: steps,
                    residual: change,
                });
            }
        }

        let update = ProgressUpdate {
            fraction_complete: (time / options.max_time).min(1.0),
            current_step: steps,
            residual_or_metric: change,
        };
        if monitor.checkpoint(update) == Checkpoint::Cancel {
            info!("Transient solve cancelled at step {steps}");
            return Err(CryoError::Cancelled { step: steps });
        }
    }

    let mut history = Array2::zeros((snapshots.len(), n));
    for (mut row, snapshot) in history.outer_iter_mut().zip(&snapshots) {
        row.assign(snapshot);
    }

    let wall_time_s = start.elapsed().as_secs_f64();
    info!(
        "Transient solve finished: {steps} steps ({rejected} rejected), t={time:.4e} s, \
         target reached={reached_target} ({wall_time_s:.3} s)"
    );

    Ok(TransientResult {
        times: Array1::from_vec(times),
        snapshots: history,
        reached_target,
        rejected_steps: rejected,
        metadata: SolveMetadata {
            iterations: steps,
            wall_time_s,
            converged: true,
            final_residual: observed,
        },
    })
}

/// One implicit step of length `dt` from `current`.
fn backward_euler_step(
    problem: &ThermalProblem,
    current: &Array1<f64>,
    dt: f64,
) -> CryoResult<Array1<f64>> {
    let system = assemble(problem, current)?;
    let mut a = system.conductance;
    let mut rhs = system.load;
    for (i, &c) in system.capacity.iter().enumerate() {
        let m = c / dt;
        a.add_to_diagonal(i, m);
        rhs[i] += m * current[i];
    }

    let mut x = current.to_vec();
    solve_linear(&a, &rhs, &mut x, &problem.options().linear)?;
    let mut next = Array1::from_vec(x);
    problem.apply_fixed(&mut next);
    Ok(next)
}

fn max_change(next: &Array1<f64>, current: &Array1<f64>, nodes: &[usize]) -> f64 {
    nodes
        .iter()
        .map(|&i| (next[i] - current[i]).abs())
        .fold(0.0, f64::max)
}

fn target_met(temperatures: &Array1<f64>, nodes: &[usize], options: &TransientOptions) -> bool {
    let Some(target) = options.target_temperature else {
        return false;
    };
    let watched = nodes.iter().map(|&i| temperatures[i]);
    match options.stop_criterion {
        StopCriterion::AnyNodeBelow => watched.fold(f64::INFINITY, f64::min) <= target,
        StopCriterion::AllNodesBelow => watched.fold(f64::NEG_INFINITY, f64::max) <= target,
    }
}
