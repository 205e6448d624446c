// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Thermal Assembler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conductance matrix K, load vector Q and lumped capacity C.
//!
//! `assemble` is a pure function of the problem and a temperature field;
//! both the steady and transient solvers call it once per iteration or
//! step. The steady residual is `K·T − Q`.
//!
//! Element conductance is `G = k_face·A/L`, where `k_face` is the
//! harmonic mean of k evaluated at each end node (two conductors of half
//! length in series). Radiation is linearized about the current field:
//! `4σεA·T*³` on the diagonal and `σεA·(3T*⁴ + T_amb⁴)` in Q, so the
//! residual carries the exact gray-body exchange at `T*`.

use cryo_math::sparse::{CsrMatrix, TripletMatrix};
use cryo_types::constants::{DIRICHLET_PENALTY_FACTOR, STEFAN_BOLTZMANN};
use cryo_types::error::CryoResult;
use cryo_types::state::{BoundaryCondition, BoundaryHeatFlow};
use ndarray::Array1;

use crate::problem::ThermalProblem;

/// Linearized thermal network at one temperature field.
#[derive(Debug, Clone)]
pub struct ThermalSystem {
    /// K [W/K], penalty rows included.
    pub conductance: CsrMatrix,
    /// Q [W], penalty terms included.
    pub load: Vec<f64>,
    /// Lumped nodal heat capacity ρ·Cp·V [J/K].
    pub capacity: Vec<f64>,
    /// Dirichlet penalty added to each fixed row.
    pub penalty: f64,
    /// G per element [W/K], same order as `mesh.elements`.
    pub element_conductance: Vec<f64>,
}

impl ThermalSystem {
    pub fn node_count(&self) -> usize {
        self.load.len()
    }
}

/// Series combination of two half-elements: `2·k₁·k₂/(k₁+k₂)`.
pub fn harmonic_mean(k1: f64, k2: f64) -> f64 {
    let sum = k1 + k2;
    if sum <= 0.0 {
        0.0
    } else {
        2.0 * k1 * k2 / sum
    }
}

pub fn assemble(problem: &ThermalProblem, temperatures: &Array1<f64>) -> CryoResult<ThermalSystem> {
    let mesh = problem.mesh();
    let n = mesh.node_count();
    let mut triplets = TripletMatrix::with_capacity(n, 4 * mesh.element_count() + n);
    let mut load = vec![0.0; n];
    let mut capacity = vec![0.0; n];
    let mut element_conductance = Vec::with_capacity(mesh.element_count());

    for (e, element) in mesh.elements.iter().enumerate() {
        let material = problem.element_material(e);
        let [a, b] = element.nodes;
        let (ta, tb) = (temperatures[a], temperatures[b]);

        let k_face = harmonic_mean(material.conductivity(ta)?, material.conductivity(tb)?);
        let g = k_face * element.area / element.length;
        triplets.add_coupling(a, b, g);
        element_conductance.push(g);

        let half_volume = 0.5 * element.volume();
        capacity[a] += material.density() * material.specific_heat(ta)? * half_volume;
        capacity[b] += material.density() * material.specific_heat(tb)? * half_volume;
    }

    for bc in problem.boundaries() {
        match *bc {
            BoundaryCondition::Radiation {
                node,
                area,
                emissivity,
                ambient,
            } => {
                let c = STEFAN_BOLTZMANN * emissivity * area;
                let t = temperatures[node];
                triplets.add(node, node, 4.0 * c * t.powi(3));
                load[node] += c * (3.0 * t.powi(4) + ambient.powi(4));
            }
            BoundaryCondition::Convection {
                node,
                coefficient,
                ambient,
            } => {
                triplets.add(node, node, coefficient);
                load[node] += coefficient * ambient;
            }
            BoundaryCondition::HeatSource { node, power } => {
                load[node] += power;
            }
            BoundaryCondition::FixedTemperature { .. } => {}
        }
    }

    let mut conductance = triplets.to_csr();
    let penalty = DIRICHLET_PENALTY_FACTOR * conductance.max_abs().max(1.0);
    for bc in problem.boundaries() {
        if let BoundaryCondition::FixedTemperature { node, value } = *bc {
            conductance.add_to_diagonal(node, penalty);
            load[node] += penalty * value;
        }
    }

    Ok(ThermalSystem {
        conductance,
        load,
        capacity,
        penalty,
        element_conductance,
    })
}

/// `K·T − Q`.
pub fn residual(system: &ThermalSystem, temperatures: &[f64]) -> Vec<f64> {
    let mut r = system.conductance.mul_vec(temperatures);
    for (ri, qi) in r.iter_mut().zip(&system.load) {
        *ri -= qi;
    }
    r
}

/// Heat flow into the system through each boundary condition [W],
/// evaluated with the exact (non-linearized) laws at `temperatures`.
///
/// A fixed-temperature node supplies whatever the rest of the node's
/// balance demands: conduction leaving through its elements plus the
/// outflow of any other condition on the same node.
pub fn boundary_heat_flows(
    problem: &ThermalProblem,
    system: &ThermalSystem,
    temperatures: &Array1<f64>,
) -> Vec<BoundaryHeatFlow> {
    let n = problem.node_count();
    let mut conduction_out = vec![0.0; n];
    for (element, g) in problem.mesh().elements.iter().zip(&system.element_conductance) {
        let [a, b] = element.nodes;
        let q = g * (temperatures[a] - temperatures[b]);
        conduction_out[a] += q;
        conduction_out[b] -= q;
    }

    let inflows: Vec<f64> = problem
        .boundaries()
        .iter()
        .map(|bc| inflow(bc, temperatures))
        .collect();

    // Other conditions' inflow per node, needed to close the balance at
    // Dirichlet nodes.
    let mut node_inflow = vec![0.0; n];
    for (bc, q) in problem.boundaries().iter().zip(&inflows) {
        if !matches!(bc, BoundaryCondition::FixedTemperature { .. }) {
            node_inflow[*bc.node()] += q;
        }
    }

    problem
        .boundaries()
        .iter()
        .zip(inflows)
        .enumerate()
        .map(|(condition, (bc, q))| {
            let node = *bc.node();
            let heat_flow_w = match bc {
                BoundaryCondition::FixedTemperature { .. } => {
                    conduction_out[node] - node_inflow[node]
                }
                _ => q,
            };
            BoundaryHeatFlow {
                condition,
                node,
                kind: bc.kind().to_string(),
                heat_flow_w,
            }
        })
        .collect()
}

/// Exact inflow for non-Dirichlet conditions; zero for fixed ones.
fn inflow(bc: &BoundaryCondition, temperatures: &Array1<f64>) -> f64 {
    match *bc {
        BoundaryCondition::Radiation {
            node,
            area,
            emissivity,
            ambient,
        } => STEFAN_BOLTZMANN * emissivity * area * (ambient.powi(4) - temperatures[node].powi(4)),
        BoundaryCondition::Convection {
            node,
            coefficient,
            ambient,
        } => coefficient * (ambient - temperatures[node]),
        BoundaryCondition::HeatSource { power, .. } => power,
        BoundaryCondition::FixedTemperature { .. } => 0.0,
    }
}
