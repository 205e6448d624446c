// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::{Array1, Array2, Array3, Array4};
use serde::{Deserialize, Serialize};

/// Mesh node with its 3D position [m].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub position: [f64; 3],
}

/// Two-node conduction bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub nodes: [usize; 2],
    pub material: String,
    /// Cross-section [m²].
    pub area: f64,
    /// Node-to-node length [m].
    pub length: f64,
}

impl Element {
    pub fn volume(&self) -> f64 {
        self.area * self.length
    }
}

/// Immutable node/element mesh for one solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
}

impl Mesh {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

/// Current and previous temperature iterate, indexed by node.
#[derive(Debug, Clone)]
pub struct ThermalState {
    pub temperatures: Array1<f64>,
    pub previous: Array1<f64>,
}

impl ThermalState {
    pub fn uniform(n_nodes: usize, temperature: f64) -> Self {
        Self::from_temperatures(Array1::from_elem(n_nodes, temperature))
    }

    pub fn from_temperatures(temperatures: Array1<f64>) -> Self {
        ThermalState {
            previous: temperatures.clone(),
            temperatures,
        }
    }

    pub fn node_count(&self) -> usize {
        self.temperatures.len()
    }

    /// Replace the current iterate, keeping the old one as `previous`.
    pub fn advance(&mut self, next: Array1<f64>) {
        self.previous = std::mem::replace(&mut self.temperatures, next);
    }

    /// ‖T − T_prev‖∞.
    pub fn max_change(&self) -> f64 {
        self.temperatures
            .iter()
            .zip(self.previous.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Boundary condition or heat source attached to a single node.
///
/// `N` is the node address: a raw index once resolved, or a
/// `NodeTarget` while still part of a system description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryCondition<N = usize> {
    FixedTemperature {
        node: N,
        value: f64,
    },
    /// Gray-body exchange with an enclosure at `ambient` [K].
    Radiation {
        node: N,
        area: f64,
        emissivity: f64,
        ambient: f64,
    },
    /// Film conductance `coefficient` [W/K] to a bath at `ambient` [K].
    Convection {
        node: N,
        coefficient: f64,
        ambient: f64,
    },
    /// Heat deposited into the node [W].
    HeatSource {
        node: N,
        power: f64,
    },
}

impl<N> BoundaryCondition<N> {
    pub fn node(&self) -> &N {
        match self {
            BoundaryCondition::FixedTemperature { node, .. }
            | BoundaryCondition::Radiation { node, .. }
            | BoundaryCondition::Convection { node, .. }
            | BoundaryCondition::HeatSource { node, .. } => node,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BoundaryCondition::FixedTemperature { .. } => "fixed_temperature",
            BoundaryCondition::Radiation { .. } => "radiation",
            BoundaryCondition::Convection { .. } => "convection",
            BoundaryCondition::HeatSource { .. } => "heat_source",
        }
    }

    /// True for conditions that tie a node cluster to an absolute temperature.
    pub fn anchors_temperature(&self) -> bool {
        !matches!(self, BoundaryCondition::HeatSource { .. })
    }

    /// Re-address the condition, keeping its physical parameters.
    pub fn try_map_node<M, E>(
        &self,
        f: impl FnOnce(&N) -> Result<M, E>,
    ) -> Result<BoundaryCondition<M>, E> {
        Ok(match self {
            BoundaryCondition::FixedTemperature { node, value } => {
                BoundaryCondition::FixedTemperature {
                    node: f(node)?,
                    value: *value,
                }
            }
            BoundaryCondition::Radiation {
                node,
                area,
                emissivity,
                ambient,
            } => BoundaryCondition::Radiation {
                node: f(node)?,
                area: *area,
                emissivity: *emissivity,
                ambient: *ambient,
            },
            BoundaryCondition::Convection {
                node,
                coefficient,
                ambient,
            } => BoundaryCondition::Convection {
                node: f(node)?,
                coefficient: *coefficient,
                ambient: *ambient,
            },
            BoundaryCondition::HeatSource { node, power } => BoundaryCondition::HeatSource {
                node: f(node)?,
                power: *power,
            },
        })
    }
}

/// Convergence bookkeeping attached to every result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveMetadata {
    pub iterations: usize,
    pub wall_time_s: f64,
    pub converged: bool,
    pub final_residual: f64,
}

/// Heat flow into the system through one boundary condition [W].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryHeatFlow {
    /// Position of the condition in the resolved boundary list.
    pub condition: usize,
    pub node: usize,
    pub kind: String,
    pub heat_flow_w: f64,
}

/// Converged steady-state temperature field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureField {
    pub temperatures: Array1<f64>,
    pub heat_flows: Vec<BoundaryHeatFlow>,
    pub metadata: SolveMetadata,
}

impl TemperatureField {
    pub fn min_temperature(&self) -> f64 {
        self.temperatures.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_temperature(&self) -> f64 {
        self.temperatures
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Σ heat flow over all boundary conditions; ≈0 at steady state.
    pub fn net_heat_flow(&self) -> f64 {
        self.heat_flows.iter().map(|h| h.heat_flow_w).sum()
    }
}

/// Time history of a transient solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientResult {
    /// Time of each snapshot [s], starting at 0.
    pub times: Array1<f64>,
    /// Temperatures [n_times, n_nodes].
    pub snapshots: Array2<f64>,
    /// Stop condition met before `max_time`.
    pub reached_target: bool,
    pub rejected_steps: usize,
    pub metadata: SolveMetadata,
}

impl TransientResult {
    pub fn final_temperatures(&self) -> Option<Array1<f64>> {
        let n = self.snapshots.nrows();
        (n > 0).then(|| self.snapshots.row(n - 1).to_owned())
    }

    pub fn final_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Location and magnitude of the largest sampled |B|.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPeak {
    pub position: [f64; 3],
    pub magnitude: f64,
}

/// Field sampled on a regular grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMap {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: Array1<f64>,
    /// B vectors [nx, ny, nz, 3] in T.
    pub vectors: Array4<f64>,
    /// |B| [nx, ny, nz] in T.
    pub magnitude: Array3<f64>,
    pub peak: FieldPeak,
    pub metadata: SolveMetadata,
}

/// Normal-zone propagation and adiabatic hot-spot estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuenchReport {
    /// [m/s]
    pub propagation_velocity: f64,
    /// Discharge time constant L·I/V_dump [s].
    pub time_constant: f64,
    /// Constant-property adiabatic hot spot [K].
    pub hot_spot_temperature: f64,
    /// Hot spot from ρ∫Cp(T)dT when a Cp table was available [K].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot_spot_temperature_enthalpy: Option<f64>,
}

/// Operating point of one coil relative to its critical surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginReport {
    pub coil_id: String,
    pub peak_field: FieldPeak,
    pub operating_temperature: f64,
    /// I / A_conductor [A/m²].
    pub operating_current_density: f64,
    /// Jc at (B_peak, T_op) [A/m²].
    pub critical_current_density: f64,
    /// J_op / Jc.
    pub margin: f64,
    pub exceeds_critical: bool,
    /// Temperature at which Jc falls to J_op at B_peak [K].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sharing_temperature: Option<f64>,
    /// [H]
    pub inductance: f64,
    /// [J]
    pub stored_energy: f64,
    /// J·B·R estimate [Pa].
    pub hoop_stress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quench: Option<QuenchReport>,
}

/// Output of one analysis, tagged by analysis type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "analysis", content = "result", rename_all = "snake_case")]
pub enum SimulationResult {
    SteadyState(TemperatureField),
    Transient(TransientResult),
    FieldMap(FieldMap),
    Margin(Vec<MarginReport>),
}

impl SimulationResult {
    pub fn analysis(&self) -> &'static str {
        match self {
            SimulationResult::SteadyState(_) => "steady_state",
            SimulationResult::Transient(_) => "transient",
            SimulationResult::FieldMap(_) => "field_map",
            SimulationResult::Margin(_) => "margin",
        }
    }

    pub fn metadata(&self) -> Option<&SolveMetadata> {
        match self {
            SimulationResult::SteadyState(field) => Some(&field.metadata),
            SimulationResult::Transient(result) => Some(&result.metadata),
            SimulationResult::FieldMap(map) => Some(&map.metadata),
            SimulationResult::Margin(_) => None,
        }
    }
}
