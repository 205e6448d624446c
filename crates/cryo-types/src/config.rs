// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_AMBIENT_K, MAX_REFINEMENT_LEVEL, MIN_BIOT_SAVART_SEGMENTS};
use crate::error::{CryoError, CryoResult};
use crate::state::BoundaryCondition;

/// Fully resolved system description handed to the core by the project store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDescription {
    pub name: String,
    #[serde(default)]
    pub materials: Vec<MaterialSpec>,
    /// Thermal geometry; absent for pure magnet analyses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometrySpec>,
    #[serde(default)]
    pub boundary_conditions: Vec<BoundarySpec>,
    #[serde(default)]
    pub coils: Vec<MagnetCoil>,
    #[serde(default)]
    pub solver: SolverOptions,
}

/// One analysis to run against a [`SystemDescription`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisSpec {
    SteadyState,
    Transient(TransientOptions),
    FieldMap(FieldGridSpec),
    Margin(MarginOptions),
}

impl AnalysisSpec {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisSpec::SteadyState => "steady_state",
            AnalysisSpec::Transient(_) => "transient",
            AnalysisSpec::FieldMap(_) => "field_map",
            AnalysisSpec::Margin(_) => "margin",
        }
    }

    pub fn is_thermal(&self) -> bool {
        matches!(self, AnalysisSpec::SteadyState | AnalysisSpec::Transient(_))
    }
}

/// System plus the analysis to perform on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub system: SystemDescription,
    pub analysis: AnalysisSpec,
}

impl SystemDescription {
    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> CryoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> CryoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl SimulationRequest {
    pub fn from_file(path: impl AsRef<Path>) -> CryoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

// ── Materials ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    Metal,
    Insulator,
    Structural,
    Superconductor,
}

/// Raw property tables for one catalog material.
///
/// Tables are `[T, value]` pairs in K and SI units, strictly increasing in T.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub id: String,
    pub category: MaterialCategory,
    /// Density [kg/m³].
    pub density: f64,
    /// Thermal conductivity samples [K, W/(m·K)].
    pub conductivity: Vec<[f64; 2]>,
    /// Specific heat samples [K, J/(kg·K)].
    pub specific_heat: Vec<[f64; 2]>,
}

// ── Geometry ─────────────────────────────────────────────────────────

/// Either a component layout for the mesh builder or a ready mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySpec {
    Layout {
        components: Vec<ComponentSpec>,
        #[serde(default)]
        connections: Vec<ConnectionSpec>,
    },
    Mesh {
        nodes: Vec<[f64; 3]>,
        elements: Vec<ElementSpec>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    #[default]
    Rod,
    Strap,
    Support,
    Shield,
    ColdMass,
}

/// A one-dimensional conduction path in the assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub id: String,
    #[serde(default)]
    pub kind: ComponentKind,
    pub material: String,
    /// Start point [m].
    pub start: [f64; 3],
    /// Axis direction; normalized by the mesh builder.
    #[serde(default = "default_direction")]
    pub direction: [f64; 3],
    /// Path length [m].
    pub length: f64,
    /// Conduction cross-section [m²].
    pub area: f64,
    /// Segments before refinement.
    #[serde(default = "default_segments")]
    pub segments: usize,
}

fn default_direction() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}
fn default_segments() -> usize {
    4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndSide {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEnd {
    pub component: String,
    pub end: EndSide,
}

/// Thermal joint: the two ends become one shared node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub a: ComponentEnd,
    pub b: ComponentEnd,
}

/// Element of an explicitly provided mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub nodes: Vec<usize>,
    pub material: String,
    pub area: f64,
    pub length: f64,
}

/// How a boundary condition addresses its node before meshing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeTarget {
    Index(usize),
    End(ComponentEnd),
}

pub type BoundarySpec = BoundaryCondition<NodeTarget>;

// ── Solver options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// ‖ΔT‖∞ threshold [K].
    #[serde(default = "default_tolerance")]
    pub convergence_tolerance: f64,
    #[serde(default = "default_true")]
    pub adaptive_timestep: bool,
    #[serde(default)]
    pub mesh_refinement: u32,
    /// Newton under-relaxation α in (0, 1].
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,
    /// Ambient default used as the initial field [K].
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    /// Hard wall-time ceiling for a single solve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_time_s: Option<f64>,
    #[serde(default)]
    pub linear: LinearSolverConfig,
}

fn default_max_iterations() -> usize {
    100
}
fn default_tolerance() -> f64 {
    1e-6
}
fn default_true() -> bool {
    true
}
fn default_relaxation() -> f64 {
    1.0
}
fn default_initial_temperature() -> f64 {
    DEFAULT_AMBIENT_K
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            max_iterations: default_max_iterations(),
            convergence_tolerance: default_tolerance(),
            adaptive_timestep: true,
            mesh_refinement: 0,
            relaxation: default_relaxation(),
            initial_temperature: default_initial_temperature(),
            max_wall_time_s: None,
            linear: LinearSolverConfig::default(),
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> CryoResult<()> {
        if self.max_iterations < 1 {
            return Err(CryoError::Validation(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if !self.convergence_tolerance.is_finite() || self.convergence_tolerance <= 0.0 {
            return Err(CryoError::Validation(format!(
                "convergence_tolerance must be finite and > 0, got {}",
                self.convergence_tolerance
            )));
        }
        if !self.relaxation.is_finite() || self.relaxation <= 0.0 || self.relaxation > 1.0 {
            return Err(CryoError::Validation(format!(
                "relaxation must be in (0, 1], got {}",
                self.relaxation
            )));
        }
        if self.mesh_refinement > MAX_REFINEMENT_LEVEL {
            return Err(CryoError::Validation(format!(
                "mesh_refinement must be <= {MAX_REFINEMENT_LEVEL}, got {}",
                self.mesh_refinement
            )));
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature <= 0.0 {
            return Err(CryoError::Validation(format!(
                "initial_temperature must be finite and > 0, got {}",
                self.initial_temperature
            )));
        }
        validate_wall_time(self.max_wall_time_s)?;
        self.linear.validate()
    }
}

/// Settings for the inner sparse linear solve (PCG, GMRES fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    #[serde(default = "default_linear_max_iterations")]
    pub max_iterations: usize,
    /// Stop when ‖r‖ / ‖b‖ drops below this.
    #[serde(default = "default_rel_tolerance")]
    pub rel_tolerance: f64,
    /// Stop when ‖r‖ drops below this.
    #[serde(default = "default_abs_tolerance")]
    pub abs_tolerance: f64,
    /// Krylov dimension before GMRES restarts.
    #[serde(default = "default_gmres_restart")]
    pub gmres_restart: usize,
}

fn default_linear_max_iterations() -> usize {
    5_000
}
fn default_rel_tolerance() -> f64 {
    1e-12
}
fn default_abs_tolerance() -> f64 {
    1e-14
}
fn default_gmres_restart() -> usize {
    30
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        LinearSolverConfig {
            max_iterations: default_linear_max_iterations(),
            rel_tolerance: default_rel_tolerance(),
            abs_tolerance: default_abs_tolerance(),
            gmres_restart: default_gmres_restart(),
        }
    }
}

impl LinearSolverConfig {
    pub fn validate(&self) -> CryoResult<()> {
        if self.max_iterations < 1 || self.gmres_restart < 1 {
            return Err(CryoError::Validation(
                "linear solver max_iterations and gmres_restart must be >= 1".to_string(),
            ));
        }
        for (name, value) in [
            ("rel_tolerance", self.rel_tolerance),
            ("abs_tolerance", self.abs_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CryoError::Validation(format!(
                    "linear {name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// When a cooldown counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCriterion {
    /// Coldest free node at or below the target.
    #[default]
    AnyNodeBelow,
    /// Warmest free node at or below the target.
    AllNodesBelow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientOptions {
    /// Simulated time horizon [s].
    pub max_time: f64,
    #[serde(default = "default_initial_timestep")]
    pub initial_timestep: f64,
    #[serde(default = "default_min_timestep")]
    pub min_timestep: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timestep: Option<f64>,
    /// Target max |ΔT| per step for the adaptive controller [K].
    #[serde(default = "default_timestep_tolerance")]
    pub timestep_tolerance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f64>,
    #[serde(default)]
    pub stop_criterion: StopCriterion,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_initial_timestep() -> f64 {
    1.0
}
fn default_min_timestep() -> f64 {
    1e-6
}
fn default_timestep_tolerance() -> f64 {
    1.0
}
fn default_max_steps() -> usize {
    100_000
}

impl TransientOptions {
    pub fn new(max_time: f64) -> Self {
        TransientOptions {
            max_time,
            initial_timestep: default_initial_timestep(),
            min_timestep: default_min_timestep(),
            max_timestep: None,
            timestep_tolerance: default_timestep_tolerance(),
            target_temperature: None,
            stop_criterion: StopCriterion::default(),
            max_steps: default_max_steps(),
        }
    }

    pub fn validate(&self) -> CryoResult<()> {
        let positive = [
            ("max_time", self.max_time),
            ("initial_timestep", self.initial_timestep),
            ("min_timestep", self.min_timestep),
            ("timestep_tolerance", self.timestep_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CryoError::Validation(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        if let Some(max_dt) = self.max_timestep {
            if !max_dt.is_finite() || max_dt < self.min_timestep {
                return Err(CryoError::Validation(format!(
                    "max_timestep must be finite and >= min_timestep, got {max_dt}"
                )));
            }
        }
        if self.initial_timestep < self.min_timestep {
            return Err(CryoError::Validation(format!(
                "initial_timestep {} is below min_timestep {}",
                self.initial_timestep, self.min_timestep
            )));
        }
        if let Some(target) = self.target_temperature {
            if !target.is_finite() || target <= 0.0 {
                return Err(CryoError::Validation(format!(
                    "target_temperature must be finite and > 0, got {target}"
                )));
            }
        }
        if self.max_steps < 1 {
            return Err(CryoError::Validation("max_steps must be >= 1".to_string()));
        }
        Ok(())
    }
}

// ── Magnets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnetCoil {
    pub id: String,
    pub geometry: CoilGeometry,
    /// Transport current per turn [A].
    pub current: f64,
    pub turns: u32,
    pub conductor: Conductor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit: Option<QuenchCircuit>,
}

/// Coil shape. Solenoid and Helmholtz axes are along z through `center`;
/// racetracks lie in the xy-plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CoilGeometry {
    Solenoid {
        radius: f64,
        length: f64,
        #[serde(default)]
        center: [f64; 3],
    },
    Helmholtz {
        radius: f64,
        /// Loop spacing; defaults to the radius (ideal Helmholtz).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separation: Option<f64>,
        #[serde(default)]
        center: [f64; 3],
    },
    Racetrack {
        straight_length: f64,
        bend_radius: f64,
        #[serde(default)]
        center: [f64; 3],
    },
    /// Two flat racetracks in the planes y = ±`half_gap`, long axis along z,
    /// circulating in the same sense so the aperture field points along y.
    Dipole {
        half_gap: f64,
        width: f64,
        length: f64,
        #[serde(default)]
        center: [f64; 3],
    },
    Path {
        points: Vec<[f64; 3]>,
        #[serde(default = "default_true")]
        closed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuperconductorKind {
    NbTi,
    Nb3Sn,
    Rebco,
    MgB2,
    Other,
}

/// Parameters of `Jc(B,T) = Jc0·(1−T/Tc)·(Bc2(T)/(B+Bc2(T)))ⁿ`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JcParameters {
    /// [A/m²]
    pub jc0: f64,
    /// [K]
    pub tc: f64,
    /// Upper critical field at 0 K [T].
    pub bc2_0: f64,
    pub exponent: f64,
}

/// Normal-state properties of the stabilized conductor, used by the quench model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizerProperties {
    /// [W/(m·K)]
    pub conductivity: f64,
    /// [Ω·m]
    pub normal_resistivity: f64,
    /// [kg/m³]
    pub density: f64,
    /// [J/(kg·K)]
    pub specific_heat: f64,
    /// Catalog material whose Cp(T) table replaces `specific_heat`
    /// for hot-spot enthalpy integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conductor {
    /// Conductor cross-section [m²].
    pub cross_section: f64,
    pub superconductor: SuperconductorKind,
    pub jc: JcParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilizer: Option<StabilizerProperties>,
}

/// Protection circuit used to derive the discharge time constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuenchCircuit {
    /// Coil inductance [H]; estimated from geometry when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inductance: Option<f64>,
    /// Dump voltage [V].
    pub dump_voltage: f64,
}

/// Regular 3D sampling box for field maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGridSpec {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub counts: [usize; 3],
    #[serde(default = "default_min_segments")]
    pub min_segments: usize,
    /// Hard wall-time ceiling, checked after every x-slab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_time_s: Option<f64>,
}

fn default_min_segments() -> usize {
    MIN_BIOT_SAVART_SEGMENTS
}

impl FieldGridSpec {
    pub fn point_count(&self) -> usize {
        self.counts.iter().fold(1, |n, &c| n.saturating_mul(c))
    }

    /// Tighten the wall-time ceiling; never loosens an existing one.
    pub fn limit_wall_time(&mut self, seconds: f64) {
        self.max_wall_time_s = Some(tighter(self.max_wall_time_s, seconds));
    }

    pub fn validate(&self) -> CryoResult<()> {
        for axis in 0..3 {
            if !self.min[axis].is_finite() || !self.max[axis].is_finite() {
                return Err(CryoError::Validation(
                    "field grid bounds must be finite".to_string(),
                ));
            }
            if self.counts[axis] == 0 {
                return Err(CryoError::Validation(format!(
                    "field grid count on axis {axis} must be >= 1"
                )));
            }
            if self.counts[axis] > 1 && self.max[axis] <= self.min[axis] {
                return Err(CryoError::Validation(format!(
                    "field grid axis {axis}: max must exceed min when count > 1"
                )));
            }
        }
        if self.min_segments < MIN_BIOT_SAVART_SEGMENTS {
            return Err(CryoError::Validation(format!(
                "min_segments must be >= {MIN_BIOT_SAVART_SEGMENTS}, got {}",
                self.min_segments
            )));
        }
        validate_wall_time(self.max_wall_time_s)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginOptions {
    /// Conductor operating temperature [K].
    #[serde(default = "default_operating_temperature")]
    pub operating_temperature: f64,
    /// Samples per axis for grid peak-field search.
    #[serde(default = "default_grid_points")]
    pub grid_points_per_axis: usize,
    #[serde(default = "default_min_segments")]
    pub min_segments: usize,
    /// Distance from the filament path excluded from peak search [m].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_radius: Option<f64>,
    /// Hard wall-time ceiling, checked after every coil.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_time_s: Option<f64>,
}

fn default_operating_temperature() -> f64 {
    4.2
}
fn default_grid_points() -> usize {
    15
}

impl Default for MarginOptions {
    fn default() -> Self {
        MarginOptions {
            operating_temperature: default_operating_temperature(),
            grid_points_per_axis: default_grid_points(),
            min_segments: default_min_segments(),
            exclusion_radius: None,
            max_wall_time_s: None,
        }
    }
}

impl MarginOptions {
    pub fn validate(&self) -> CryoResult<()> {
        if !self.operating_temperature.is_finite() || self.operating_temperature <= 0.0 {
            return Err(CryoError::Validation(format!(
                "operating_temperature must be finite and > 0, got {}",
                self.operating_temperature
            )));
        }
        if self.grid_points_per_axis < 2 {
            return Err(CryoError::Validation(format!(
                "grid_points_per_axis must be >= 2, got {}",
                self.grid_points_per_axis
            )));
        }
        if self.min_segments < MIN_BIOT_SAVART_SEGMENTS {
            return Err(CryoError::Validation(format!(
                "min_segments must be >= {MIN_BIOT_SAVART_SEGMENTS}, got {}",
                self.min_segments
            )));
        }
        if let Some(r) = self.exclusion_radius {
            if !r.is_finite() || r < 0.0 {
                return Err(CryoError::Validation(format!(
                    "exclusion_radius must be finite and >= 0, got {r}"
                )));
            }
        }
        validate_wall_time(self.max_wall_time_s)
    }

    /// Tighten the wall-time ceiling; never loosens an existing one.
    pub fn limit_wall_time(&mut self, seconds: f64) {
        self.max_wall_time_s = Some(tighter(self.max_wall_time_s, seconds));
    }
}

fn tighter(existing: Option<f64>, seconds: f64) -> f64 {
    existing.map_or(seconds, |limit| limit.min(seconds))
}

/// A wall-time ceiling, when set, must be finite and positive.
pub fn validate_wall_time(limit: Option<f64>) -> CryoResult<()> {
    match limit {
        Some(limit) if !limit.is_finite() || limit <= 0.0 => Err(CryoError::Validation(format!(
            "max_wall_time_s must be finite and > 0, got {limit}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/cryo-types/, configs live two levels up.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> PathBuf {
        project_root().join("configs").join(relative)
    }

    #[test]
    fn test_load_cooldown_config() {
        let system = SystemDescription::from_file(config_path("support_rod_cooldown.json")).unwrap();
        assert_eq!(system.name, "Support-Rod-Cooldown");
        assert_eq!(system.materials.len(), 2);
        match system.geometry {
            Some(GeometrySpec::Layout { ref components, ref connections }) => {
                assert_eq!(components.len(), 2);
                assert_eq!(connections.len(), 1);
            }
            ref other => panic!("expected layout geometry, got {other:?}"),
        }
        assert_eq!(system.boundary_conditions.len(), 2);
        system.solver.validate().unwrap();
    }

    #[test]
    fn test_load_solenoid_request() {
        let request = SimulationRequest::from_file(config_path("solenoid_margin.json")).unwrap();
        assert_eq!(request.analysis.name(), "margin");
        let coil = &request.system.coils[0];
        assert_eq!(coil.turns, 1000);
        assert!(matches!(coil.geometry, CoilGeometry::Solenoid { .. }));
        assert!(coil.conductor.stabilizer.is_some());
    }

    #[test]
    fn test_boundary_targets_parse_index_and_end() {
        let json = r#"[
            {"type": "fixed_temperature", "node": 3, "value": 4.2},
            {"type": "heat_source", "node": {"component": "rod", "end": "end"}, "power": 0.5}
        ]"#;
        let bcs: Vec<BoundarySpec> = serde_json::from_str(json).unwrap();
        assert_eq!(bcs[0].node(), &NodeTarget::Index(3));
        assert_eq!(
            bcs[1].node(),
            &NodeTarget::End(ComponentEnd {
                component: "rod".to_string(),
                end: EndSide::End
            })
        );
    }

    #[test]
    fn test_solver_options_defaults_and_validation() {
        let opts: SolverOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.max_iterations, 100);
        assert!((opts.relaxation - 1.0).abs() < 1e-15);
        opts.validate().unwrap();

        let bad = SolverOptions {
            convergence_tolerance: 0.0,
            ..SolverOptions::default()
        };
        assert!(bad.validate().is_err());

        let bad = SolverOptions {
            max_iterations: 0,
            ..SolverOptions::default()
        };
        assert!(bad.validate().is_err());

        let bad = SolverOptions {
            relaxation: 1.5,
            ..SolverOptions::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_transient_options_validation() {
        let mut opts = TransientOptions::new(3600.0);
        opts.validate().unwrap();
        opts.initial_timestep = 1e-9;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_analysis_tagging_roundtrip() {
        let spec = AnalysisSpec::Transient(TransientOptions::new(10.0));
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"analysis\":\"transient\""), "{json}");
        let back: AnalysisSpec = serde_json::from_str(&json).unwrap();
        assert!(back.is_thermal());
    }

    #[test]
    fn test_field_grid_wall_time_and_size() {
        let mut grid = FieldGridSpec {
            min: [0.0; 3],
            max: [1.0; 3],
            counts: [500, 500, 500],
            min_segments: MIN_BIOT_SAVART_SEGMENTS,
            max_wall_time_s: Some(30.0),
        };
        assert_eq!(grid.point_count(), 125_000_000);
        grid.limit_wall_time(5.0);
        grid.limit_wall_time(60.0);
        assert_eq!(grid.max_wall_time_s, Some(5.0));
        grid.validate().unwrap();

        grid.counts = [usize::MAX, 2, 2];
        assert_eq!(grid.point_count(), usize::MAX);
        grid.max_wall_time_s = Some(0.0);
        assert!(grid.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_margin_wall_time_only_tightens() {
        let mut options = MarginOptions::default();
        options.limit_wall_time(5.0);
        assert_eq!(options.max_wall_time_s, Some(5.0));
        options.limit_wall_time(8.0);
        assert_eq!(options.max_wall_time_s, Some(5.0));
        assert!(validate_wall_time(Some(f64::NAN)).is_err());
    }
}
