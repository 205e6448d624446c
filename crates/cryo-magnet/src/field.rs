// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Magnetic Field Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coil field evaluation.
//!
//! Solenoid and Helmholtz coils use the closed-form axial field on their
//! axis. Every other point, and every other geometry, is evaluated by
//! midpoint Biot-Savart over the discretized winding:
//!
//! ```text
//! dB = μ₀/(4π) · I · dl × R / |R|³
//! ```

use cryo_math::elliptic::ellipke;
use cryo_types::config::{CoilGeometry, FieldGridSpec, MagnetCoil};
use cryo_types::constants::MU0_SI;
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::{Checkpoint, ProgressUpdate, SolveMonitor};
use cryo_types::state::{FieldMap, FieldPeak, SolveMetadata};
use log::{debug, info, warn};
use ndarray::{Array1, Array3, Array4};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::time::Instant;

use crate::coil::{
    add, characteristic_radius, cross, discretize, norm, scale, sub, turn_length, CurrentSegment,
};

/// Segments closer than this to the field point are skipped [m].
pub const SEGMENT_SKIP_RADIUS: f64 = 1e-9;

/// Radial offset, relative to the coil radius, still treated as on-axis.
const ON_AXIS_TOLERANCE: f64 = 1e-12;

/// Field of a set of current elements at `point` [T].
pub fn biot_savart(segments: &[CurrentSegment], point: [f64; 3]) -> [f64; 3] {
    let k = MU0_SI / (4.0 * PI);
    segments.iter().fold([0.0; 3], |acc, seg| {
        let r = sub(point, seg.midpoint);
        let dist = norm(r);
        if dist < SEGMENT_SKIP_RADIUS {
            return acc;
        }
        let factor = k * seg.current / (dist * dist * dist);
        add(acc, scale(cross(seg.dl, r), factor))
    })
}

/// Axial field of a finite solenoid at axial offset `z` from its center [T].
pub fn solenoid_axial_field(radius: f64, length: f64, ampere_turns: f64, z: f64) -> f64 {
    let n_i = ampere_turns / length;
    let upper = z + 0.5 * length;
    let lower = z - 0.5 * length;
    0.5 * MU0_SI
        * n_i
        * (upper / (radius * radius + upper * upper).sqrt()
            - lower / (radius * radius + lower * lower).sqrt())
}

/// Axial field of a circular filament at axial offset `z` from its plane [T].
pub fn loop_axial_field(radius: f64, ampere_turns: f64, z: f64) -> f64 {
    let r2 = radius * radius;
    0.5 * MU0_SI * ampere_turns * r2 / (r2 + z * z).powf(1.5)
}

/// Off-axis field `(B_ρ, B_z)` of a circular filament from complete
/// elliptic integrals. `rho` is the radial and `z` the axial offset.
///
/// Returns zeros on the filament itself.
pub fn loop_field_exact(radius: f64, ampere_turns: f64, rho: f64, z: f64) -> (f64, f64) {
    let rho = rho.abs();
    let alpha2 = (radius - rho).powi(2) + z * z;
    let beta2 = (radius + rho).powi(2) + z * z;
    if alpha2 < SEGMENT_SKIP_RADIUS * SEGMENT_SKIP_RADIUS {
        return (0.0, 0.0);
    }
    if rho < ON_AXIS_TOLERANCE * radius {
        return (0.0, loop_axial_field(radius, ampere_turns, z));
    }
    let beta = beta2.sqrt();
    let m = 4.0 * radius * rho / beta2;
    let (k, e) = ellipke(m);
    let c = MU0_SI * ampere_turns / (2.0 * PI);
    let a2 = radius * radius;
    let bz = c / beta * (e * (a2 - rho * rho - z * z) / alpha2 + k);
    let brho = c * z / (rho * beta) * (e * (a2 + rho * rho + z * z) / alpha2 - k);
    (brho, bz)
}

/// A validated coil together with its discretized winding.
#[derive(Debug, Clone)]
pub struct CoilSource<'a> {
    coil: &'a MagnetCoil,
    segments: Vec<CurrentSegment>,
}

impl<'a> CoilSource<'a> {
    pub fn new(coil: &'a MagnetCoil, min_segments: usize) -> CryoResult<Self> {
        let segments = discretize(coil, min_segments)?;
        debug!("Coil '{}': {} current segments", coil.id, segments.len());
        Ok(Self { coil, segments })
    }

    pub fn coil(&self) -> &MagnetCoil {
        self.coil
    }

    pub fn segments(&self) -> &[CurrentSegment] {
        &self.segments
    }

    /// Closed-form `B_z` if `point` lies on a solenoid or Helmholtz axis.
    pub fn on_axis(&self, point: [f64; 3]) -> Option<f64> {
        let ampere_turns = self.coil.current * self.coil.turns as f64;
        let radial = |center: &[f64; 3]| (point[0] - center[0]).hypot(point[1] - center[1]);
        match &self.coil.geometry {
            CoilGeometry::Solenoid {
                radius,
                length,
                center,
            } if radial(center) <= ON_AXIS_TOLERANCE * radius => Some(solenoid_axial_field(
                *radius,
                *length,
                ampere_turns,
                point[2] - center[2],
            )),
            CoilGeometry::Helmholtz {
                radius,
                separation,
                center,
            } if radial(center) <= ON_AXIS_TOLERANCE * radius => {
                let half = 0.5 * separation.unwrap_or(*radius);
                let z = point[2] - center[2];
                Some(
                    loop_axial_field(*radius, ampere_turns, z + half)
                        + loop_axial_field(*radius, ampere_turns, z - half),
                )
            }
            _ => None,
        }
    }

    /// Field vector at `point` [T].
    pub fn field_at(&self, point: [f64; 3]) -> [f64; 3] {
        match self.on_axis(point) {
            Some(bz) => [0.0, 0.0, bz],
            None => biot_savart(&self.segments, point),
        }
    }

    /// Distance from `point` to the nearest segment midpoint [m].
    pub fn winding_distance(&self, point: [f64; 3]) -> f64 {
        self.segments
            .iter()
            .map(|s| norm(sub(point, s.midpoint)))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Every coil of a system, discretized once. Fields superpose.
#[derive(Debug, Clone)]
pub struct CoilAssembly<'a> {
    sources: Vec<CoilSource<'a>>,
}

impl<'a> CoilAssembly<'a> {
    pub fn new(coils: &'a [MagnetCoil], min_segments: usize) -> CryoResult<Self> {
        let sources = coils
            .iter()
            .map(|c| CoilSource::new(c, min_segments))
            .collect::<CryoResult<Vec<_>>>()?;
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[CoilSource<'a>] {
        &self.sources
    }

    pub fn segment_count(&self) -> usize {
        self.sources.iter().map(|s| s.segments().len()).sum()
    }

    /// Total field of all coils at `point` [T].
    pub fn field_at(&self, point: [f64; 3]) -> [f64; 3] {
        self.sources
            .iter()
            .fold([0.0; 3], |acc, s| add(acc, s.field_at(point)))
    }

    /// Distance from `point` to the nearest winding of any coil [m].
    pub fn winding_distance(&self, point: [f64; 3]) -> f64 {
        self.sources
            .iter()
            .map(|s| s.winding_distance(point))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Field of one coil at `point`, discretized with `min_segments`.
pub fn field_at(coil: &MagnetCoil, point: [f64; 3], min_segments: usize) -> CryoResult<[f64; 3]> {
    Ok(CoilSource::new(coil, min_segments)?.field_at(point))
}

fn axis(min: f64, max: f64, count: usize) -> Array1<f64> {
    if count == 1 {
        Array1::from_elem(1, min)
    } else {
        Array1::linspace(min, max, count)
    }
}

/// Superposed field of `coils` on a regular grid.
///
/// Each x-slab is evaluated in parallel; the monitor is consulted once
/// per slab and may cancel between slabs. Exceeding `max_wall_time_s`
/// stops the map with [`CryoError::Convergence`] at the same points.
pub fn field_map(
    coils: &[MagnetCoil],
    grid: &FieldGridSpec,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<FieldMap> {
    grid.validate()?;
    if coils.is_empty() {
        return Err(CryoError::Validation(
            "field map needs at least one coil".to_string(),
        ));
    }
    let start = Instant::now();
    let assembly = CoilAssembly::new(coils, grid.min_segments)?;

    let [nx, ny, nz] = grid.counts;
    let x = axis(grid.min[0], grid.max[0], nx);
    let y = axis(grid.min[1], grid.max[1], ny);
    let z = axis(grid.min[2], grid.max[2], nz);
    info!(
        "Field map: {} coils, {} segments, {nx}x{ny}x{nz} grid",
        coils.len(),
        assembly.segment_count()
    );

    let mut vectors = Array4::zeros((nx, ny, nz, 3));
    let mut magnitude = Array3::zeros((nx, ny, nz));
    let mut peak = FieldPeak {
        position: [x[0], y[0], z[0]],
        magnitude: 0.0,
    };

    for i in 0..nx {
        let slab: Vec<[f64; 3]> = (0..ny * nz)
            .into_par_iter()
            .map(|jk| {
                assembly.field_at([x[i], y[jk / nz], z[jk % nz]])
            })
            .collect();

        for (jk, b) in slab.iter().enumerate() {
            let (j, k) = (jk / nz, jk % nz);
            let m = norm(*b);
            for c in 0..3 {
                vectors[[i, j, k, c]] = b[c];
            }
            magnitude[[i, j, k]] = m;
            if m > peak.magnitude {
                peak = FieldPeak {
                    position: [x[i], y[j], z[k]],
                    magnitude: m,
                };
            }
        }

        let update = ProgressUpdate {
            fraction_complete: (i + 1) as f64 / nx as f64,
            current_step: i + 1,
            residual_or_metric: peak.magnitude,
        };
        if monitor.checkpoint(update) == Checkpoint::Cancel {
            info!("Field map cancelled after slab {}", i + 1);
            return Err(CryoError::Cancelled { step: i + 1 });
        }
        if let Some(limit) = grid.max_wall_time_s {
            if i + 1 < nx && start.elapsed().as_secs_f64() > limit {
                warn!("Field map hit the {limit} s wall-time ceiling after slab {}", i + 1);
                // Residual: fraction of slabs left unevaluated.
                return Err(CryoError::Convergence {
                    iterations: i + 1,
                    residual: (nx - i - 1) as f64 / nx as f64,
                });
            }
        }
    }

    let wall_time_s = start.elapsed().as_secs_f64();
    info!(
        "Field map done: peak {:.4} T at {:?} ({wall_time_s:.3} s)",
        peak.magnitude, peak.position
    );
    Ok(FieldMap {
        x,
        y,
        z,
        vectors,
        magnitude,
        peak,
        metadata: SolveMetadata {
            iterations: nx,
            wall_time_s,
            converged: true,
            final_residual: 0.0,
        },
    })
}

// ── Inductance and energy ────────────────────────────────────────────

/// Self inductance of one circular turn of round wire radius `wire` [H].
fn loop_self_inductance(radius: f64, wire: f64) -> f64 {
    MU0_SI * radius * ((8.0 * radius / wire).ln() - 2.0).max(0.0)
}

/// Mutual inductance of two coaxial single turns spaced `d` apart [H].
fn coaxial_mutual_inductance(r1: f64, r2: f64, d: f64) -> f64 {
    let m = 4.0 * r1 * r2 / ((r1 + r2).powi(2) + d * d);
    let k = m.sqrt();
    let (big_k, big_e) = ellipke(m);
    MU0_SI * (r1 * r2).sqrt() * ((2.0 / k - k) * big_k - 2.0 / k * big_e)
}

/// Geometric inductance estimate [H].
///
/// Wheeler's long-coil formula for solenoids, loop self plus mutual
/// inductance for Helmholtz pairs and dipoles, and an equal-perimeter
/// circular turn for racetracks and free paths.
pub fn estimate_inductance(coil: &MagnetCoil) -> CryoResult<f64> {
    crate::coil::validate_coil(coil)?;
    let n = coil.turns as f64;
    let wire = (coil.conductor.cross_section / PI).sqrt();
    let equivalent_radius = turn_length(&coil.geometry) / (2.0 * PI);

    let inductance = match &coil.geometry {
        CoilGeometry::Solenoid { radius, length, .. } => {
            MU0_SI * PI * radius * radius * n * n / (length + 0.9 * radius)
        }
        CoilGeometry::Helmholtz {
            radius, separation, ..
        } => {
            let d = separation.unwrap_or(*radius);
            n * n
                * (2.0 * loop_self_inductance(*radius, wire)
                    + 2.0 * coaxial_mutual_inductance(*radius, *radius, d))
        }
        CoilGeometry::Dipole { half_gap, .. } => {
            let half_turns = 0.5 * n;
            half_turns
                * half_turns
                * (2.0 * loop_self_inductance(equivalent_radius, wire)
                    + 2.0
                        * coaxial_mutual_inductance(
                            equivalent_radius,
                            equivalent_radius,
                            2.0 * half_gap,
                        ))
        }
        CoilGeometry::Racetrack { .. } | CoilGeometry::Path { .. } => {
            n * n * loop_self_inductance(equivalent_radius, wire)
        }
    };
    Ok(inductance)
}

/// Energy in the coil's field at its operating current, `L·I²/2` [J].
pub fn stored_energy(coil: &MagnetCoil, inductance: f64) -> f64 {
    let current = coil.current;
    inductance.max(0.0) * current * current / 2.0
}

/// Radial build of the winding pack [m].
///
/// A solenoid spreads its `N·A` copper over its length; every other
/// geometry is treated as a square pack per loop.
pub fn winding_build(coil: &MagnetCoil) -> f64 {
    let pack = coil.turns as f64 * coil.conductor.cross_section;
    match &coil.geometry {
        CoilGeometry::Solenoid { length, .. } => pack / length,
        // Each racetrack carries half the turns.
        CoilGeometry::Dipole { .. } => (0.5 * pack).sqrt(),
        _ => pack.sqrt(),
    }
}

/// Thin-shell hoop stress in the winding [Pa].
///
/// Magnetic pressure `B²/2μ₀` at `peak_field` acting on a shell of
/// the coil's characteristic radius and [`winding_build`] thickness.
/// For a long solenoid this reduces to `J·B·R/2`.
pub fn hoop_stress(coil: &MagnetCoil, peak_field: f64) -> f64 {
    let pressure = peak_field * peak_field / (2.0 * MU0_SI);
    pressure * characteristic_radius(&coil.geometry) / winding_build(coil)
}
