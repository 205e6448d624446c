// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Coil Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coil validation and discretization into straight current elements.
//!
//! Every geometry variant is reduced to a list of [`CurrentSegment`]s
//! with at least `min_segments` entries. Each segment carries the
//! ampere-turns of the filament it belongs to, so summing Biot-Savart
//! contributions over the list gives the field of the full winding.

use cryo_types::config::{CoilGeometry, MagnetCoil};
use cryo_types::error::{CryoError, CryoResult};
use std::f64::consts::PI;

/// Solenoid windings are lumped into at most this many coaxial loops.
pub const MAX_SOLENOID_LOOPS: usize = 200;

/// Floor on segments per circular filament.
pub const MIN_LOOP_SEGMENTS: usize = 64;

/// Floor on segments per racetrack bend.
const MIN_ARC_SEGMENTS: usize = 8;

/// Straight current element: `I_eff · dl` located at `midpoint`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentSegment {
    pub midpoint: [f64; 3],
    pub dl: [f64; 3],
    /// Ampere-turns carried by the filament [A].
    pub current: f64,
}

// ── Small vector helpers ─────────────────────────────────────────────

#[inline]
pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: [f64; 3]) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

const X_HAT: [f64; 3] = [1.0, 0.0, 0.0];
const Y_HAT: [f64; 3] = [0.0, 1.0, 0.0];
const Z_HAT: [f64; 3] = [0.0, 0.0, 1.0];

// ── Validation ───────────────────────────────────────────────────────

fn positive(coil: &str, name: &str, value: f64) -> CryoResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CryoError::Validation(format!(
            "coil '{coil}': {name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn non_negative(coil: &str, name: &str, value: f64) -> CryoResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CryoError::Validation(format!(
            "coil '{coil}': {name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}

fn finite_point(coil: &str, name: &str, p: &[f64; 3]) -> CryoResult<()> {
    if p.iter().any(|v| !v.is_finite()) {
        return Err(CryoError::Validation(format!(
            "coil '{coil}': {name} must be finite"
        )));
    }
    Ok(())
}

/// Geometry, conductor, stabilizer and circuit parameter checks.
pub fn validate_coil(coil: &MagnetCoil) -> CryoResult<()> {
    let id = coil.id.as_str();
    if id.trim().is_empty() {
        return Err(CryoError::Validation("coil id must not be empty".to_string()));
    }
    non_negative(id, "current", coil.current)?;

    match &coil.geometry {
        CoilGeometry::Solenoid {
            radius,
            length,
            center,
        } => {
            positive(id, "radius", *radius)?;
            positive(id, "length", *length)?;
            finite_point(id, "center", center)?;
        }
        CoilGeometry::Helmholtz {
            radius,
            separation,
            center,
        } => {
            positive(id, "radius", *radius)?;
            if let Some(s) = separation {
                positive(id, "separation", *s)?;
            }
            finite_point(id, "center", center)?;
        }
        CoilGeometry::Racetrack {
            straight_length,
            bend_radius,
            center,
        } => {
            non_negative(id, "straight_length", *straight_length)?;
            positive(id, "bend_radius", *bend_radius)?;
            finite_point(id, "center", center)?;
        }
        CoilGeometry::Dipole {
            half_gap,
            width,
            length,
            center,
        } => {
            positive(id, "half_gap", *half_gap)?;
            positive(id, "width", *width)?;
            non_negative(id, "length", *length)?;
            finite_point(id, "center", center)?;
        }
        CoilGeometry::Path { points, closed } => {
            let needed = if *closed { 3 } else { 2 };
            if points.len() < needed {
                return Err(CryoError::Validation(format!(
                    "coil '{id}': {} path needs at least {needed} points, got {}",
                    if *closed { "closed" } else { "open" },
                    points.len()
                )));
            }
            for (i, p) in points.iter().enumerate() {
                finite_point(id, &format!("path point {i}"), p)?;
            }
            if let Some(i) = path_edges(points, *closed)
                .iter()
                .position(|(a, b)| norm(sub(*b, *a)) < 1e-12)
            {
                return Err(CryoError::Validation(format!(
                    "coil '{id}': path edge {i} has zero length"
                )));
            }
        }
    }

    let conductor = &coil.conductor;
    positive(id, "conductor cross_section", conductor.cross_section)?;
    positive(id, "jc0", conductor.jc.jc0)?;
    positive(id, "tc", conductor.jc.tc)?;
    positive(id, "bc2_0", conductor.jc.bc2_0)?;
    non_negative(id, "exponent", conductor.jc.exponent)?;

    if let Some(stab) = &conductor.stabilizer {
        positive(id, "stabilizer conductivity", stab.conductivity)?;
        positive(id, "stabilizer normal_resistivity", stab.normal_resistivity)?;
        positive(id, "stabilizer density", stab.density)?;
        positive(id, "stabilizer specific_heat", stab.specific_heat)?;
    }
    if let Some(circuit) = &coil.circuit {
        positive(id, "dump_voltage", circuit.dump_voltage)?;
        if let Some(l) = circuit.inductance {
            positive(id, "inductance", l)?;
        }
    }
    Ok(())
}

// ── Segment planning ─────────────────────────────────────────────────

/// Modeled loops and segments per loop for an N-turn solenoid.
fn solenoid_plan(turns: u32, min_segments: usize) -> (usize, usize) {
    let loops = (turns as usize).clamp(1, MAX_SOLENOID_LOOPS);
    (loops, loop_segments(loops, min_segments))
}

fn loop_segments(loops: usize, min_segments: usize) -> usize {
    min_segments.div_ceil(loops).max(MIN_LOOP_SEGMENTS)
}

/// Segments per straight leg and per bend, proportional to arc length.
fn racetrack_plan(straight: f64, bend: f64, min_segments: usize) -> (usize, usize) {
    let perimeter = 2.0 * straight + 2.0 * PI * bend;
    let per_metre = min_segments as f64 / perimeter;
    let n_straight = if straight > 0.0 {
        ((per_metre * straight).ceil() as usize).max(1)
    } else {
        0
    };
    let n_arc = ((per_metre * PI * bend).ceil() as usize).max(MIN_ARC_SEGMENTS);
    (n_straight, n_arc)
}

fn path_edges(points: &[[f64; 3]], closed: bool) -> Vec<([f64; 3], [f64; 3])> {
    let mut edges: Vec<_> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed {
        if let (Some(&last), Some(&first)) = (points.last(), points.first()) {
            edges.push((last, first));
        }
    }
    edges
}

fn path_plan(edges: &[([f64; 3], [f64; 3])], min_segments: usize) -> Vec<usize> {
    let lengths: Vec<f64> = edges.iter().map(|(a, b)| norm(sub(*b, *a))).collect();
    let total: f64 = lengths.iter().sum();
    lengths
        .iter()
        .map(|len| ((min_segments as f64 * len / total).ceil() as usize).max(1))
        .collect()
}

/// Number of segments [`discretize`] will produce, without building them.
///
/// Saturates instead of overflowing, so it is safe to call on a coil that
/// has not been validated yet.
pub fn segment_count(coil: &MagnetCoil, min_segments: usize) -> usize {
    match &coil.geometry {
        CoilGeometry::Solenoid { .. } => {
            let (loops, per_loop) = solenoid_plan(coil.turns, min_segments);
            loops.saturating_mul(per_loop)
        }
        CoilGeometry::Helmholtz { .. } => loop_segments(2, min_segments).saturating_mul(2),
        CoilGeometry::Racetrack {
            straight_length,
            bend_radius,
            ..
        } => {
            let (s, a) = racetrack_plan(*straight_length, *bend_radius, min_segments);
            s.saturating_add(a).saturating_mul(2)
        }
        CoilGeometry::Dipole { width, length, .. } => {
            let (s, a) = racetrack_plan(*length, 0.5 * width, min_segments.div_ceil(2));
            s.saturating_add(a).saturating_mul(4)
        }
        CoilGeometry::Path { points, closed } => path_plan(&path_edges(points, *closed), min_segments)
            .into_iter()
            .fold(0, usize::saturating_add),
    }
}

// ── Discretization ───────────────────────────────────────────────────

/// Circular filament of radius `radius` in the plane z = `center[2]`.
fn push_loop(
    out: &mut Vec<CurrentSegment>,
    center: [f64; 3],
    radius: f64,
    current: f64,
    n: usize,
) {
    let dtheta = 2.0 * PI / n as f64;
    for i in 0..n {
        let theta = (i as f64 + 0.5) * dtheta;
        let (s, c) = theta.sin_cos();
        out.push(CurrentSegment {
            midpoint: add(center, [radius * c, radius * s, 0.0]),
            dl: [-radius * s * dtheta, radius * c * dtheta, 0.0],
            current,
        });
    }
}

/// Racetrack in the plane spanned by `u` (straight legs) and `v`,
/// circulating from +u towards +v.
#[allow(clippy::too_many_arguments)]
fn push_racetrack(
    out: &mut Vec<CurrentSegment>,
    center: [f64; 3],
    u: [f64; 3],
    v: [f64; 3],
    straight: f64,
    bend: f64,
    current: f64,
    (n_straight, n_arc): (usize, usize),
) {
    let at = |a: f64, b: f64| add(center, add(scale(u, a), scale(v, b)));
    let half = 0.5 * straight;

    let step = if n_straight == 0 { 0.0 } else { straight / n_straight as f64 };
    let straight_leg = |y: f64, direction: f64| {
        (0..n_straight).map(move |i| CurrentSegment {
            midpoint: at(direction * (-half + (i as f64 + 0.5) * step), y),
            dl: scale(u, direction * step),
            current,
        })
    };
    let dphi = PI / n_arc as f64;
    let arc = |x0: f64, phi0: f64| {
        (0..n_arc).map(move |i| {
            let (s, c) = (phi0 + (i as f64 + 0.5) * dphi).sin_cos();
            CurrentSegment {
                midpoint: at(x0 + bend * c, bend * s),
                dl: add(scale(u, -bend * s * dphi), scale(v, bend * c * dphi)),
                current,
            }
        })
    };

    out.extend(straight_leg(-bend, 1.0));
    out.extend(arc(half, -0.5 * PI));
    out.extend(straight_leg(bend, -1.0));
    out.extend(arc(-half, 0.5 * PI));
}

/// Split the coil into straight current elements (≥ `min_segments`).
pub fn discretize(coil: &MagnetCoil, min_segments: usize) -> CryoResult<Vec<CurrentSegment>> {
    validate_coil(coil)?;
    let ampere_turns = coil.current * coil.turns as f64;
    let mut out = Vec::with_capacity(segment_count(coil, min_segments));

    match &coil.geometry {
        CoilGeometry::Solenoid {
            radius,
            length,
            center,
        } => {
            let (loops, per_loop) = solenoid_plan(coil.turns, min_segments);
            let pitch = length / loops as f64;
            let current = ampere_turns / loops as f64;
            for k in 0..loops {
                let z = -0.5 * length + (k as f64 + 0.5) * pitch;
                push_loop(&mut out, add(*center, scale(Z_HAT, z)), *radius, current, per_loop);
            }
        }
        CoilGeometry::Helmholtz {
            radius,
            separation,
            center,
        } => {
            let half = 0.5 * separation.unwrap_or(*radius);
            let per_loop = loop_segments(2, min_segments);
            for z in [-half, half] {
                push_loop(&mut out, add(*center, scale(Z_HAT, z)), *radius, ampere_turns, per_loop);
            }
        }
        CoilGeometry::Racetrack {
            straight_length,
            bend_radius,
            center,
        } => {
            let plan = racetrack_plan(*straight_length, *bend_radius, min_segments);
            push_racetrack(
                &mut out,
                *center,
                X_HAT,
                Y_HAT,
                *straight_length,
                *bend_radius,
                ampere_turns,
                plan,
            );
        }
        CoilGeometry::Dipole {
            half_gap,
            width,
            length,
            center,
        } => {
            // Long axis along z, circulating z → x so the aperture field is +y.
            let bend = 0.5 * width;
            let plan = racetrack_plan(*length, bend, min_segments.div_ceil(2));
            for offset in [-half_gap, *half_gap] {
                push_racetrack(
                    &mut out,
                    add(*center, scale(Y_HAT, offset)),
                    Z_HAT,
                    X_HAT,
                    *length,
                    bend,
                    0.5 * ampere_turns,
                    plan,
                );
            }
        }
        CoilGeometry::Path { points, closed } => {
            let edges = path_edges(points, *closed);
            let plan = path_plan(&edges, min_segments);
            for ((a, b), n) in edges.iter().zip(plan) {
                let dl = scale(sub(*b, *a), 1.0 / n as f64);
                for i in 0..n {
                    out.push(CurrentSegment {
                        midpoint: add(*a, scale(dl, i as f64 + 0.5)),
                        dl,
                        current: ampere_turns,
                    });
                }
            }
        }
    }
    Ok(out)
}

/// Length scale used for hoop stress: winding radius, bend radius, or
/// the largest centroid distance of a free path.
pub fn characteristic_radius(geometry: &CoilGeometry) -> f64 {
    match geometry {
        CoilGeometry::Solenoid { radius, .. } | CoilGeometry::Helmholtz { radius, .. } => *radius,
        CoilGeometry::Racetrack { bend_radius, .. } => *bend_radius,
        CoilGeometry::Dipole { width, .. } => 0.5 * width,
        CoilGeometry::Path { points, .. } => {
            let n = points.len().max(1) as f64;
            let centroid = points
                .iter()
                .fold([0.0; 3], |acc, p| add(acc, scale(*p, 1.0 / n)));
            points
                .iter()
                .map(|p| norm(sub(*p, centroid)))
                .fold(0.0, f64::max)
        }
    }
}

/// Length of the conductor path of one turn [m].
pub fn turn_length(geometry: &CoilGeometry) -> f64 {
    match geometry {
        CoilGeometry::Solenoid { radius, .. } | CoilGeometry::Helmholtz { radius, .. } => {
            2.0 * PI * radius
        }
        CoilGeometry::Racetrack {
            straight_length,
            bend_radius,
            ..
        } => 2.0 * straight_length + 2.0 * PI * bend_radius,
        CoilGeometry::Dipole { width, length, .. } => 2.0 * length + PI * width,
        CoilGeometry::Path { points, closed } => path_edges(points, *closed)
            .iter()
            .map(|(a, b)| norm(sub(*b, *a)))
            .sum(),
    }
}
