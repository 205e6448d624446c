// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Superconductor Operating Margin
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Critical-surface scaling and operating margin of a coil.
//!
//! `Jc(B,T) = Jc0·(1−T/Tc)·(Bc2(T)/(B+Bc2(T)))ⁿ` with
//! `Bc2(T) = Bc2(0)·(1−(T/Tc)²)`. The margin is `J_op / Jc` at the peak
//! field; values above one mean the conductor is driven past its
//! critical surface.

use cryo_thermal::MaterialCatalog;
use cryo_types::config::{CoilGeometry, JcParameters, MagnetCoil, MarginOptions};
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::progress::{Checkpoint, ProgressUpdate, SolveMonitor};
use cryo_types::state::{FieldPeak, MarginReport};
use log::{info, warn};
use rayon::prelude::*;
use std::time::Instant;

use crate::coil::{characteristic_radius, norm};
use crate::field::{estimate_inductance, hoop_stress, stored_energy, CoilAssembly};
use crate::quench::quench_report;

/// Samples along the axis of solenoid and Helmholtz coils.
const AXIS_SAMPLES: usize = 2001;

/// Default winding exclusion as a fraction of the coil's characteristic radius.
const DEFAULT_EXCLUSION_FRACTION: f64 = 0.05;

/// Bisection steps for the current-sharing temperature.
const TCS_BISECTION_STEPS: usize = 80;

/// Upper critical field at temperature `t` [T], zero at and above Tc.
pub fn upper_critical_field(params: &JcParameters, t: f64) -> f64 {
    let reduced = t.max(0.0) / params.tc;
    (params.bc2_0 * (1.0 - reduced * reduced)).max(0.0)
}

/// Critical current density [A/m²]; negative values clamp to zero.
pub fn critical_current_density(params: &JcParameters, b: f64, t: f64) -> f64 {
    let t = t.max(0.0);
    if t >= params.tc {
        return 0.0;
    }
    let bc2 = upper_critical_field(params, t);
    if bc2 <= 0.0 {
        return 0.0;
    }
    let field_factor = (bc2 / (b.abs() + bc2)).powf(params.exponent);
    (params.jc0 * (1.0 - t / params.tc) * field_factor).max(0.0)
}

/// `J_op / Jc(B,T)`, or [`CryoError::CriticalSurfaceExceeded`] when Jc ≤ 0.
pub fn operating_margin(params: &JcParameters, j_op: f64, b: f64, t: f64) -> CryoResult<f64> {
    let jc = critical_current_density(params, b, t);
    if jc <= 0.0 {
        return Err(CryoError::CriticalSurfaceExceeded {
            field: b.abs(),
            temperature: t,
        });
    }
    Ok(j_op.abs() / jc)
}

/// Temperature at which `Jc(B, T)` falls to `j_op` [K].
///
/// `None` when the conductor is already over-critical at 0 K.
pub fn current_sharing_temperature(params: &JcParameters, j_op: f64, b: f64) -> Option<f64> {
    let j_op = j_op.abs();
    if critical_current_density(params, b, 0.0) < j_op {
        return None;
    }
    let (mut lo, mut hi) = (0.0, params.tc);
    for _ in 0..TCS_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if critical_current_density(params, b, mid) >= j_op {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Peak |B| along the axis of a solenoid or Helmholtz coil, including the
/// field of every other coil in the assembly.
fn axial_peak(assembly: &CoilAssembly<'_>, index: usize) -> Option<FieldPeak> {
    let (center, span) = match &assembly.sources()[index].coil().geometry {
        CoilGeometry::Solenoid {
            radius,
            length,
            center,
        } => (*center, 0.5 * length + radius),
        CoilGeometry::Helmholtz {
            radius,
            separation,
            center,
        } => (*center, 0.5 * separation.unwrap_or(*radius) + radius),
        _ => return None,
    };
    let step = 2.0 * span / (AXIS_SAMPLES - 1) as f64;
    (0..AXIS_SAMPLES)
        .into_par_iter()
        .map(|i| {
            let point = [center[0], center[1], center[2] - span + i as f64 * step];
            FieldPeak {
                position: point,
                magnitude: norm(assembly.field_at(point)),
            }
        })
        .reduce_with(|a, b| if b.magnitude > a.magnitude { b } else { a })
}

/// Peak |B| on a grid over one coil's winding bounding box, skipping
/// points within `exclusion` of any winding.
fn grid_peak(
    assembly: &CoilAssembly<'_>,
    index: usize,
    n: usize,
    exclusion: f64,
) -> CryoResult<FieldPeak> {
    let source = &assembly.sources()[index];
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for seg in source.segments() {
        for c in 0..3 {
            lo[c] = lo[c].min(seg.midpoint[c]);
            hi[c] = hi[c].max(seg.midpoint[c]);
        }
    }
    let extent: f64 = norm([hi[0] - lo[0], hi[1] - lo[1], hi[2] - lo[2]]);
    let counts: [usize; 3] =
        std::array::from_fn(|c| if hi[c] - lo[c] > 1e-9 * extent { n } else { 1 });
    let coord = |c: usize, i: usize| {
        if counts[c] == 1 {
            lo[c]
        } else {
            lo[c] + (hi[c] - lo[c]) * i as f64 / (counts[c] - 1) as f64
        }
    };

    let total = counts[0] * counts[1] * counts[2];
    (0..total)
        .into_par_iter()
        .filter_map(|idx| {
            let k = idx % counts[2];
            let j = (idx / counts[2]) % counts[1];
            let i = idx / (counts[1] * counts[2]);
            let point = [coord(0, i), coord(1, j), coord(2, k)];
            if assembly.winding_distance(point) < exclusion {
                return None;
            }
            Some(FieldPeak {
                position: point,
                magnitude: norm(assembly.field_at(point)),
            })
        })
        .reduce_with(|a, b| if b.magnitude > a.magnitude { b } else { a })
        .ok_or_else(|| {
            CryoError::Validation(format!(
                "coil '{}': exclusion radius {exclusion} m removes every peak-search point",
                source.coil().id
            ))
        })
}

/// Field evaluations a margin analysis of `coil` performs per source segment.
pub fn peak_search_points(coil: &MagnetCoil, options: &MarginOptions) -> usize {
    match coil.geometry {
        CoilGeometry::Solenoid { .. } | CoilGeometry::Helmholtz { .. } => AXIS_SAMPLES,
        _ => options
            .grid_points_per_axis
            .saturating_mul(options.grid_points_per_axis)
            .saturating_mul(options.grid_points_per_axis),
    }
}

/// Locate the peak field magnitude of one coil on its own.
pub fn peak_field(coil: &MagnetCoil, options: &MarginOptions) -> CryoResult<FieldPeak> {
    options.validate()?;
    let coils = std::slice::from_ref(coil);
    let assembly = CoilAssembly::new(coils, options.min_segments)?;
    locate_peak(&assembly, 0, options)
}

fn locate_peak(
    assembly: &CoilAssembly<'_>,
    index: usize,
    options: &MarginOptions,
) -> CryoResult<FieldPeak> {
    if let Some(peak) = axial_peak(assembly, index) {
        return Ok(peak);
    }
    let exclusion = options.exclusion_radius.unwrap_or_else(|| {
        DEFAULT_EXCLUSION_FRACTION * characteristic_radius(&assembly.sources()[index].coil().geometry)
    });
    grid_peak(assembly, index, options.grid_points_per_axis, exclusion)
}

/// Margin reports for every coil of a system, each at the peak of the
/// superposed field of all coils.
///
/// The monitor is consulted after every coil but the last, and the
/// `max_wall_time_s` ceiling is checked at the same points.
pub fn margin_analysis(
    coils: &[MagnetCoil],
    options: &MarginOptions,
    catalog: Option<&MaterialCatalog>,
    monitor: &mut dyn SolveMonitor,
) -> CryoResult<Vec<MarginReport>> {
    options.validate()?;
    if coils.is_empty() {
        return Err(CryoError::Validation(
            "margin analysis needs at least one coil".to_string(),
        ));
    }
    let start = Instant::now();
    let assembly = CoilAssembly::new(coils, options.min_segments)?;
    let total = coils.len();
    let mut reports = Vec::with_capacity(total);
    for index in 0..total {
        let report = report_for(&assembly, index, options, catalog)?;
        let update = ProgressUpdate {
            fraction_complete: (index + 1) as f64 / total as f64,
            current_step: index + 1,
            residual_or_metric: report.margin,
        };
        reports.push(report);
        if index + 1 == total {
            break;
        }
        if monitor.checkpoint(update) == Checkpoint::Cancel {
            info!("Margin analysis cancelled after coil {}", index + 1);
            return Err(CryoError::Cancelled { step: index + 1 });
        }
        if let Some(limit) = options.max_wall_time_s {
            if start.elapsed().as_secs_f64() > limit {
                warn!("Margin analysis hit the {limit} s wall-time ceiling after coil {}", index + 1);
                // Residual: fraction of coils left unevaluated.
                return Err(CryoError::Convergence {
                    iterations: index + 1,
                    residual: (total - index - 1) as f64 / total as f64,
                });
            }
        }
    }
    Ok(reports)
}

/// Operating margin, protection figures and, for over-critical coils
/// with stabilizer and circuit data, a quench summary, for a coil on its
/// own.
///
/// `catalog` supplies the Cp(T) table named by the stabilizer, if any.
pub fn margin_report(
    coil: &MagnetCoil,
    options: &MarginOptions,
    catalog: Option<&MaterialCatalog>,
) -> CryoResult<MarginReport> {
    options.validate()?;
    let assembly = CoilAssembly::new(std::slice::from_ref(coil), options.min_segments)?;
    report_for(&assembly, 0, options, catalog)
}

fn report_for(
    assembly: &CoilAssembly<'_>,
    index: usize,
    options: &MarginOptions,
    catalog: Option<&MaterialCatalog>,
) -> CryoResult<MarginReport> {
    let coil = assembly.sources()[index].coil();
    let peak = locate_peak(assembly, index, options)?;
    let t_op = options.operating_temperature;
    let params = &coil.conductor.jc;

    let j_op = coil.current / coil.conductor.cross_section;
    let jc = critical_current_density(params, peak.magnitude, t_op);
    let margin = operating_margin(params, j_op, peak.magnitude, t_op)?;
    let exceeds_critical = margin > 1.0;

    let inductance = match coil.circuit.as_ref().and_then(|c| c.inductance) {
        Some(l) => l,
        None => estimate_inductance(coil)?,
    };
    let stored = stored_energy(coil, inductance);
    let hoop = hoop_stress(coil, peak.magnitude);

    let quench = match (&coil.conductor.stabilizer, &coil.circuit) {
        (Some(stab), Some(circuit)) if exceeds_critical => {
            let material = match (&stab.material, catalog) {
                (Some(id), Some(catalog)) => Some(catalog.require(id)?),
                (Some(id), None) => {
                    warn!("Coil '{}': no catalog to resolve stabilizer '{id}'", coil.id);
                    None
                }
                _ => None,
            };
            Some(quench_report(
                stab,
                material.as_deref(),
                t_op,
                j_op,
                jc,
                inductance,
                coil.current,
                circuit.dump_voltage,
            ))
        }
        (_, _) if exceeds_critical => {
            warn!(
                "Coil '{}' exceeds its critical surface; quench figures need stabilizer and circuit data",
                coil.id
            );
            None
        }
        _ => None,
    };

    info!(
        "Coil '{}': B_peak={:.4} T, J_op={:.3e} A/m², Jc={:.3e} A/m², margin={:.4}",
        coil.id, peak.magnitude, j_op, jc, margin
    );
    Ok(MarginReport {
        coil_id: coil.id.clone(),
        peak_field: peak,
        operating_temperature: t_op,
        operating_current_density: j_op,
        critical_current_density: jc,
        margin,
        exceeds_critical,
        current_sharing_temperature: current_sharing_temperature(params, j_op, peak.magnitude),
        inductance,
        stored_energy: stored,
        hoop_stress: hoop,
        quench,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coil::tests::coil;
    use crate::field::solenoid_axial_field;
    use cryo_types::config::{QuenchCircuit, StabilizerProperties};
    use cryo_types::progress::NoopMonitor;

    fn params() -> JcParameters {
        JcParameters {
            jc0: 3e9,
            tc: 9.2,
            bc2_0: 14.5,
            exponent: 1.0,
        }
    }

    fn solenoid(current: f64) -> MagnetCoil {
        coil(
            CoilGeometry::Solenoid {
                radius: 0.05,
                length: 0.2,
                center: [0.0; 3],
            },
            current,
            1000,
        )
    }

    #[test]
    fn test_jc_scaling_law() {
        let p = params();
        let bc2 = 14.5 * (1.0 - (4.2f64 / 9.2).powi(2));
        let expected = 3e9 * (1.0 - 4.2 / 9.2) * bc2 / (5.0 + bc2);
        let got = critical_current_density(&p, 5.0, 4.2);
        assert!((got - expected).abs() / expected < 1e-12);
        assert_eq!(critical_current_density(&p, 1.0, 9.2), 0.0);
        assert_eq!(critical_current_density(&p, 1.0, 12.0), 0.0);
        assert!(critical_current_density(&p, -5.0, 4.2) == got);
    }

    #[test]
    fn test_beyond_critical_surface_is_an_error() {
        let err = operating_margin(&params(), 1e8, 2.0, 10.0).unwrap_err();
        assert!(matches!(
            err,
            CryoError::CriticalSurfaceExceeded { temperature, .. } if temperature == 10.0
        ));
    }

    #[test]
    fn test_margin_is_one_exactly_at_critical() {
        let p = params();
        let (b, t) = (3.0, 4.2);
        let jc = critical_current_density(&p, b, t);
        let at = operating_margin(&p, jc, b, t).unwrap();
        assert!((at - 1.0).abs() < 1e-6);
        let over = operating_margin(&p, 1.1 * jc, b, t).unwrap();
        assert!(over > 1.0);
    }

    #[test]
    fn test_current_sharing_temperature_inverts_jc() {
        let p = params();
        let j_op = 5e8;
        let tcs = current_sharing_temperature(&p, j_op, 2.0).unwrap();
        assert!(tcs > 0.0 && tcs < 9.2);
        let jc = critical_current_density(&p, 2.0, tcs);
        assert!((jc - j_op).abs() / j_op < 1e-9, "Jc(Tcs) = {jc}");
        assert!(current_sharing_temperature(&p, 1e10, 2.0).is_none());
    }

    #[test]
    fn test_solenoid_margin_report() {
        let c = solenoid(10.0);
        let report = margin_report(&c, &MarginOptions::default(), None).unwrap();
        let b_center = solenoid_axial_field(0.05, 0.2, 10_000.0, 0.0);
        assert!((report.peak_field.magnitude - b_center).abs() / b_center < 1e-9);
        assert!(report.peak_field.position[2].abs() < 1e-9);
        assert!((report.operating_current_density - 1e7).abs() < 1e-3);
        assert!(report.margin > 0.0 && report.margin < 0.01);
        assert!(!report.exceeds_critical);
        assert!(report.quench.is_none());
        assert!(report.current_sharing_temperature.unwrap() > 4.2);
        assert!(report.stored_energy > 0.0);
        // Build N·A/ℓ = 5 mm.
        let hoop = b_center * b_center / (2.0 * cryo_types::constants::MU0_SI) * 0.05 / 5e-3;
        assert!((report.hoop_stress - hoop).abs() / hoop < 1e-9);
    }

    #[test]
    fn test_driving_past_critical_reports_quench() {
        let mut c = solenoid(10.0);
        let b = solenoid_axial_field(0.05, 0.2, 10_000.0, 0.0);
        let jc = critical_current_density(&c.conductor.jc, b, 4.2);
        // Shrink the conductor until J_op sits 10 % above Jc.
        c.conductor.cross_section = 10.0 / (1.1 * jc);
        c.conductor.stabilizer = Some(StabilizerProperties {
            conductivity: 400.0,
            normal_resistivity: 2e-10,
            density: 8960.0,
            specific_heat: 0.2,
            material: None,
        });
        c.circuit = Some(QuenchCircuit {
            inductance: Some(0.04),
            dump_voltage: 10.0,
        });
        let report = margin_report(&c, &MarginOptions::default(), None).unwrap();
        assert!((report.margin - 1.1).abs() < 1e-6, "margin = {}", report.margin);
        assert!(report.exceeds_critical);
        let quench = report.quench.expect("quench report");
        assert!(quench.propagation_velocity > 0.0);
        assert!((quench.time_constant - 0.04).abs() < 1e-12);
        assert!(quench.hot_spot_temperature > 4.2);
        assert!(quench.hot_spot_temperature_enthalpy.is_none());
    }

    #[test]
    fn test_racetrack_peak_uses_grid() {
        let c = coil(
            CoilGeometry::Racetrack {
                straight_length: 0.2,
                bend_radius: 0.05,
                center: [0.0; 3],
            },
            100.0,
            100,
        );
        let options = MarginOptions {
            grid_points_per_axis: 9,
            ..MarginOptions::default()
        };
        let peak = peak_field(&c, &options).unwrap();
        // Flat coil: z collapses to the winding plane.
        assert_eq!(peak.position[2], 0.0);
        assert!(peak.magnitude > 0.0);
        let excluded = MarginOptions {
            exclusion_radius: Some(10.0),
            ..options
        };
        assert!(peak_field(&c, &excluded).unwrap_err().is_validation());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = MarginOptions {
            operating_temperature: -1.0,
            ..MarginOptions::default()
        };
        assert!(margin_report(&solenoid(10.0), &options, None)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_neighbouring_coil_field_enters_margin() {
        let coils = vec![solenoid(10.0), solenoid(10.0)];
        let reports =
            margin_analysis(&coils, &MarginOptions::default(), None, &mut NoopMonitor).unwrap();
        let alone = margin_report(&coils[0], &MarginOptions::default(), None).unwrap();
        let b_center = solenoid_axial_field(0.05, 0.2, 10_000.0, 0.0);
        for report in &reports {
            let b = report.peak_field.magnitude;
            assert!((b - 2.0 * b_center).abs() / b_center < 1e-9, "B_peak = {b}");
            assert!(report.margin > alone.margin);
        }
    }

    #[test]
    fn test_margin_analysis_wall_time_ceiling() {
        let coils = vec![solenoid(10.0), solenoid(20.0), solenoid(30.0)];
        let options = MarginOptions {
            max_wall_time_s: Some(1e-12),
            ..MarginOptions::default()
        };
        match margin_analysis(&coils, &options, None, &mut NoopMonitor) {
            Err(CryoError::Convergence { iterations, residual }) => {
                assert_eq!(iterations, 1);
                assert!((residual - 2.0 / 3.0).abs() < 1e-12);
            }
            other => panic!("expected wall-time stop, got {other:?}"),
        }
        assert!(margin_analysis(&[], &MarginOptions::default(), None, &mut NoopMonitor)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_peak_search_points() {
        let options = MarginOptions::default();
        assert_eq!(peak_search_points(&solenoid(1.0), &options), AXIS_SAMPLES);
        let c = coil(
            CoilGeometry::Racetrack {
                straight_length: 0.2,
                bend_radius: 0.05,
                center: [0.0; 3],
            },
            1.0,
            10,
        );
        assert_eq!(peak_search_points(&c, &options), 15 * 15 * 15);
    }
}
