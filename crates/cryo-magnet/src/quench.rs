// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Quench Propagation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Adiabatic normal-zone propagation and hot-spot estimates.
//!
//! No cooling is assumed during the discharge: all Joule heat deposited
//! over the dump time constant stays in the conductor.

use cryo_thermal::Material;
use cryo_types::config::StabilizerProperties;
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::state::QuenchReport;
use log::{debug, warn};

/// Bisection steps for the enthalpy hot spot.
const HOT_SPOT_BISECTION_STEPS: usize = 100;

/// Normal-zone propagation velocity [m/s].
///
/// `v = sqrt(k ρₙ / (ρ Cp)) · sqrt(J² − Jc²) / Jc`, zero for `J ≤ Jc`.
pub fn quench_velocity(stabilizer: &StabilizerProperties, j: f64, jc: f64) -> f64 {
    let j = j.abs();
    if jc <= 0.0 || j <= jc {
        return 0.0;
    }
    let diffusive = (stabilizer.conductivity * stabilizer.normal_resistivity
        / (stabilizer.density * stabilizer.specific_heat))
        .sqrt();
    diffusive * (j * j - jc * jc).sqrt() / jc
}

/// Discharge time constant into a dump of voltage `v_dump` [s].
///
/// `tau = L * I / V`.
pub fn dump_time_constant(inductance: f64, current: f64, v_dump: f64) -> f64 {
    if v_dump <= 0.0 {
        return f64::INFINITY;
    }
    inductance.max(0.0) * current.abs() / v_dump
}

/// Joule heat per unit volume deposited over `tau` [J/m³].
pub fn adiabatic_heat_density(normal_resistivity: f64, j: f64, tau: f64) -> f64 {
    0.5 * normal_resistivity * j * j * tau
}

/// Hot-spot temperature with constant stabilizer heat capacity [K].
///
/// `T = T_op + ρₙ J² τ / (2 ρ Cp)`.
pub fn hot_spot_temperature(
    t_op: f64,
    stabilizer: &StabilizerProperties,
    j: f64,
    tau: f64,
) -> f64 {
    t_op + adiabatic_heat_density(stabilizer.normal_resistivity, j, tau)
        / (stabilizer.density * stabilizer.specific_heat)
}

/// Hot-spot temperature from the material's Cp(T) table [K].
///
/// Solves `ρ ∫_{T_op}^{T} Cp dT = ρₙ J² τ / 2`. Fails with
/// [`CryoError::OutOfRange`] when the deposited heat exceeds what the
/// table can absorb.
pub fn hot_spot_temperature_enthalpy(
    material: &Material,
    t_op: f64,
    normal_resistivity: f64,
    j: f64,
    tau: f64,
) -> CryoResult<f64> {
    let target = adiabatic_heat_density(normal_resistivity, j, tau);
    let (_, t_max) = material.valid_range();
    let capacity = material.volumetric_enthalpy(t_op, t_max)?;
    if target > capacity {
        return Err(CryoError::OutOfRange {
            material: material.id().to_string(),
            property: "specific_heat",
            temperature: t_max,
            t_min: t_op,
            t_max,
        });
    }
    if target <= 0.0 {
        return Ok(t_op);
    }

    let (mut lo, mut hi) = (t_op, t_max);
    for _ in 0..HOT_SPOT_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if material.volumetric_enthalpy(t_op, mid)? < target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-9 * hi {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Quench summary for a conductor driven above its critical density.
///
/// The enthalpy hot spot is reported only when `material` is given and
/// its Cp table covers the excursion.
#[allow(clippy::too_many_arguments)]
pub fn quench_report(
    stabilizer: &StabilizerProperties,
    material: Option<&Material>,
    t_op: f64,
    j: f64,
    jc: f64,
    inductance: f64,
    current: f64,
    v_dump: f64,
) -> QuenchReport {
    let time_constant = dump_time_constant(inductance, current, v_dump);
    let hot_spot_enthalpy = material.and_then(|m| {
        match hot_spot_temperature_enthalpy(m, t_op, stabilizer.normal_resistivity, j, time_constant) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Enthalpy hot spot unavailable for '{}': {e}", m.id());
                None
            }
        }
    });
    let report = QuenchReport {
        propagation_velocity: quench_velocity(stabilizer, j, jc),
        time_constant,
        hot_spot_temperature: hot_spot_temperature(t_op, stabilizer, j, time_constant),
        hot_spot_temperature_enthalpy: hot_spot_enthalpy,
    };
    debug!(
        "Quench: v={:.3e} m/s, tau={:.3e} s, T_hot={:.1} K",
        report.propagation_velocity, report.time_constant, report.hot_spot_temperature
    );
    report
}
