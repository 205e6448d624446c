// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Vacuum permeability (H/m).
pub const MU0_SI: f64 = 1.256_637_062_12e-6;

/// Stefan-Boltzmann constant (W/(m²·K⁴)).
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Default ambient / initial temperature (K) when none is given.
pub const DEFAULT_AMBIENT_K: f64 = 300.0;

/// Dirichlet penalty relative to the largest conductance entry.
/// Must stay >= 1e10 so the imposed value is exact to solver tolerance.
pub const DIRICHLET_PENALTY_FACTOR: f64 = 1.0e10;

/// Minimum number of current-element segments for discretized Biot-Savart.
pub const MIN_BIOT_SAVART_SEGMENTS: usize = 1000;

/// Largest accepted mesh refinement level (segments scale by 2^level).
pub const MAX_REFINEMENT_LEVEL: u32 = 6;
