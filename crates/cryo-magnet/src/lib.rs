// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Magnet Engineering
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Superconducting magnet analysis.
//!
//! - `coil`: geometry validation and discretization into current elements
//! - `field`: closed-form and Biot-Savart fields, field maps, inductance
//! - `margin`: critical-surface scaling and operating margin
//! - `quench`: adiabatic normal-zone velocity and hot-spot estimates

pub mod coil;
pub mod field;
pub mod margin;
pub mod quench;

pub use field::{field_at, field_map, CoilAssembly, CoilSource};
pub use margin::{critical_current_density, margin_analysis, margin_report};
