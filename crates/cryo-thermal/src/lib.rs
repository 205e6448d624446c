// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Thermal Network
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conduction network and thermal solvers.
//!
//! Materials and meshing feed a validated [`problem::ThermalProblem`];
//! the assembler turns it into K, Q and C at a temperature field, and
//! the steady (Newton) and transient (backward Euler) solvers drive it.

pub mod assembler;
pub mod linear;
pub mod material;
pub mod mesh;
pub mod problem;
pub mod steady;
pub mod transient;
pub mod validate;

pub use material::{Material, MaterialCatalog};
pub use problem::ThermalProblem;
pub use steady::solve_steady;
pub use transient::solve_transient;
