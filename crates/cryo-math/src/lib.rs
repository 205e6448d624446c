//! Numerical primitives for the CryoSim core.

pub mod cg;
pub mod elliptic;
pub mod gmres;
pub mod interp;
pub mod sparse;
