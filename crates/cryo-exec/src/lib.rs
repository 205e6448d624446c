// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Execution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Routing and execution of simulation requests.
//!
//! The router decides local versus remote execution from problem size
//! alone. Local runs happen inline under a wall-time ceiling; remote runs
//! go to a [`job::RemoteDispatcher`] and report progress through a
//! bounded channel.

pub mod analysis;
pub mod executor;
pub mod job;
pub mod router;

pub use analysis::{run_analysis, validate_request};
pub use executor::{Execution, Executor};
pub use job::{JobOutcome, RemoteJob, ThreadDispatcher};
pub use router::{problem_size, route, ExecutionTarget, RouterConfig};
