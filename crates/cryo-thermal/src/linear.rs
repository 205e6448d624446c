// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Linear Solve
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sparse solve used by both thermal solvers: Jacobi-PCG first, GMRES
//! when CG breaks down on a matrix that is not positive definite.

use cryo_math::cg::pcg_solve;
use cryo_math::gmres::{gmres_solve, GmresConfig};
use cryo_math::sparse::CsrMatrix;
use cryo_types::config::LinearSolverConfig;
use cryo_types::error::{CryoError, CryoResult};
use log::{debug, warn};

/// Solve `A·x = b` in place; `x` carries the initial guess.
///
/// Returns the number of iterations spent by the solver that produced
/// the answer.
pub fn solve_linear(
    a: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
    config: &LinearSolverConfig,
) -> CryoResult<usize> {
    let guess = x.to_vec();
    let cg = pcg_solve(a, b, x, config);
    if cg.converged {
        debug!(
            "PCG converged in {} iterations (scaled residual {:.3e})",
            cg.iterations, cg.residual
        );
        return Ok(cg.iterations);
    }
    if !cg.breakdown {
        return Err(CryoError::SolverNumerical {
            iterations: cg.iterations,
            residual: cg.residual,
        });
    }

    warn!(
        "PCG breakdown after {} iterations on a {}x{} system; retrying with GMRES({})",
        cg.iterations,
        a.n(),
        a.n(),
        config.gmres_restart
    );
    x.copy_from_slice(&guess);
    let gmres = gmres_solve(a, b, x, &GmresConfig::from(config));
    if gmres.converged && gmres.residual.is_finite() {
        debug!(
            "GMRES converged in {} iterations (scaled residual {:.3e})",
            gmres.iterations, gmres.residual
        );
        Ok(gmres.iterations)
    } else {
        Err(CryoError::SolverNumerical {
            iterations: cg.iterations + gmres.iterations,
            residual: gmres.residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryo_math::sparse::TripletMatrix;

    #[test]
    fn test_spd_system_uses_cg() {
        let mut t = TripletMatrix::new(3);
        t.add_coupling(0, 1, 1.0);
        t.add_coupling(1, 2, 1.0);
        t.add(0, 0, 1.0);
        t.add(2, 2, 1.0);
        let a = t.to_csr();
        let b = vec![1.0, 0.0, 1.0];
        let mut x = vec![0.0; 3];
        solve_linear(&a, &b, &mut x, &LinearSolverConfig::default()).unwrap();
        for xi in &x {
            assert!((xi - 1.0).abs() < 1e-10, "x = {x:?}");
        }
    }

    #[test]
    fn test_indefinite_system_falls_back_to_gmres() {
        let mut t = TripletMatrix::new(2);
        t.add(0, 0, 2.0);
        t.add(1, 1, -3.0);
        let a = t.to_csr();
        let b = vec![4.0, 6.0];
        let mut x = vec![0.0; 2];
        solve_linear(&a, &b, &mut x, &LinearSolverConfig::default()).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let n = 50;
        let mut t = TripletMatrix::new(n);
        for i in 0..n - 1 {
            t.add_coupling(i, i + 1, 1.0);
        }
        t.add(0, 0, 1e-6);
        let a = t.to_csr();
        let mut b = vec![0.0; n];
        b[n - 1] = 1.0;
        let mut x = vec![0.0; n];
        let config = LinearSolverConfig {
            max_iterations: 2,
            ..LinearSolverConfig::default()
        };
        let err = solve_linear(&a, &b, &mut x, &config).unwrap_err();
        assert!(matches!(err, CryoError::SolverNumerical { .. }), "{err}");
    }
}
