// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Preconditioned Conjugate Gradient
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Jacobi-preconditioned conjugate gradient for symmetric positive
//! definite CSR systems.
//!
//! Convergence is measured on the Jacobi-scaled residual `D⁻¹(b − A·x)`,
//! which has the units of the unknown. Penalty-enforced rows carry
//! diagonals many orders above the rest of the matrix; scaling keeps them
//! from dominating the stopping test.

use cryo_types::config::LinearSolverConfig;

use crate::sparse::CsrMatrix;

/// Outcome of a PCG solve.
#[derive(Debug, Clone)]
pub struct CgResult {
    pub iterations: usize,
    /// Final ‖D⁻¹ r‖₂.
    pub residual: f64,
    pub converged: bool,
    /// `pᵀAp ≤ 0` or `rᵀz ≤ 0`: the matrix (or preconditioner) is not SPD.
    pub breakdown: bool,
}

pub(crate) fn inverse_diagonal(a: &CsrMatrix) -> Vec<f64> {
    a.diagonal()
        .into_iter()
        .map(|d| if d.abs() > 1e-30 { 1.0 / d } else { 1.0 })
        .collect()
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn l2_norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Stopping threshold shared by PCG and GMRES: `max(abs, rel·‖D⁻¹b‖)`.
pub(crate) fn scaled_tolerance(inv_diag: &[f64], b: &[f64], config: &LinearSolverConfig) -> f64 {
    let scaled_b: f64 = b
        .iter()
        .zip(inv_diag)
        .map(|(bi, di)| (bi * di) * (bi * di))
        .sum::<f64>()
        .sqrt();
    config.abs_tolerance.max(config.rel_tolerance * scaled_b)
}

/// Solve `A·x = b`; `x` holds the initial guess on entry.
pub fn pcg_solve(a: &CsrMatrix, b: &[f64], x: &mut [f64], config: &LinearSolverConfig) -> CgResult {
    let n = b.len();
    if n == 0 {
        return CgResult {
            iterations: 0,
            residual: 0.0,
            converged: true,
            breakdown: false,
        };
    }

    let inv_diag = inverse_diagonal(a);
    let tol = scaled_tolerance(&inv_diag, b, config);

    let mut r = a.mul_vec(x);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
    let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
    let mut residual = l2_norm(&z);
    if residual <= tol {
        return CgResult {
            iterations: 0,
            residual,
            converged: true,
            breakdown: false,
        };
    }

    let mut p = z.clone();
    let mut rz_old = dot(&r, &z);
    let mut ap = vec![0.0; n];

    for iter in 1..=config.max_iterations {
        if rz_old <= 0.0 || !rz_old.is_finite() {
            return CgResult {
                iterations: iter - 1,
                residual,
                converged: false,
                breakdown: true,
            };
        }

        a.mul_vec_into(&p, &mut ap);
        let denom = dot(&p, &ap);
        if denom <= 0.0 || !denom.is_finite() {
            return CgResult {
                iterations: iter - 1,
                residual,
                converged: false,
                breakdown: true,
            };
        }

        let alpha = rz_old / denom;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
            z[i] = r[i] * inv_diag[i];
        }

        residual = l2_norm(&z);
        if residual <= tol {
            return CgResult {
                iterations: iter,
                residual,
                converged: true,
                breakdown: false,
            };
        }

        let rz_new = dot(&r, &z);
        let beta = rz_new / rz_old;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz_old = rz_new;
    }

    CgResult {
        iterations: config.max_iterations,
        residual,
        converged: false,
        breakdown: false,
    }
}
