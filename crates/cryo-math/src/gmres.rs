// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted GMRES(m) Krylov subspace solver for general CSR systems.
//!
//! GMRES (Generalised Minimal RESidual) builds an orthonormal Krylov
//! basis via Arnoldi iteration with modified Gram-Schmidt, then solves
//! the projected least-squares problem using Givens rotations on the
//! upper Hessenberg matrix.  When the basis reaches size `m` without
//! convergence the solver restarts from the current approximate
//! solution.
//!
//! A Jacobi left-preconditioner is applied: instead of solving
//! `A x = b`, we solve `D⁻¹ A x = D⁻¹ b` with `D = diag(A)`. The
//! monitored residual is therefore the same scaled residual that
//! [`crate::cg::pcg_solve`] stops on. GMRES needs neither symmetry nor
//! definiteness, so it serves as the fallback when PCG breaks down.

use cryo_types::config::LinearSolverConfig;

use crate::cg::{dot, inverse_diagonal, l2_norm, scaled_tolerance};
use crate::sparse::CsrMatrix;

// ───────────────────────────── configuration ─────────────────────────

/// Configuration for the GMRES(m) solver.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Krylov subspace dimension before restart (default: 30).
    pub restart: usize,
    /// Maximum number of outer (restart) iterations (default: 100).
    pub max_iter: usize,
    /// Tolerance relative to ‖D⁻¹b‖ (default: 1e-12).
    pub tol: f64,
    /// Absolute floor on the scaled residual (default: 1e-14).
    pub abs_tol: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            restart: 30,
            max_iter: 100,
            tol: 1e-12,
            abs_tol: 1e-14,
        }
    }
}

impl From<&LinearSolverConfig> for GmresConfig {
    /// Spend the same matrix-vector budget as PCG would.
    fn from(config: &LinearSolverConfig) -> Self {
        let restart = config.gmres_restart.max(1);
        GmresConfig {
            restart,
            max_iter: config.max_iterations.div_ceil(restart).max(1),
            tol: config.rel_tolerance,
            abs_tol: config.abs_tolerance,
        }
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// Total number of matrix-vector products (inner iterations summed
    /// over all restarts).
    pub iterations: usize,
    /// Final ‖D⁻¹ r‖₂.
    pub residual: f64,
    /// Whether convergence was achieved.
    pub converged: bool,
}

// ───────────────────────── BLAS-like helpers ─────────────────────────

/// `y = y + alpha * x` (axpy).
#[inline]
fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// Preconditioned residual `D⁻¹ (b − A x)`.
fn scaled_residual(a: &CsrMatrix, inv_diag: &[f64], b: &[f64], x: &[f64], ax: &mut [f64]) -> Vec<f64> {
    a.mul_vec_into(x, ax);
    b.iter()
        .zip(ax.iter())
        .zip(inv_diag)
        .map(|((bi, axi), di)| (bi - axi) * di)
        .collect()
}

// ───────────────────── Givens rotation helpers ──────────────────────

/// A single Givens rotation storing (c, s) such that
/// ```text
/// | c  s | | a |   | r |
/// |-s  c | | b | = | 0 |
/// ```
#[derive(Clone, Copy)]
struct GivensRotation {
    c: f64,
    s: f64,
}

impl GivensRotation {
    /// Compute the rotation that zeroes `b` in (a, b).
    fn compute(a: f64, b: f64) -> Self {
        if b.abs() < 1e-300 {
            GivensRotation { c: 1.0, s: 0.0 }
        } else if b.abs() > a.abs() {
            let tau = -a / b;
            let s = 1.0 / (1.0 + tau * tau).sqrt();
            let c = s * tau;
            GivensRotation { c, s }
        } else {
            let tau = -b / a;
            let c = 1.0 / (1.0 + tau * tau).sqrt();
            let s = c * tau;
            GivensRotation { c, s }
        }
    }

    /// Apply this rotation to (a, b) in place.
    #[inline]
    fn apply(&self, a: &mut f64, b: &mut f64) {
        let ta = *a;
        let tb = *b;
        *a = self.c * ta - self.s * tb;
        *b = self.s * ta + self.c * tb;
    }
}

// ─────────────────────────── main solver ─────────────────────────────

/// Solve `A x = b` using restarted GMRES(m) with a Jacobi left
/// preconditioner. `x` is the initial guess on entry and the solution
/// on exit.
///
/// # Algorithm
///
/// ```text
/// for each restart cycle:
///   z = D⁻¹ (b - A·x)             (preconditioned residual)
///   beta = ||z||₂
///   V[0] = z / beta
///   for j = 0 .. m-1:             (Arnoldi)
///     w = D⁻¹ A V[j]
///     for i = 0 .. j:             (modified Gram-Schmidt)
///       H[i,j] = <w, V[i]>
///       w -= H[i,j] V[i]
///     H[j+1,j] = ||w||₂
///     V[j+1]   = w / H[j+1,j]
///     apply previous Givens to H[:,j]
///     compute new Givens to zero H[j+1,j]
///     update residual norm estimate
///     if converged: break
///   solve upper triangular system for y
///   x += V · y
/// ```
pub fn gmres_solve(a: &CsrMatrix, b: &[f64], x: &mut [f64], config: &GmresConfig) -> GmresResult {
    let n = b.len();
    if n == 0 {
        return GmresResult {
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let m = config.restart.clamp(1, n); // Krylov dimension cannot exceed n
    let inv_diag = inverse_diagonal(a);
    let linear = LinearSolverConfig {
        rel_tolerance: config.tol,
        abs_tolerance: config.abs_tol,
        ..LinearSolverConfig::default()
    };
    let abs_tol = scaled_tolerance(&inv_diag, b, &linear);

    let mut av = vec![0.0; n];
    let mut total_iters: usize = 0;

    let z0 = scaled_residual(a, &inv_diag, b, x, &mut av);
    let initial = l2_norm(&z0);
    if initial <= abs_tol {
        return GmresResult {
            iterations: 0,
            residual: initial,
            converged: true,
        };
    }

    // ───── outer restart loop ─────
    for _restart in 0..config.max_iter {
        let z = scaled_residual(a, &inv_diag, b, x, &mut av);
        let beta = l2_norm(&z);
        if beta <= abs_tol {
            return GmresResult {
                iterations: total_iters,
                residual: beta,
                converged: true,
            };
        }

        // Krylov basis V[0..m+1], each of length n
        let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        v_basis.push(z.iter().map(|zi| zi / beta).collect());

        // Upper Hessenberg matrix H[(m+1) x m] stored column-major
        // H[i][j] => h_store[j * (m+1) + i]
        let h_rows = m + 1;
        let mut h_store = vec![0.0; h_rows * m];
        let mut givens: Vec<GivensRotation> = Vec::with_capacity(m);

        // Right-hand side of the Hessenberg least-squares: g = beta * e_1
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut converged_inner = false;
        let mut inner_iters: usize = 0;

        // ───── Arnoldi iteration ─────
        for j in 0..m {
            inner_iters = j + 1;
            total_iters += 1;

            // w = D⁻¹ A V[j]
            a.mul_vec_into(&v_basis[j], &mut av);
            let mut w: Vec<f64> = av.iter().zip(&inv_diag).map(|(v, d)| v * d).collect();

            // Modified Gram-Schmidt orthogonalisation
            for i in 0..=j {
                let h_ij = dot(&w, &v_basis[i]);
                h_store[j * h_rows + i] = h_ij;
                vec_axpy(-h_ij, &v_basis[i], &mut w);
            }

            let h_jp1_j = l2_norm(&w);
            h_store[j * h_rows + (j + 1)] = h_jp1_j;

            if h_jp1_j > 1e-300 {
                v_basis.push(w.iter().map(|wi| wi / h_jp1_j).collect());
            } else {
                // Happy breakdown: residual is zero in the Krylov subspace
                v_basis.push(vec![0.0; n]);
            }

            // Apply all previous Givens rotations to column j of H
            for (i, rot) in givens.iter().enumerate() {
                let mut ha = h_store[j * h_rows + i];
                let mut hb = h_store[j * h_rows + i + 1];
                rot.apply(&mut ha, &mut hb);
                h_store[j * h_rows + i] = ha;
                h_store[j * h_rows + i + 1] = hb;
            }

            // Compute new Givens rotation to zero H[j+1, j]
            let rot =
                GivensRotation::compute(h_store[j * h_rows + j], h_store[j * h_rows + (j + 1)]);
            {
                let mut ha = h_store[j * h_rows + j];
                let mut hb = h_store[j * h_rows + (j + 1)];
                rot.apply(&mut ha, &mut hb);
                h_store[j * h_rows + j] = ha;
                h_store[j * h_rows + (j + 1)] = hb;
            }
            {
                let mut ga = g[j];
                let mut gb = g[j + 1];
                rot.apply(&mut ga, &mut gb);
                g[j] = ga;
                g[j + 1] = gb;
            }
            givens.push(rot);

            // The residual norm estimate is |g[j+1]|
            if g[j + 1].abs() <= abs_tol || h_jp1_j < 1e-300 {
                converged_inner = true;
                break;
            }
        }

        // ───── solve the upper triangular system H y = g ─────
        let k = inner_iters;
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for jj in (i + 1)..k {
                sum -= h_store[jj * h_rows + i] * y[jj];
            }
            let diag = h_store[i * h_rows + i];
            y[i] = if diag.abs() > 1e-300 { sum / diag } else { 0.0 };
        }

        // ───── update solution: x = x + V * y ─────
        for (i, yi) in y.iter().enumerate() {
            vec_axpy(*yi, &v_basis[i], x);
        }

        if converged_inner {
            let residual = l2_norm(&scaled_residual(a, &inv_diag, b, x, &mut av));
            return GmresResult {
                iterations: total_iters,
                residual,
                converged: true,
            };
        }
    }

    // Exhausted restarts: compute true residual
    let residual = l2_norm(&scaled_residual(a, &inv_diag, b, x, &mut av));
    GmresResult {
        iterations: total_iters,
        residual,
        converged: residual <= abs_tol,
    }
}

// ═══════════════════════════════ tests ═══════════════════════════════
