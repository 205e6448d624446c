// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Sparse Matrices
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coordinate-format assembly and compressed sparse row storage.
//!
//! Assembly accumulates `(row, col, value)` triplets; duplicates are
//! summed on conversion. Every CSR row stores an explicit diagonal entry
//! (possibly zero) so that diagonal updates never change the pattern.

/// Square matrix under assembly.
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    n: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl TripletMatrix {
    pub fn new(n: usize) -> Self {
        TripletMatrix {
            n,
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(n: usize, capacity: usize) -> Self {
        TripletMatrix {
            n,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Accumulate `value` into `(row, col)`.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n && col < self.n, "triplet ({row}, {col}) out of range");
        self.entries.push((row, col, value));
    }

    /// Stamp a two-terminal conductance `g` between `i` and `j`.
    pub fn add_coupling(&mut self, i: usize, j: usize, g: f64) {
        self.add(i, i, g);
        self.add(j, j, g);
        self.add(i, j, -g);
        self.add(j, i, -g);
    }

    pub fn to_csr(&self) -> CsrMatrix {
        let n = self.n;
        let mut sorted: Vec<(usize, usize, f64)> = self.entries.clone();
        sorted.extend((0..n).map(|i| (i, i, 0.0)));
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_ptr = vec![0usize; n + 1];
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, value) in sorted {
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += value;
                }
                continue;
            }
            col_idx.push(col);
            values.push(value);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }
        for i in 0..n {
            row_ptr[i + 1] += row_ptr[i];
        }

        let diag_pos = (0..n)
            .map(|i| {
                let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
                // Diagonal is always present: inserted above.
                row_ptr[i] + cols.partition_point(|&c| c < i)
            })
            .collect();

        CsrMatrix {
            n,
            row_ptr,
            col_idx,
            values,
            diag_pos,
        }
    }
}

/// Square CSR matrix with cached diagonal positions.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
    diag_pos: Vec<usize>,
}

impl CsrMatrix {
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `y = A·x`.
    pub fn mul_vec_into(&self, x: &[f64], y: &mut [f64]) {
        for (i, yi) in y.iter_mut().enumerate().take(self.n) {
            let mut sum = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            *yi = sum;
        }
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.n];
        self.mul_vec_into(x, &mut y);
        y
    }

    pub fn diagonal(&self) -> Vec<f64> {
        self.diag_pos.iter().map(|&k| self.values[k]).collect()
    }

    pub fn add_to_diagonal(&mut self, i: usize, value: f64) {
        let k = self.diag_pos[i];
        self.values[k] += value;
    }

    /// Entry (i, j), zero when outside the pattern.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let cols = &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]];
        match cols.binary_search(&j) {
            Ok(pos) => self.values[self.row_ptr[i] + pos],
            Err(_) => 0.0,
        }
    }

    /// max |A_ij| over stored entries.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |m, v| m.max(v.abs()))
    }

    /// Stored `(col, value)` pairs of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (self.row_ptr[i]..self.row_ptr[i + 1]).map(move |k| (self.col_idx[k], self.values[k]))
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        (0..self.n).all(|i| self.row(i).all(|(j, v)| (v - self.get(j, i)).abs() <= tol))
    }
}
