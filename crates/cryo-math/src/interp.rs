//! Shape-preserving piecewise cubic Hermite interpolation (PCHIP).
//!
//! Slopes follow Fritsch–Carlson with the weighted harmonic mean at
//! interior knots and the one-sided three-point rule at the ends, so the
//! interpolant never overshoots monotone data. Queries outside the
//! sample range return `None`; this type never extrapolates.

use cryo_types::error::{CryoError, CryoResult};

#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneCubic {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
    /// ∫ from xs[0] to xs[k].
    cumulative: Vec<f64>,
}

impl MonotoneCubic {
    /// Build from strictly increasing `xs` and matching `ys` (≥ 2 samples).
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> CryoResult<Self> {
        if xs.len() != ys.len() {
            return Err(CryoError::Validation(format!(
                "interpolation table has {} abscissae but {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(CryoError::Validation(format!(
                "interpolation table needs at least 2 samples, got {}",
                xs.len()
            )));
        }
        if let Some(i) = xs.iter().chain(ys.iter()).position(|v| !v.is_finite()) {
            return Err(CryoError::Validation(format!(
                "interpolation table entry {} is not finite",
                i % xs.len()
            )));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(CryoError::Validation(format!(
                "interpolation abscissae must be strictly increasing (x[{}]={} >= x[{}]={})",
                i,
                xs[i],
                i + 1,
                xs[i + 1]
            )));
        }

        let slopes = pchip_slopes(&xs, &ys);
        let mut cumulative = Vec::with_capacity(xs.len());
        cumulative.push(0.0);
        for k in 0..xs.len() - 1 {
            let h = xs[k + 1] - xs[k];
            let seg = segment_integral(h, ys[k], ys[k + 1], slopes[k], slopes[k + 1], 1.0);
            let prev = cumulative[k];
            cumulative.push(prev + seg);
        }

        Ok(MonotoneCubic {
            xs,
            ys,
            slopes,
            cumulative,
        })
    }

    pub fn from_pairs(pairs: &[[f64; 2]]) -> CryoResult<Self> {
        let xs = pairs.iter().map(|p| p[0]).collect();
        let ys = pairs.iter().map(|p| p[1]).collect();
        Self::new(xs, ys)
    }

    /// `[x_min, x_max]`.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = self.domain();
        x >= lo && x <= hi
    }

    /// Index `k` of the interval `[xs[k], xs[k+1]]` holding `x`.
    fn interval(&self, x: f64) -> usize {
        let last = self.xs.len() - 2;
        self.xs.partition_point(|&xk| xk <= x).saturating_sub(1).min(last)
    }

    pub fn eval(&self, x: f64) -> Option<f64> {
        if !self.contains(x) {
            return None;
        }
        let k = self.interval(x);
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        Some(
            h00 * self.ys[k]
                + h10 * h * self.slopes[k]
                + h01 * self.ys[k + 1]
                + h11 * h * self.slopes[k + 1],
        )
    }

    /// Exact integral of the interpolant over `[a, b]` (signed if `a > b`).
    pub fn integrate(&self, a: f64, b: f64) -> Option<f64> {
        Some(self.antiderivative(b)? - self.antiderivative(a)?)
    }

    fn antiderivative(&self, x: f64) -> Option<f64> {
        if !self.contains(x) {
            return None;
        }
        let k = self.interval(x);
        let h = self.xs[k + 1] - self.xs[k];
        let s = (x - self.xs[k]) / h;
        Some(
            self.cumulative[k]
                + segment_integral(
                    h,
                    self.ys[k],
                    self.ys[k + 1],
                    self.slopes[k],
                    self.slopes[k + 1],
                    s,
                ),
        )
    }
}

/// ∫ over the first fraction `s` of one Hermite segment of width `h`.
fn segment_integral(h: f64, y0: f64, y1: f64, m0: f64, m1: f64, s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    let i00 = 0.5 * s4 - s3 + s;
    let i10 = 0.25 * s4 - 2.0 * s3 / 3.0 + 0.5 * s2;
    let i01 = -0.5 * s4 + s3;
    let i11 = 0.25 * s4 - s3 / 3.0;
    h * (y0 * i00 + h * m0 * i10 + y1 * i01 + h * m1 * i11)
}

fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();

    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut m = vec![0.0; n];
    for k in 1..n - 1 {
        let (d0, d1) = (delta[k - 1], delta[k]);
        if d0 * d1 <= 0.0 {
            m[k] = 0.0;
        } else {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            m[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
        }
    }
    m[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    m[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    m
}

/// One-sided three-point end slope, limited to keep monotonicity.
fn end_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let m = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if m.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copper_k() -> MonotoneCubic {
        MonotoneCubic::from_pairs(&[
            [4.0, 320.0],
            [10.0, 780.0],
            [20.0, 1200.0],
            [40.0, 1000.0],
            [77.0, 550.0],
            [300.0, 400.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_reproduces_knots() {
        let f = copper_k();
        for (x, y) in [(4.0, 320.0), (20.0, 1200.0), (77.0, 550.0), (300.0, 400.0)] {
            let got = f.eval(x).unwrap();
            assert!((got - y).abs() < 1e-9, "f({x}) = {got}, expected {y}");
        }
    }

    #[test]
    fn test_no_overshoot_at_peak() {
        let f = copper_k();
        let mut t = 4.0;
        while t <= 300.0 {
            let v = f.eval(t).unwrap();
            assert!(v <= 1200.0 + 1e-9 && v >= 320.0 - 1e-9, "f({t}) = {v} overshoots");
            t += 0.25;
        }
    }

    #[test]
    fn test_monotone_segments_stay_monotone() {
        let f = MonotoneCubic::from_pairs(&[[1.0, 0.0], [2.0, 0.1], [3.0, 5.0], [4.0, 5.1], [10.0, 100.0]])
            .unwrap();
        let mut prev = f.eval(1.0).unwrap();
        let mut x: f64 = 1.0;
        while x < 10.0 {
            x += 0.01;
            let v = f.eval(x.min(10.0)).unwrap();
            assert!(v >= prev - 1e-12, "decrease at x = {x}: {prev} -> {v}");
            prev = v;
        }
    }

    #[test]
    fn test_outside_domain_is_none() {
        let f = copper_k();
        assert!(f.eval(3.0).is_none());
        assert!(f.eval(301.0).is_none());
        assert!(f.eval(f64::NAN).is_none());
        assert!(f.integrate(3.0, 10.0).is_none());
    }

    #[test]
    fn test_linear_data_is_exact() {
        let f = MonotoneCubic::new(vec![0.0, 1.0, 3.0, 6.0], vec![1.0, 3.0, 7.0, 13.0]).unwrap();
        assert!((f.eval(2.0).unwrap() - 5.0).abs() < 1e-12);
        assert!((f.eval(4.5).unwrap() - 10.0).abs() < 1e-12);
        // ∫0^6 (2x+1) dx = 42
        assert!((f.integrate(0.0, 6.0).unwrap() - 42.0).abs() < 1e-10);
        assert!((f.integrate(6.0, 0.0).unwrap() + 42.0).abs() < 1e-10);
        // ∫1.5^4.5 (2x+1) dx = 21
        assert!((f.integrate(1.5, 4.5).unwrap() - 21.0).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(MonotoneCubic::new(vec![1.0], vec![1.0]).is_err());
        assert!(MonotoneCubic::new(vec![1.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(MonotoneCubic::new(vec![2.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(MonotoneCubic::new(vec![1.0, 2.0], vec![1.0, f64::NAN]).is_err());
        assert!(MonotoneCubic::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0]).is_err());
    }
}
