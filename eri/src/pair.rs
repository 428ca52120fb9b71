//! Precombined data of a shell pair: Gaussian product centers, prefactors
//! and the Hermite expansion coefficients E^{ij}_t of every primitive pair.

use crate::shell::Shell;
use nalgebra::Vector3;
use std::f64::consts::PI;

/// One primitive pair (a_i, b_j) of a shell pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitivePair {
    /// Total exponent a + b.
    pub p: f64,
    /// Gaussian product center (aA + bB) / p.
    pub center: Vector3<f64>,
    /// exp(-ab/p |A-B|^2) c_a c_b
    pub prefactor: f64,
    /// sqrt((ab|ab)) of the s-type primitive pair. An upper bound for s
    /// functions, an estimate for higher angular momentum.
    pub bound: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellPair {
    pub am: [usize; 2],
    pub centers: [Vector3<f64>; 2],
    pub primitives: Vec<PrimitivePair>,
    // Hermite coefficients per direction, `stride` values per primitive pair
    ex: Vec<f64>,
    ey: Vec<f64>,
    ez: Vec<f64>,
    stride: usize,
    /// Sum of the primitive bounds.
    pub bound: f64,
    /// Set when `bound` is below the pair threshold the table was built with.
    pub negligible: bool,
}

/// Fills e[(i * (lb+1) + j) * (la+lb+1) + t] with the Hermite expansion
/// coefficients of x_A^i x_B^j, without the exponential prefactor.
fn hermite_expansion(la: usize, lb: usize, qx: f64, a: f64, b: f64, e: &mut [f64]) {
    let p = a + b;
    let q = a * b / p;
    let nt = la + lb + 1;
    let idx = |i: usize, j: usize, t: usize| (i * (lb + 1) + j) * nt + t;
    let pa = -q * qx / a;
    let pb = q * qx / b;
    let inv_2p = 0.5 / p;

    e.fill(0.0);
    e[idx(0, 0, 0)] = 1.0;

    for i in 0..la {
        for t in 0..=i + 1 {
            let lower = if t > 0 { e[idx(i, 0, t - 1)] } else { 0.0 };
            let upper = if t < i { e[idx(i, 0, t + 1)] } else { 0.0 };
            let same = if t <= i { e[idx(i, 0, t)] } else { 0.0 };
            e[idx(i + 1, 0, t)] = lower * inv_2p + pa * same + (t + 1) as f64 * upper;
        }
    }

    for i in 0..=la {
        for j in 0..lb {
            for t in 0..=i + j + 1 {
                let lower = if t > 0 { e[idx(i, j, t - 1)] } else { 0.0 };
                let upper = if t < i + j { e[idx(i, j, t + 1)] } else { 0.0 };
                let same = if t <= i + j { e[idx(i, j, t)] } else { 0.0 };
                e[idx(i, j + 1, t)] = lower * inv_2p + pb * same + (t + 1) as f64 * upper;
            }
        }
    }
}

impl ShellPair {
    pub fn new(a: &Shell, b: &Shell, threshold: f64) -> Self {
        let (la, lb) = (a.am, b.am);
        let stride = (la + 1) * (lb + 1) * (la + lb + 1);
        let n = a.n_primitives() * b.n_primitives();
        let ab = a.center - b.center;
        let r2 = ab.norm_squared();

        let mut primitives = Vec::with_capacity(n);
        let mut ex = vec![0.0; n * stride];
        let mut ey = vec![0.0; n * stride];
        let mut ez = vec![0.0; n * stride];

        for (ia, (&alpha, &ca)) in a.exponents.iter().zip(&a.coefficients).enumerate() {
            for (ib, (&beta, &cb)) in b.exponents.iter().zip(&b.coefficients).enumerate() {
                let k = ia * b.n_primitives() + ib;
                let p = alpha + beta;
                let q = alpha * beta / p;
                let prefactor = (-q * r2).exp() * ca * cb;
                let center = (a.center * alpha + b.center * beta) / p;

                let range = k * stride..(k + 1) * stride;
                hermite_expansion(la, lb, ab.x, alpha, beta, &mut ex[range.clone()]);
                hermite_expansion(la, lb, ab.y, alpha, beta, &mut ey[range.clone()]);
                hermite_expansion(la, lb, ab.z, alpha, beta, &mut ez[range]);

                // square root of the s-type (ab|ab) primitive integral
                let bound = prefactor.abs() * (2.0 * PI.powf(2.5) / (p * p * (2.0 * p).sqrt())).sqrt();
                primitives.push(PrimitivePair {
                    p,
                    center,
                    prefactor,
                    bound,
                });
            }
        }

        let bound = primitives.iter().map(|pp| pp.bound).sum::<f64>();
        Self {
            am: [la, lb],
            centers: [a.center, b.center],
            primitives,
            ex,
            ey,
            ez,
            stride,
            bound,
            negligible: bound < threshold,
        }
    }

    pub fn n_primitives(&self) -> usize {
        self.primitives.len()
    }

    /// Highest Hermite order t of the pair, la + lb.
    pub fn max_order(&self) -> usize {
        self.am[0] + self.am[1]
    }

    /// Position of E^{ij}_t inside the per-primitive coefficient slices.
    #[inline]
    pub fn e_index(&self, i: usize, j: usize, t: usize) -> usize {
        (i * (self.am[1] + 1) + j) * (self.max_order() + 1) + t
    }

    /// x, y and z Hermite coefficients of primitive pair `k`.
    pub fn hermite(&self, k: usize) -> [&[f64]; 3] {
        let range = k * self.stride..(k + 1) * self.stride;
        [&self.ex[range.clone()], &self.ey[range.clone()], &self.ez[range]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(am: usize, center: Vector3<f64>, exps: Vec<f64>, coefs: Vec<f64>) -> Shell {
        Shell::new(am, center, exps, coefs)
    }

    /// Direct Hermite expansion coefficient following the textbook recursion.
    fn e_reference(i: i32, j: i32, t: i32, qx: f64, a: f64, b: f64) -> f64 {
        let p = a + b;
        let q = a * b / p;
        if t < 0 || t > i + j || i < 0 || j < 0 {
            0.0
        } else if i == 0 && j == 0 && t == 0 {
            1.0
        } else if j == 0 {
            e_reference(i - 1, j, t - 1, qx, a, b) / (2.0 * p) - e_reference(i - 1, j, t, qx, a, b) * q * qx / a
                + e_reference(i - 1, j, t + 1, qx, a, b) * (t + 1) as f64
        } else {
            e_reference(i, j - 1, t - 1, qx, a, b) / (2.0 * p)
                + e_reference(i, j - 1, t, qx, a, b) * q * qx / b
                + e_reference(i, j - 1, t + 1, qx, a, b) * (t + 1) as f64
        }
    }

    #[test]
    fn test_product_center_and_prefactor() {
        let a = shell(0, Vector3::new(0.0, 0.0, 0.0), vec![1.0], vec![2.0]);
        let b = shell(0, Vector3::new(0.0, 0.0, 2.0), vec![3.0], vec![0.5]);
        let pair = ShellPair::new(&a, &b, 0.0);
        let pp = &pair.primitives[0];
        assert_eq!(pp.p, 4.0);
        assert!((pp.center.z - 1.5).abs() < 1e-14);
        assert!((pp.prefactor - (-0.75 * 4.0f64).exp()).abs() < 1e-14);
        assert!(!pair.negligible);
    }

    #[test]
    fn test_hermite_matches_recursion() {
        let a = shell(3, Vector3::new(0.1, -0.4, 0.7), vec![1.3, 0.4], vec![1.0, 1.0]);
        let b = shell(2, Vector3::new(-0.5, 0.2, 0.0), vec![0.8], vec![1.0]);
        let pair = ShellPair::new(&a, &b, 0.0);
        let ab = a.center - b.center;
        for (k, (alpha, beta)) in [(1.3, 0.8), (0.4, 0.8)].into_iter().enumerate() {
            let [ex, ey, ez] = pair.hermite(k);
            for i in 0..=3 {
                for j in 0..=2 {
                    for t in 0..=i + j {
                        let idx = pair.e_index(i, j, t);
                        let (i, j, t) = (i as i32, j as i32, t as i32);
                        assert!((ex[idx] - e_reference(i, j, t, ab.x, alpha, beta)).abs() < 1e-12);
                        assert!((ey[idx] - e_reference(i, j, t, ab.y, alpha, beta)).abs() < 1e-12);
                        assert!((ez[idx] - e_reference(i, j, t, ab.z, alpha, beta)).abs() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_distant_pair_is_negligible() {
        let a = shell(0, Vector3::zeros(), vec![2.0], vec![1.0]);
        let b = shell(0, Vector3::new(0.0, 0.0, 20.0), vec![2.0], vec![1.0]);
        let pair = ShellPair::new(&a, &b, 1e-12);
        assert!(pair.negligible);
        // flagged pairs keep their data
        assert_eq!(pair.n_primitives(), 1);
        let near = ShellPair::new(&a, &a, 1e-12);
        assert!(!near.negligible);
    }
}
