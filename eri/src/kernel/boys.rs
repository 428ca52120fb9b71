//! Boys function F_n(T) = ∫_0^1 t^{2n} exp(-T t^2) dt.
//!
//! Below `GRID_MAX` the highest requested order is interpolated with a
//! Taylor expansion around the nearest point of a precomputed grid and the
//! lower orders follow by downward recursion. Above it the asymptotic form of
//! F_0 is recursed upwards.

use crate::shell::MAX_AM;
use libm::erf;
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Highest order needed by a quartet of l = MAX_AM shells.
pub const MAX_ORDER: usize = 4 * MAX_AM;

const GRID_STEP: f64 = 0.1;
const GRID_MAX: f64 = 40.0;
const TAYLOR_ORDER: usize = 6;
const TABLE_ORDERS: usize = MAX_ORDER + TAYLOR_ORDER + 1;

pub struct BoysTable {
    n_points: usize,
    // values[i * TABLE_ORDERS + n] = F_n(i * GRID_STEP)
    values: Vec<f64>,
}

static TABLE: OnceLock<BoysTable> = OnceLock::new();

/// The process-wide grid, built on first use.
pub fn table() -> &'static BoysTable {
    TABLE.get_or_init(BoysTable::build)
}

/// F_0..=F_n_max at `t` by series summation and downward recursion.
/// Accurate for any `t >= 0` but slow; used to build the grid.
pub fn boys_reference(n_max: usize, t: f64, out: &mut [f64]) {
    let exp_t = (-t).exp();
    let two_t = 2.0 * t;

    let mut denom = (2 * n_max + 1) as f64;
    let mut term = 1.0 / denom;
    let mut sum = term;
    while term > sum * 1e-17 {
        denom += 2.0;
        term *= two_t / denom;
        sum += term;
    }
    out[n_max] = exp_t * sum;

    for n in (1..=n_max).rev() {
        out[n - 1] = (two_t * out[n] + exp_t) / (2 * n - 1) as f64;
    }
}

impl BoysTable {
    fn build() -> Self {
        let n_points = (GRID_MAX / GRID_STEP).round() as usize + 1;
        let mut values = vec![0.0; n_points * TABLE_ORDERS];
        for (i, row) in values.chunks_exact_mut(TABLE_ORDERS).enumerate() {
            boys_reference(TABLE_ORDERS - 1, i as f64 * GRID_STEP, row);
        }
        Self { n_points, values }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Writes F_0(t)..=F_n_max(t) into `out[..=n_max]`.
    pub fn evaluate(&self, n_max: usize, t: f64, out: &mut [f64]) {
        debug_assert!(n_max <= MAX_ORDER);
        debug_assert!(t >= 0.0);

        if t >= GRID_MAX {
            out[0] = 0.5 * (PI / t).sqrt() * erf(t.sqrt());
            if n_max > 0 {
                let exp_t = (-t).exp();
                let inv_2t = 0.5 / t;
                for n in 1..=n_max {
                    out[n] = ((2 * n - 1) as f64 * out[n - 1] - exp_t) * inv_2t;
                }
            }
            return;
        }

        let i = (t / GRID_STEP).round() as usize;
        let dt = i as f64 * GRID_STEP - t;
        let row = &self.values[i * TABLE_ORDERS..(i + 1) * TABLE_ORDERS];

        // Taylor series in dt, using dF_n/dT = -F_{n+1}
        let mut f = 0.0;
        let mut coef = 1.0;
        for k in 0..=TAYLOR_ORDER {
            f += row[n_max + k] * coef;
            coef *= dt / (k + 1) as f64;
        }
        out[n_max] = f;

        if n_max > 0 {
            let exp_t = (-t).exp();
            let two_t = 2.0 * t;
            for n in (1..=n_max).rev() {
                out[n - 1] = (two_t * out[n] + exp_t) / (2 * n - 1) as f64;
            }
        }
    }
}

/// Convenience wrapper over the process-wide table.
pub fn boys(n_max: usize, t: f64, out: &mut [f64]) {
    table().evaluate(n_max, t, out)
}
